//! Draining paginated AWS listings into newline delimited JSON.

use async_trait::async_trait;
use futures::future::Future;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use log::{info, warn};
use std::fmt::Display;
use std::io::Write;

use crate::error::{LabsError, Result};
use crate::record::Record;
use crate::record_sink::RecordSink;

/// One page of a listing, already converted to records.
#[derive(Debug, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    pub next_token: Option<String>,
}

impl Page {
    pub fn last(records: Vec<Record>) -> Self {
        Page {
            records,
            next_token: None,
        }
    }
}

/// A paginated listing operation. Implementations may perform secondary
/// lookups (tags, nested describes) before returning a page.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, next_token: Option<String>) -> Result<Page>;
}

#[async_trait]
impl PageSource for Box<dyn PageSource> {
    async fn fetch_page(&self, next_token: Option<String>) -> Result<Page> {
        (**self).fetch_page(next_token).await
    }
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

async fn next_page<S: PageSource + ?Sized>(
    source: &S,
    cursor: Cursor,
) -> Result<Option<(Vec<Record>, Cursor)>> {
    let next_token = match cursor {
        Cursor::Start => None,
        Cursor::Next(token) => Some(token),
        Cursor::Done => return Ok(None),
    };

    let page = source.fetch_page(next_token).await?;
    let cursor = match page.next_token {
        Some(token) if !token.is_empty() => Cursor::Next(token),
        _ => Cursor::Done,
    };
    Ok(Some((page.records, cursor)))
}

/// Lazily yields every record of every page, in the order the API returns
/// them. Restart by calling `collect` again.
pub fn collect<'a, S: PageSource + ?Sized>(
    source: &'a S,
) -> impl Stream<Item = Result<Record>> + Send + 'a {
    stream::try_unfold(Cursor::Start, move |cursor| next_page(source, cursor))
        .map_ok(|records| stream::iter(records.into_iter().map(Ok::<Record, LabsError>)))
        .try_flatten()
}

/// Appends every record of `records` to `sink`, returning how many were written.
pub async fn write_records<S, W>(records: S, sink: &mut RecordSink<W>) -> Result<usize>
where
    S: Stream<Item = Result<Record>>,
    W: Write,
{
    futures::pin_mut!(records);
    let mut written = 0;
    while let Some(record) = records.next().await {
        sink.append(&record?)?;
        written += 1;
    }
    Ok(written)
}

#[derive(Debug, Default, PartialEq)]
pub struct CollectionSummary {
    pub written: usize,
    pub skipped: Vec<String>,
}

/// Runs one collection per unit (region, account, ...). A unit whose source
/// cannot be built, or whose collection fails, is logged and skipped.
pub async fn collect_units<U, W, F, Fut, S>(
    units: &[U],
    sink: &mut RecordSink<W>,
    mut source_for: F,
) -> CollectionSummary
where
    U: Display,
    W: Write,
    F: FnMut(&U) -> Fut,
    Fut: Future<Output = Option<S>>,
    S: PageSource,
{
    let mut summary = CollectionSummary::default();
    for unit in units {
        let source = match source_for(unit).await {
            Some(source) => source,
            None => {
                summary.skipped.push(unit.to_string());
                continue;
            }
        };

        let before = sink.written();
        match write_records(collect(&source), sink).await {
            Ok(count) => info!("{} data collected ({} records)", unit, count),
            Err(error) => {
                warn!("{} skipped: {}", unit, error);
                summary.skipped.push(unit.to_string());
            }
        }
        summary.written += sink.written() - before;
    }
    summary
}
