//! Records emitted by the collectors and their JSON line encoding.
//!
//! A record only holds a closed set of value kinds. Timestamps are kept as
//! [`Field::DateTime`] until encoding, where they become RFC 3339 strings.
//! Values JSON cannot represent are rejected instead of written as `null`.

use crate::error::{LabsError, Result};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    DateTime(DateTime<Utc>),
    List(Vec<Field>),
    Map(Record),
}

impl Field {
    /// Parses an AWS timestamp string, keeping the raw text if it is not one.
    pub fn timestamp(raw: String) -> Field {
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(date_time) => Field::DateTime(date_time.with_timezone(&Utc)),
            Err(_) => Field::String(raw),
        }
    }

    /// Converts epoch seconds, as returned by JSON protocol services.
    pub fn epoch_seconds(seconds: Option<f64>) -> Field {
        match seconds {
            Some(seconds) if seconds.is_finite() => {
                let whole = seconds.trunc() as i64;
                let nanos = ((seconds - seconds.trunc()) * 1e9) as u32;
                Utc.timestamp_opt(whole, nanos)
                    .single()
                    .map_or(Field::Float(seconds), Field::DateTime)
            }
            Some(seconds) => Field::Float(seconds),
            None => Field::Null,
        }
    }
}

impl From<String> for Field {
    fn from(value: String) -> Self {
        Field::String(value)
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Field::String(value.to_string())
    }
}

impl From<bool> for Field {
    fn from(value: bool) -> Self {
        Field::Bool(value)
    }
}

impl From<i64> for Field {
    fn from(value: i64) -> Self {
        Field::Integer(value)
    }
}

impl From<f64> for Field {
    fn from(value: f64) -> Self {
        Field::Float(value)
    }
}

impl From<DateTime<Utc>> for Field {
    fn from(value: DateTime<Utc>) -> Self {
        Field::DateTime(value)
    }
}

impl From<Record> for Field {
    fn from(value: Record) -> Self {
        Field::Map(value)
    }
}

impl<T: Into<Field>> From<Vec<T>> for Field {
    fn from(values: Vec<T>) -> Self {
        Field::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Field>> From<Option<T>> for Field {
    fn from(value: Option<T>) -> Self {
        value.map_or(Field::Null, Into::into)
    }
}

/// One API resource, keys kept in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Field)>,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    pub fn with<K: Into<String>, V: Into<Field>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    /// Like [`Record::with`], but leaves the key out when `value` is `None`.
    pub fn with_some<K: Into<String>, V: Into<Field>>(self, key: K, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    /// Sets `key`, replacing an earlier value in place.
    pub fn insert<K: Into<String>, V: Into<Field>>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Field)> {
        self.fields.iter()
    }
}

pub fn to_json(field: &Field) -> Result<Value> {
    Ok(match field {
        Field::Null => Value::Null,
        Field::Bool(value) => Value::Bool(*value),
        Field::Integer(value) => Value::Number(Number::from(*value)),
        Field::Float(value) => Value::Number(Number::from_f64(*value).ok_or_else(|| {
            LabsError::Serialization(format!("{} is not representable in JSON", value))
        })?),
        Field::String(value) => Value::String(value.clone()),
        Field::DateTime(value) => {
            Value::String(value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        }
        Field::List(values) => Value::Array(values.iter().map(to_json).collect::<Result<_>>()?),
        Field::Map(record) => record_to_json(record)?,
    })
}

pub fn record_to_json(record: &Record) -> Result<Value> {
    let mut map = Map::new();
    for (key, value) in record.iter() {
        map.insert(key.clone(), to_json(value)?);
    }
    Ok(Value::Object(map))
}

/// Encodes a record as a single line of JSON, without the trailing newline.
pub fn to_json_line(record: &Record) -> Result<String> {
    Ok(serde_json::to_string(&record_to_json(record)?)?)
}
