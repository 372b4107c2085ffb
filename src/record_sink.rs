use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::record::{to_json_line, Record};

/// Newline delimited JSON output of one collection run.
///
/// The underlying writer is opened once and released when the sink is
/// finished or dropped, on every exit path.
pub struct RecordSink<W: Write> {
    writer: W,
    written: usize,
}

impl RecordSink<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        Ok(RecordSink::new(BufWriter::new(File::create(path)?)))
    }

    /// Flushes and closes the file at `path` this sink was created for.
    pub fn close(self, path: &Path) -> Result<CollectedFile> {
        let records = self.written;
        self.finish()?;
        Ok(CollectedFile {
            path: path.to_path_buf(),
            records,
        })
    }
}

impl<W: Write> RecordSink<W> {
    pub fn new(writer: W) -> Self {
        RecordSink { writer, written: 0 }
    }

    /// Encodes `record` completely before anything is written.
    pub fn append(&mut self, record: &Record) -> Result<()> {
        let mut line = to_json_line(record)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Flushes and hands back the writer; dropping it closes the file.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// A finished, closed output file ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedFile {
    pub path: PathBuf,
    pub records: usize,
}

#[cfg(test)]
mod tests {
    use crate::record::Record;
    use crate::record_sink::RecordSink;
    use std::io::Write;

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_append_writes_one_line_per_record() {
        let mut sink = RecordSink::new(Vec::new());
        sink.append(&Record::new().with("ImageId", "ami-1")).unwrap();
        sink.append(&Record::new().with("ImageId", "ami-2")).unwrap();

        assert_eq!(sink.written(), 2);
        let output = String::from_utf8(sink.finish().unwrap()).unwrap();
        assert_eq!(output, "{\"ImageId\":\"ami-1\"}\n{\"ImageId\":\"ami-2\"}\n");
    }

    #[test]
    fn test_unencodable_record_writes_nothing() {
        let mut sink = RecordSink::new(Vec::new());
        let result = sink.append(&Record::new().with("ImageId", "ami-1").with("Ratio", f64::INFINITY));

        assert!(result.is_err());
        assert_eq!(sink.written(), 0);
        assert!(sink.finish().unwrap().is_empty());
    }

    #[test]
    fn test_close_flushes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let mut sink = RecordSink::create(&path).unwrap();
        sink.append(&Record::new().with("SnapshotId", "snap-1")).unwrap();

        let file = sink.close(&path).unwrap();

        assert_eq!(file.records, 1);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{\"SnapshotId\":\"snap-1\"}\n"
        );
    }

    #[test]
    fn test_write_error_is_reported() {
        let mut sink = RecordSink::new(FailingWriter);
        assert!(sink.append(&Record::new().with("ImageId", "ami-1")).is_err());
    }
}
