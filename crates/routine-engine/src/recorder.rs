use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One cell of a run-log row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for RowValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowValue::Int(v) => write!(f, "{v}"),
            RowValue::Float(v) => write!(f, "{v}"),
            RowValue::Text(v) => write!(f, "{v}"),
        }
    }
}

/// Append-only receiver of ordered run-log rows. Indentation routines
/// write their per-sample data through this seam; persistence format is
/// the sink's business.
pub trait RunSink: Send {
    fn header(&mut self, columns: &[&str]) -> std::io::Result<()>;
    fn row(&mut self, values: &[RowValue]) -> std::io::Result<()>;
}

/// CSV file sink, one file per run: `<dir>/<routine>_<stamp>.csv`.
pub struct CsvSink {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl CsvSink {
    pub fn create(dir: &Path, routine: &str) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        let stamp = file_stamp();
        let path = dir.join(format!("{routine}_{stamp}.csv"));
        let writer = BufWriter::new(File::create(&path)?);
        tracing::info!(path = %path.display(), "run log created");
        Ok(Self { writer, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RunSink for CsvSink {
    fn header(&mut self, columns: &[&str]) -> std::io::Result<()> {
        writeln!(self.writer, "{}", columns.join(","))
    }

    fn row(&mut self, values: &[RowValue]) -> std::io::Result<()> {
        let cells: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        writeln!(self.writer, "{}", cells.join(","))
    }
}

impl Drop for CsvSink {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

fn file_stamp() -> String {
    let format = time::format_description::parse(
        "[year][month][day]_[hour][minute][second]",
    );
    match format {
        Ok(fmt) => time::OffsetDateTime::now_utc()
            .format(&fmt)
            .unwrap_or_else(|_| "unknown".to_string()),
        Err(_) => "unknown".to_string(),
    }
}

/// In-memory sink for tests: cheap clone, shared row store.
#[derive(Clone, Default)]
pub struct MemorySink {
    inner: std::sync::Arc<parking_lot::Mutex<MemoryRows>>,
}

#[derive(Default)]
struct MemoryRows {
    header: Vec<String>,
    rows: Vec<Vec<RowValue>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<Vec<RowValue>> {
        self.inner.lock().rows.clone()
    }

    pub fn header_columns(&self) -> Vec<String> {
        self.inner.lock().header.clone()
    }
}

impl RunSink for MemorySink {
    fn header(&mut self, columns: &[&str]) -> std::io::Result<()> {
        self.inner.lock().header = columns.iter().map(|c| c.to_string()).collect();
        Ok(())
    }

    fn row(&mut self, values: &[RowValue]) -> std::io::Result<()> {
        self.inner.lock().rows.push(values.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_sink_writes_rows() {
        let dir = std::env::temp_dir().join("indentrig-recorder-test");
        let mut sink = CsvSink::create(&dir, "unit").unwrap();
        sink.header(&["a", "b"]).unwrap();
        sink.row(&[RowValue::Int(1), RowValue::Float(2.5)]).unwrap();
        let path = sink.path().to_path_buf();
        drop(sink); // flush

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "a,b\n1,2.5\n");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_memory_sink_shared_rows() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.header(&["x"]).unwrap();
        writer.row(&[RowValue::Text("hi".to_string())]).unwrap();
        assert_eq!(sink.header_columns(), vec!["x".to_string()]);
        assert_eq!(sink.rows(), vec![vec![RowValue::Text("hi".to_string())]]);
    }
}
