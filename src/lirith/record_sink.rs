//! Tabular output of an experiment.
//!
//! The schema is derived once per run: the fixed turn columns, then every metric key in
//! record order, then one `cross_echo_<agent>` column per configured agent. Every row is
//! projected onto that schema. A record carrying a key outside it is rejected; a schema
//! column the record lacks (the speaker's own cross-echo column) is written empty.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::lirith::cross_echo::column_name;
use crate::lirith::metrics::{MetricValue, MetricsRecord};

/// Columns every row starts with.
pub const FIXED_COLUMNS: [&str; 5] = ["round", "speaker", "question", "message", "response_time"];

/// Ordered output columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    columns: Vec<String>,
}

impl RecordSchema {
    pub fn derive<I, S>(metric_keys: I, agents: &[String]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut columns: Vec<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
        columns.extend(metric_keys.into_iter().map(Into::into));
        columns.extend(agents.iter().map(|agent| column_name(agent)));
        RecordSchema { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Cells of `record` in schema order; `None` for columns the record does not carry.
    pub fn project<'r>(&self, row: &'r MetricsRecord) -> Result<Vec<Option<&'r MetricValue>>, SinkError> {
        if let Some(unknown) = row.keys().find(|key| !self.contains(key)) {
            return Err(SinkError::SchemaMismatch(format!(
                "record key '{}' is not in the schema",
                unknown
            )));
        }
        Ok(self.columns.iter().map(|column| row.get(column)).collect())
    }
}

/// One successful turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentRecord {
    pub round: usize,
    pub speaker: String,
    pub question: String,
    pub message: String,
    /// Seconds, two decimals.
    pub response_time: f64,
    pub metrics: MetricsRecord,
    /// Echo against every other agent, in panel order.
    pub cross_echo: Vec<(String, f64)>,
}

impl ExperimentRecord {
    /// The flat row: fixed columns, metrics, cross-echo columns.
    pub fn to_row(&self) -> MetricsRecord {
        let mut row = MetricsRecord::new();
        row.insert("round", self.round);
        row.insert("speaker", self.speaker.as_str());
        row.insert("question", self.question.as_str());
        row.insert("message", self.message.as_str());
        row.insert("response_time", self.response_time);
        for (key, value) in self.metrics.iter() {
            row.insert(key, value.clone());
        }
        for (agent, score) in &self.cross_echo {
            row.insert(column_name(agent), *score);
        }
        row
    }

    pub fn cross_echo_for(&self, agent: &str) -> Option<f64> {
        self.cross_echo
            .iter()
            .find(|(name, _)| name == agent)
            .map(|(_, score)| *score)
    }
}

#[derive(Debug)]
pub enum SinkError {
    Io(io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    SchemaMismatch(String),
    /// `append` was called before `begin`.
    NotStarted,
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Io(e) => write!(f, "I/O error: {}", e),
            SinkError::Csv(e) => write!(f, "CSV error: {}", e),
            SinkError::Json(e) => write!(f, "JSON error: {}", e),
            SinkError::SchemaMismatch(msg) => write!(f, "Schema mismatch: {}", msg),
            SinkError::NotStarted => write!(f, "Sink received a record before its schema"),
        }
    }
}

impl Error for SinkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SinkError::Io(e) => Some(e),
            SinkError::Csv(e) => Some(e),
            SinkError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SinkError {
    fn from(e: io::Error) -> Self {
        SinkError::Io(e)
    }
}

impl From<csv::Error> for SinkError {
    fn from(e: csv::Error) -> Self {
        SinkError::Csv(e)
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(e: serde_json::Error) -> Self {
        SinkError::Json(e)
    }
}

/// Destination of experiment rows.
pub trait RecordSink: Send {
    /// Write the header. Called once, before any `append`.
    fn begin(&mut self, schema: &RecordSchema) -> Result<(), SinkError>;

    fn append(&mut self, record: &ExperimentRecord) -> Result<(), SinkError>;

    /// Flush whatever is buffered.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// UTF-8 CSV with a header row. Rows are flushed as they are written so a crashed run keeps
/// everything up to the last completed turn.
pub struct CsvRecordSink<W: Write> {
    writer: csv::Writer<W>,
    schema: Option<RecordSchema>,
}

impl CsvRecordSink<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        Ok(CsvRecordSink {
            writer: csv::Writer::from_path(path)?,
            schema: None,
        })
    }
}

impl<W: Write> CsvRecordSink<W> {
    pub fn from_writer(writer: W) -> Self {
        CsvRecordSink {
            writer: csv::Writer::from_writer(writer),
            schema: None,
        }
    }
}

impl<W: Write + Send> RecordSink for CsvRecordSink<W> {
    fn begin(&mut self, schema: &RecordSchema) -> Result<(), SinkError> {
        self.writer.write_record(schema.columns())?;
        self.writer.flush()?;
        self.schema = Some(schema.clone());
        Ok(())
    }

    fn append(&mut self, record: &ExperimentRecord) -> Result<(), SinkError> {
        let schema = self.schema.as_ref().ok_or(SinkError::NotStarted)?;
        let row = record.to_row();
        let cells: Vec<String> = schema
            .project(&row)?
            .into_iter()
            .map(|cell| cell.map(|v| v.to_string()).unwrap_or_default())
            .collect();
        self.writer.write_record(&cells)?;
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// One JSON object per line, keys in schema order, absent cells as `null`.
pub struct JsonlRecordSink<W: Write> {
    writer: W,
    schema: Option<RecordSchema>,
}

impl JsonlRecordSink<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        Ok(JsonlRecordSink {
            writer: BufWriter::new(File::create(path)?),
            schema: None,
        })
    }
}

impl<W: Write> JsonlRecordSink<W> {
    pub fn from_writer(writer: W) -> Self {
        JsonlRecordSink {
            writer,
            schema: None,
        }
    }
}

struct OrderedRow<'a> {
    columns: &'a [String],
    cells: Vec<Option<&'a MetricValue>>,
}

impl Serialize for OrderedRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, cell) in self.columns.iter().zip(&self.cells) {
            map.serialize_entry(column, cell)?;
        }
        map.end()
    }
}

impl<W: Write + Send> RecordSink for JsonlRecordSink<W> {
    fn begin(&mut self, schema: &RecordSchema) -> Result<(), SinkError> {
        self.schema = Some(schema.clone());
        Ok(())
    }

    fn append(&mut self, record: &ExperimentRecord) -> Result<(), SinkError> {
        let schema = self.schema.as_ref().ok_or(SinkError::NotStarted)?;
        let row = record.to_row();
        let ordered = OrderedRow {
            columns: schema.columns(),
            cells: schema.project(&row)?,
        };
        serde_json::to_writer(&mut self.writer, &ordered)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps rows in memory, mostly for tests and notebook-style inspection.
#[derive(Debug, Default)]
pub struct MemoryRecordSink {
    pub schema: Option<RecordSchema>,
    pub records: Vec<ExperimentRecord>,
    /// Rows as the CSV sink would write them.
    pub rows: Vec<Vec<String>>,
    pub finished: bool,
}

impl MemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for MemoryRecordSink {
    fn begin(&mut self, schema: &RecordSchema) -> Result<(), SinkError> {
        self.schema = Some(schema.clone());
        Ok(())
    }

    fn append(&mut self, record: &ExperimentRecord) -> Result<(), SinkError> {
        let schema = self.schema.as_ref().ok_or(SinkError::NotStarted)?;
        let row = record.to_row();
        let cells = schema
            .project(&row)?
            .into_iter()
            .map(|cell| cell.map(|v| v.to_string()).unwrap_or_default())
            .collect();
        self.rows.push(cells);
        self.records.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.finished = true;
        Ok(())
    }
}
