mod schema;

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;

pub use schema::SCHEMA;

use crate::activity::TimeRange;
use crate::error::{IntelError, IntelResult};

/// Storage format for every timestamp column. Fixed width, so SQL string
/// comparison orders the same way as the instants themselves.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> IntelResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|dt| dt.and_utc())
        .map_err(|_| IntelError::InvalidTimestamp(value.to_string()))
}

/// A detection as stored by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionRecord {
    pub id: i64,
    pub label: String,
    pub file_name: String,
    pub capture_time: DateTime<Utc>,
    pub detection_result: String,
    pub voice_acknowledged: bool,
    pub created_at: DateTime<Utc>,
}

impl DetectionRecord {
    pub fn has_detection_result(&self) -> bool {
        !self.detection_result.is_empty()
    }
}

/// Input for a new detection row.
#[derive(Debug, Clone)]
pub struct NewDetection {
    pub label: String,
    pub file_name: String,
    pub capture_time: DateTime<Utc>,
    pub detection_result: String,
}

const DETECTION_COLUMNS: &str =
    "id, label, file_name, capture_time, detection_result, voice_acknowledged, created_at";

/// Row as read from SQLite, before timestamp parsing.
struct DetectionRow {
    id: i64,
    label: String,
    file_name: String,
    capture_time: String,
    detection_result: String,
    voice_acknowledged: bool,
    created_at: String,
}

impl DetectionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            label: row.get(1)?,
            file_name: row.get(2)?,
            capture_time: row.get(3)?,
            detection_result: row.get(4)?,
            voice_acknowledged: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_record(self) -> IntelResult<DetectionRecord> {
        Ok(DetectionRecord {
            id: self.id,
            label: self.label,
            file_name: self.file_name,
            capture_time: parse_timestamp(&self.capture_time)?,
            detection_result: self.detection_result,
            voice_acknowledged: self.voice_acknowledged,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn insert_detection(
        &self,
        detection: &NewDetection,
        created_at: DateTime<Utc>,
    ) -> IntelResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO detections (label, file_name, capture_time, detection_result, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                detection.label,
                detection.file_name,
                format_timestamp(detection.capture_time),
                detection.detection_result,
                format_timestamp(created_at),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_detection(&self, id: i64) -> IntelResult<Option<DetectionRecord>> {
        let sql = format!("SELECT {} FROM detections WHERE id = ?", DETECTION_COLUMNS);
        let result = self.conn.query_row(&sql, [id], DetectionRow::from_row);
        match result {
            Ok(row) => Ok(Some(row.into_record()?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Capture times within `range`, oldest first.
    pub fn capture_times_in_range(&self, range: &TimeRange) -> IntelResult<Vec<DateTime<Utc>>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT capture_time FROM detections
            WHERE capture_time >= ? AND capture_time < ?
            ORDER BY capture_time ASC
            "#,
        )?;
        let raw: Vec<String> = stmt
            .query_map(range_params(range), |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;

        raw.iter().map(|value| parse_timestamp(value)).collect()
    }

    /// Detections captured within `range`, in insertion order.
    pub fn detections_in_range(&self, range: &TimeRange) -> IntelResult<Vec<DetectionRecord>> {
        let sql = format!(
            r#"
            SELECT {} FROM detections
            WHERE capture_time >= ? AND capture_time < ?
            ORDER BY created_at ASC, id ASC
            "#,
            DETECTION_COLUMNS
        );
        self.query_detections(&sql, range)
    }

    /// Detections captured within `range` that no spoken summary has
    /// mentioned yet, in insertion order.
    pub fn unacknowledged_in_range(&self, range: &TimeRange) -> IntelResult<Vec<DetectionRecord>> {
        let sql = format!(
            r#"
            SELECT {} FROM detections
            WHERE voice_acknowledged = 0
              AND capture_time >= ? AND capture_time < ?
            ORDER BY created_at ASC, id ASC
            "#,
            DETECTION_COLUMNS
        );
        self.query_detections(&sql, range)
    }

    /// Mark the given detections as announced. Rows that are already
    /// acknowledged are left untouched. Returns the number of rows changed.
    ///
    /// Only the listed ids are touched. Rows inserted after the caller read
    /// its batch must stay pending, so the pending filter is not re-run here.
    pub fn acknowledge(&self, ids: &[i64]) -> IntelResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let id_list = serde_json::Value::from(ids.to_vec()).to_string();
        self.conn
            .execute(
                r#"
                UPDATE detections
                SET voice_acknowledged = 1
                WHERE voice_acknowledged = 0
                  AND id IN (SELECT value FROM json_each(?))
                "#,
                [id_list],
            )
            .map_err(IntelError::AcknowledgmentCommit)
    }

    fn query_detections(&self, sql: &str, range: &TimeRange) -> IntelResult<Vec<DetectionRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows: Vec<DetectionRow> = stmt
            .query_map(range_params(range), DetectionRow::from_row)?
            .collect::<rusqlite::Result<_>>()?;

        rows.into_iter().map(DetectionRow::into_record).collect()
    }
}

fn range_params(range: &TimeRange) -> [String; 2] {
    [format_timestamp(range.start), format_timestamp(range.end)]
}
