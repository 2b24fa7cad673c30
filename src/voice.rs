//! Spoken activity summaries.
//!
//! A summary covers today's detections that have not been announced yet.
//! Once composed, exactly the detections it mentions are marked as
//! acknowledged so the next summary does not repeat them. A failed
//! acknowledgment never suppresses the summary: hearing something twice is
//! better than not hearing it at all.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::activity::TimeRange;
use crate::config::TimeFormat;
use crate::db::{Database, DetectionRecord};
use crate::error::IntelResult;
use crate::labels::count_labels;

/// Result of one summary run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSummary {
    /// Text to speak; empty when there is nothing new.
    pub message: String,
    /// Ids of the detections the message covers.
    pub reported: Vec<i64>,
    /// Whether the reported detections were marked as acknowledged.
    pub committed: bool,
}

pub struct VoiceSummarizer {
    verbosity_threshold: usize,
    time_format: TimeFormat,
}

impl VoiceSummarizer {
    pub fn new(verbosity_threshold: usize, time_format: TimeFormat) -> Self {
        Self {
            verbosity_threshold,
            time_format,
        }
    }

    /// Compose the message for a slice of detections ordered oldest first.
    pub fn compose(&self, records: &[DetectionRecord]) -> String {
        let Some(latest) = records.last() else {
            return String::new();
        };

        let mut message = String::new();
        if records.len() > self.verbosity_threshold {
            message.push_str("I have seen ");
        }

        let clauses: Vec<String> = count_labels(records.iter().map(|r| r.label.as_str()))
            .into_iter()
            .map(|count| {
                let plural = if count.value > 1 { "s" } else { "" };
                format!("{} {}{}", count.value, count.label, plural)
            })
            .collect();
        message.push_str(&clauses.join(", "));
        message.push_str(". ");

        let results = records.iter().filter(|r| r.has_detection_result()).count();
        if results > 0 {
            message.push_str(&format!("{} new detection results. ", results));
        }

        message.push_str(&format!(
            "{} seen at {}.",
            latest.label,
            self.time_format.apply(latest.capture_time)
        ));
        message
    }

    /// Summarise today's unannounced detections and mark them announced.
    ///
    /// Only the ids read for this summary are acknowledged; detections
    /// stored while the summary is being built stay pending for the next run.
    pub fn generate(&self, db: &Database, now: DateTime<Utc>) -> IntelResult<VoiceSummary> {
        let today = TimeRange::day_of(now);
        let pending = db.unacknowledged_in_range(&today)?;
        let message = self.compose(&pending);

        if pending.is_empty() {
            return Ok(VoiceSummary {
                message,
                reported: Vec::new(),
                committed: false,
            });
        }

        let reported: Vec<i64> = pending.iter().map(|r| r.id).collect();
        let committed = match db.acknowledge(&reported) {
            Ok(changed) => {
                info!(detections = changed, "Marked detections as announced");
                true
            }
            Err(e) => {
                warn!(error = %e, "Could not mark detections as announced, they will be repeated");
                false
            }
        };

        Ok(VoiceSummary {
            message,
            reported,
            committed,
        })
    }
}
