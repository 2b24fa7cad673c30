//! The dashboard views: each operation reads the current store and capture
//! folders and returns the JSON document the browser client renders.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::activity::{build_histogram, ActivityChart, Resolution, TimeRange};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::{Database, NewDetection};
use crate::error::IntelResult;
use crate::labels::{count_labels, LabelCount};
use crate::media::{read_data_uri, validate_label, EncodedMedia, MediaListing, RetrievalPipeline};
use crate::voice::VoiceSummarizer;

/// Today's hourly activity plus the label breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct DailyIntelligence {
    pub activity: ActivityChart,
    pub donut: Vec<LabelCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyActivity {
    #[serde(rename = "activityWeek")]
    pub activity_week: ActivityChart,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatestImage {
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelImages {
    pub images: Vec<EncodedMedia>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoiceIntelligence {
    pub message: String,
}

pub struct Dashboard {
    config: Config,
    db: Database,
    clock: Box<dyn Clock>,
    retrieval: RetrievalPipeline,
    voice: VoiceSummarizer,
}

impl Dashboard {
    pub fn new(config: Config, db: Database) -> Result<Self> {
        Self::with_clock(config, db, Box::new(SystemClock))
    }

    pub fn with_clock(config: Config, db: Database, clock: Box<dyn Clock>) -> Result<Self> {
        let retrieval = RetrievalPipeline::new(config.retrieval.concurrency, config.title_format()?);
        let voice = VoiceSummarizer::new(config.voice.verbosity_threshold, config.clause_format()?);
        Ok(Self {
            config,
            db,
            clock,
            retrieval,
            voice,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Store a detection on behalf of the classification pipeline.
    pub fn record_detection(&self, detection: &NewDetection) -> IntelResult<i64> {
        let id = self.db.insert_detection(detection, self.clock.now())?;
        debug!(id, label = %detection.label, "Detection stored");
        Ok(id)
    }

    pub fn daily_intelligence(&self) -> IntelResult<DailyIntelligence> {
        let today = TimeRange::day_of(self.clock.now());
        let records = self.db.detections_in_range(&today)?;

        let data = build_histogram(
            Resolution::DailyHourly,
            &today,
            records.iter().map(|r| r.capture_time),
        );
        let donut = count_labels(records.iter().map(|r| r.label.as_str()));

        Ok(DailyIntelligence {
            activity: ActivityChart::new(data),
            donut,
        })
    }

    pub fn weekly_activity(&self) -> IntelResult<WeeklyActivity> {
        let week = TimeRange::week_before(self.clock.now());
        let times = self.db.capture_times_in_range(&week)?;
        let data = build_histogram(Resolution::WeeklyHourly, &week, times);

        Ok(WeeklyActivity {
            activity_week: ActivityChart::new(data),
        })
    }

    /// Today's labels, most frequent first.
    pub fn label_donut(&self) -> IntelResult<Vec<LabelCount>> {
        let today = TimeRange::day_of(self.clock.now());
        let records = self.db.detections_in_range(&today)?;
        Ok(count_labels(records.iter().map(|r| r.label.as_str())))
    }

    /// The newest capture of the object-detection folder.
    pub async fn latest_image(&self) -> IntelResult<LatestImage> {
        let listing = MediaListing::read(&self.config.latest_dir()).await?;
        let newest = listing.newest()?;
        debug!(file = %newest.file_name, "Serving latest capture");

        let data = read_data_uri(&listing.path_of(&newest)).await?;
        Ok(LatestImage { data })
    }

    /// Every capture of one label folder, oldest first.
    pub async fn label_images(&self, label: &str) -> IntelResult<LabelImages> {
        let label = validate_label(label)?;
        let listing = MediaListing::read(&self.config.media.root.join(label)).await?;
        let files = listing.not_older_than(0, self.clock.now());

        let images = self.retrieval.retrieve(&listing.dir, &files).await;
        let missing = images.iter().filter(|m| m.is_unavailable()).count();
        info!(label, total = images.len(), missing, "Label captures retrieved");

        Ok(LabelImages { images })
    }

    pub fn voice_intelligence(&self) -> IntelResult<VoiceIntelligence> {
        let summary = self.voice.generate(&self.db, self.clock.now())?;
        Ok(VoiceIntelligence {
            message: summary.message,
        })
    }
}
