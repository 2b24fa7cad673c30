pub const SCHEMA: &str = r#"
-- Detections written by the classification pipeline
CREATE TABLE IF NOT EXISTS detections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    label TEXT NOT NULL,
    file_name TEXT NOT NULL,

    -- When the media was captured, UTC "YYYY-MM-DDTHH:MM:SS"
    capture_time TEXT NOT NULL,

    -- Plate/face/voice result text, '' when nothing was recognised
    detection_result TEXT NOT NULL DEFAULT '',

    -- Set once the detection has been included in a spoken summary
    voice_acknowledged INTEGER NOT NULL DEFAULT 0,

    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_detections_capture_time ON detections(capture_time);
CREATE INDEX IF NOT EXISTS idx_detections_voice ON detections(voice_acknowledged, capture_time);
CREATE INDEX IF NOT EXISTS idx_detections_created_at ON detections(created_at);
"#;
