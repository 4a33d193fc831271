/// All persisted primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Timeline positions and lengths, in whole milliseconds.
pub type Millis = i64;
