/// Database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// User ids are issued by the external identity provider (opaque strings).
pub type UserId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Calendar dates (milestone windows, target dates) carry no time zone.
pub type Date = chrono::NaiveDate;
