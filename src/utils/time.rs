//! Bucket alignment
use chrono::{DateTime, Duration, Utc};

/// Round `timestamp` down to the start of its bucket. Buckets are aligned to
/// the Unix epoch, so every bucket size that divides a day also aligns to
/// midnight UTC.
pub fn truncate_to_bucket(timestamp: DateTime<Utc>, bucket: Duration) -> DateTime<Utc> {
    let bucket_secs = bucket.num_seconds().max(1);
    let secs = timestamp.timestamp().div_euclid(bucket_secs) * bucket_secs;
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or(timestamp)
}
