use time::{OffsetDateTime, UtcOffset};

/// Current wall-clock time in the local timezone. The offset is taken from
/// chrono since `time` refuses to query it once threads exist.
pub fn now_local() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    let offset = chrono::Local::now().offset().local_minus_utc();
    match UtcOffset::from_whole_seconds(offset) {
        Ok(offset) => now.to_offset(offset),
        Err(_) => now,
    }
}

/// `YYYY-MM-DD HH:MM:SS.mmm`, as printed in front of log lines
pub fn log_timestamp(dt: &OffsetDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}",
        dt.year(),
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second(),
        dt.millisecond()
    )
}
