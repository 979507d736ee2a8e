// memdoc-core/src/timestamp.rs
// ISO-8601 timestamps for createdAt / updatedAt

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Format a UTC instant the way documents store it: `2026-10-18T09:15:02.114Z`
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_iso() -> String {
    format_timestamp(Utc::now())
}

/// Issues strictly increasing timestamps.
///
/// Two writes inside the same millisecond (or a wall clock that steps back)
/// would otherwise leave `updatedAt` unchanged; the stamper advances by 1 ms
/// past the previous stamp instead.
#[derive(Debug, Clone, Default)]
pub struct Timestamper {
    last: Option<DateTime<Utc>>,
}

impl Timestamper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> String {
        self.next_at(Utc::now())
    }

    /// Make later stamps sort after `stamp`, a timestamp written elsewhere.
    /// Strings that are not RFC 3339 are ignored.
    pub fn observe(&mut self, stamp: &str) {
        if let Ok(at) = DateTime::parse_from_rfc3339(stamp) {
            let at = truncate_millis(at.with_timezone(&Utc));
            if self.last.map_or(true, |last| at > last) {
                self.last = Some(at);
            }
        }
    }

    fn next_at(&mut self, now: DateTime<Utc>) -> String {
        // Millisecond precision, so compare on the truncated value
        let now = truncate_millis(now);
        let stamp = match self.last {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.last = Some(stamp);
        format_timestamp(stamp)
    }
}

fn truncate_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    let millis = at.timestamp_millis();
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 15, 2).unwrap();
        assert_eq!(format_timestamp(at), "2026-10-18T09:15:02.000Z");
    }

    #[test]
    fn test_strictly_increasing_within_same_millisecond() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut stamper = Timestamper::new();

        let first = stamper.next_at(at);
        let second = stamper.next_at(at);
        let third = stamper.next_at(at);

        assert_eq!(first, "2026-01-01T00:00:00.000Z");
        assert_eq!(second, "2026-01-01T00:00:00.001Z");
        assert!(third > second);
    }

    #[test]
    fn test_clock_stepping_back() {
        let later = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 10).unwrap();
        let earlier = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 5).unwrap();
        let mut stamper = Timestamper::new();

        let a = stamper.next_at(later);
        let b = stamper.next_at(earlier);
        assert!(b > a);
    }

    #[test]
    fn test_observe_future_stamp() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut stamper = Timestamper::new();

        stamper.observe("2030-05-01T12:00:00.250Z");
        stamper.observe("not a timestamp");
        assert_eq!(stamper.next_at(now), "2030-05-01T12:00:00.251Z");

        // older stamps do not move the clock back
        stamper.observe("2020-01-01T00:00:00.000Z");
        assert_eq!(stamper.next_at(now), "2030-05-01T12:00:00.252Z");
    }

    #[test]
    fn test_live_clock_is_monotonic() {
        let mut stamper = Timestamper::new();
        let stamps: Vec<String> = (0..50).map(|_| stamper.next()).collect();
        assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
