#[cfg(test)]
use std::sync::Mutex;

#[cfg(test)]
use chrono::Duration;
use chrono::{DateTime, TimeZone, Utc};
use headers::{Header, HeaderName, HeaderValue};
use lazy_static::lazy_static;

lazy_static! {
    pub static ref TEST_NOW_HEADER_NAME: HeaderName = HeaderName::from_static("x-test-now-ms");
}

/// Source of "now" for request handlers. The consumption protocol itself
/// never reads a clock; callers pass the time in.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[cfg(test)]
pub struct ManualClock(Mutex<DateTime<Utc>>);

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self(Mutex::new(start))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now = *now + by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Fixed request time, in milliseconds since the Unix epoch. Only honored
/// when the server runs in test mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TestNow(pub DateTime<Utc>);

impl Header for TestNow {
    fn name() -> &'static HeaderName {
        &*TEST_NOW_HEADER_NAME
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        let raw = values
            .next()
            .ok_or_else(headers::Error::invalid)?
            .to_str()
            .map_err(|_| headers::Error::invalid())?;
        let millis = leading_integer(raw).ok_or_else(headers::Error::invalid)?;

        Utc.timestamp_millis_opt(millis)
            .single()
            .map(Self)
            .ok_or_else(headers::Error::invalid)
    }

    fn encode<E: Extend<HeaderValue>>(&self, container: &mut E) {
        container.extend(std::iter::once(HeaderValue::from(
            self.0.timestamp_millis(),
        )));
    }
}

/// Reads an optionally signed run of digits at the start of `raw`, ignoring
/// whatever follows it, so `1700000000123ms` reads as `1700000000123` and
/// `17e2` as `17`.
fn leading_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let sign_len = usize::from(raw.starts_with(['+', '-']));
    let digits = raw[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }

    raw[..sign_len + digits].parse().ok()
}

/// Renders the time left until `expires_at`, e.g. `2d 3h` or `45s`.
pub fn format_remaining(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let left = expires_at - now;
    if left.num_milliseconds() <= 0 {
        return "Expired".to_string();
    }

    let seconds = left.num_seconds();
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(raw: &'static str) -> Result<TestNow, headers::Error> {
        let value = HeaderValue::from_static(raw);
        TestNow::decode(&mut std::iter::once(&value))
    }

    #[test]
    fn decodes_epoch_millis() {
        assert_eq!(
            decode("1700000000123").unwrap().0,
            Utc.timestamp_millis_opt(1_700_000_000_123).unwrap()
        );
        assert!(decode("soon").is_err());
        assert!(decode("").is_err());
    }

    #[test]
    fn decodes_leading_digits_and_ignores_the_rest() {
        assert_eq!(
            decode("1700000000123ms").unwrap().0,
            Utc.timestamp_millis_opt(1_700_000_000_123).unwrap()
        );
        assert_eq!(
            decode(" 17e2").unwrap().0,
            Utc.timestamp_millis_opt(17).unwrap()
        );
        assert_eq!(
            decode("-1000.5").unwrap().0,
            Utc.timestamp_millis_opt(-1000).unwrap()
        );
        assert!(decode("-").is_err());
        assert!(decode("ms1700000000123").is_err());
    }

    #[test]
    fn manual_clock_only_moves_on_advance() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(Duration::seconds(2));
        assert_eq!(clock.now(), start + Duration::seconds(2));
    }

    #[test]
    fn remaining_time_format() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let fmt = |secs| format_remaining(now + Duration::seconds(secs), now);
        assert_eq!(fmt(0), "Expired");
        assert_eq!(fmt(45), "45s");
        assert_eq!(
            format_remaining(now + Duration::milliseconds(400), now),
            "0s"
        );
        assert_eq!(fmt(61), "1m 1s");
        assert_eq!(fmt(2 * 3600 + 5 * 60 + 9), "2h 5m");
        assert_eq!(fmt(3 * 86_400 + 4 * 3600), "3d 4h");
    }
}
