//! Time helpers — timestamps, `HH:MM` parsing, and wall-clock resolution.
//!
//! Everything here is pure arithmetic over explicit inputs. The only
//! clock read in the crate is [`now`], and nothing in this module calls
//! it implicitly.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// UTC timestamp used for sunset instants and timer deadlines.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// The calendar date at `now` in the given timezone.
#[must_use]
pub fn local_date(tz: Tz, now: Timestamp) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Resolve a time-of-day to its next occurrence strictly after `now`,
/// interpreted in `tz`: later today if the time is still ahead, else the
/// same wall-clock time tomorrow.
///
/// DST edges: an ambiguous local time (fall-back) resolves to the
/// earliest instant; a nonexistent one (spring-forward gap) falls
/// forward by an hour to the next valid instant.
#[must_use]
pub fn next_occurrence(time: NaiveTime, tz: Tz, now: Timestamp) -> Timestamp {
    let mut date = now.with_timezone(&tz).date_naive();
    for _ in 0..3 {
        if let Some(instant) = resolve_local(date, time, tz) {
            if instant > now {
                return instant;
            }
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    // Only reachable at the far end of the calendar.
    now + Duration::days(1)
}

/// A local date+time as a UTC instant, or `None` when the calendar
/// cannot express it at all.
fn resolve_local(date: NaiveDate, time: NaiveTime, tz: Tz) -> Option<Timestamp> {
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

/// Serde for [`NaiveTime`] tolerating both `"HH:MM"` (the scene document
/// format) and `"HH:MM:SS"`.
pub mod serde_hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    /// Deserialize `"HH:MM"` or `"HH:MM:SS"`.
    ///
    /// # Errors
    ///
    /// Returns a deserialization error when the string matches neither format.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).map_err(D::Error::custom)
    }

    /// Serialize as `"HH:MM"`, keeping seconds only when non-zero.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        use chrono::Timelike;
        let text = if time.second() == 0 {
            time.format("%H:%M").to_string()
        } else {
            time.format("%H:%M:%S").to_string()
        };
        serializer.serialize_str(&text)
    }

    pub(crate) fn parse(text: &str) -> Result<NaiveTime, chrono::ParseError> {
        NaiveTime::parse_from_str(text, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
    }
}
