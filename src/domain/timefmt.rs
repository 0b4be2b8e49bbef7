// Text formats for the local wall-clock values stored on tasks.
// Stored datetimes are "YYYY-MM-DDTHH:MM:SS"; older blobs may carry
// "YYYY-MM-DDTHH:MM" (datetime-local input), fractional seconds, or a full
// RFC3339 string.

use std::sync::OnceLock;

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

static LOCAL_OFFSET: OnceLock<UtcOffset> = OnceLock::new();

/// Records the offset detected at startup. Only the first call wins.
pub fn set_local_offset(offset: UtcOffset) {
    let _ = LOCAL_OFFSET.set(offset);
}

fn local_offset() -> UtcOffset {
    LOCAL_OFFSET.get().copied().unwrap_or(UtcOffset::UTC)
}

/// Parses a stored datetime. Values carrying an offset are converted to
/// local wall time using the offset recorded at startup.
pub fn parse_datetime(s: &str) -> Option<PrimitiveDateTime> {
    parse_datetime_in(s, local_offset())
}

pub fn parse_datetime_in(s: &str, local: UtcOffset) -> Option<PrimitiveDateTime> {
    let s = s.trim();
    let wall = format_description!(
        "[year]-[month]-[day]T[hour]:[minute][optional [:[second][optional [.[subsecond]]]]]"
    );
    if let Ok(dt) = PrimitiveDateTime::parse(s, wall) {
        return Some(dt);
    }
    // Serialized JS Date: an absolute instant.
    let at = OffsetDateTime::parse(s, &Rfc3339).ok()?.to_offset(local);
    Some(PrimitiveDateTime::new(at.date(), at.time()))
}

/// Parses a calendar date from the first ten characters, so a full
/// datetime string also yields its date part. Used for stored values only.
pub fn parse_date(s: &str) -> Option<Date> {
    let s = s.trim();
    let head = s.get(0..10)?;
    parse_date_strict(head)
}

/// Parses exactly "YYYY-MM-DD" with nothing trailing.
pub fn parse_date_strict(s: &str) -> Option<Date> {
    Date::parse(s.trim(), format_description!("[year]-[month]-[day]")).ok()
}

pub fn parse_time(s: &str) -> Option<Time> {
    Time::parse(
        s.trim(),
        format_description!("[hour]:[minute][optional [:[second]]]"),
    )
    .ok()
}

/// Sub-seconds are written only when present.
pub fn format_datetime(value: PrimitiveDateTime) -> String {
    let formatted = if value.nanosecond() != 0 {
        value.format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"
        ))
    } else {
        value.format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]"
        ))
    };
    formatted.unwrap_or_default()
}

pub fn format_date(value: Date) -> String {
    value
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

pub fn format_time(value: Time) -> String {
    value
        .format(format_description!("[hour]:[minute]"))
        .unwrap_or_default()
}

/// Human-facing rendering used by the UI.
pub fn display_datetime(value: PrimitiveDateTime) -> String {
    value
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_default()
}

/// Form prefill: minute precision when that is exact, otherwise seconds
/// and sub-seconds are kept so an edit does not truncate the value.
pub fn input_datetime(value: PrimitiveDateTime) -> String {
    let formatted = if value.nanosecond() != 0 {
        value.format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"
        ))
    } else if value.second() != 0 {
        value.format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
    } else {
        value.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
    };
    formatted.unwrap_or_default()
}

pub mod datetime {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use time::PrimitiveDateTime;

    pub fn serialize<S: Serializer>(value: &PrimitiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_datetime(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<PrimitiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_datetime(&raw).ok_or_else(|| D::Error::custom(format!("invalid datetime {raw:?}")))
    }
}

pub mod date {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use time::Date;

    pub fn serialize<S: Serializer>(value: &Date, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_date(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_date(&raw).ok_or_else(|| D::Error::custom(format!("invalid date {raw:?}")))
    }
}

pub mod time_of_day {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use time::Time;

    pub fn serialize<S: Serializer>(value: &Time, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_time(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Time, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_time(&raw).ok_or_else(|| D::Error::custom(format!("invalid time {raw:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, time};

    #[test]
    fn parses_datetime_local_input_without_seconds() {
        assert_eq!(
            parse_datetime("2024-05-01T14:30"),
            Some(datetime!(2024-05-01 14:30))
        );
        assert_eq!(
            parse_datetime("2024-05-01T14:30:15"),
            Some(datetime!(2024-05-01 14:30:15))
        );
    }

    #[test]
    fn parses_serialized_js_date_into_local_wall_time() {
        assert_eq!(
            parse_datetime_in("2024-05-01T12:00:00.000Z", UtcOffset::UTC),
            Some(datetime!(2024-05-01 12:00))
        );
        let cest = UtcOffset::from_hms(2, 0, 0).unwrap();
        assert_eq!(
            parse_datetime_in("2024-05-01T12:00:00.000Z", cest),
            Some(datetime!(2024-05-01 14:00))
        );
        assert_eq!(
            parse_datetime_in("2024-05-01T14:00:00+02:00", cest),
            Some(datetime!(2024-05-01 14:00))
        );
    }

    #[test]
    fn parses_fractional_seconds_without_offset() {
        assert_eq!(
            parse_datetime("2024-06-01T18:00:00.000"),
            Some(datetime!(2024-06-01 18:00))
        );
        assert_eq!(
            parse_datetime("2024-06-01T18:00:07.250"),
            Some(datetime!(2024-06-01 18:00:07.25))
        );
    }

    #[test]
    fn strict_date_rejects_trailing_text() {
        assert_eq!(parse_date_strict("2024-05-01 nonsense"), None);
        assert_eq!(parse_date_strict("2024-05-01T00:00"), None);
        assert_eq!(parse_date_strict(" 2024-05-01 "), Some(date!(2024-05-01)));
    }

    #[test]
    fn input_datetime_keeps_seconds_only_when_present() {
        assert_eq!(
            input_datetime(datetime!(2024-05-01 09:05)),
            "2024-05-01 09:05"
        );
        assert_eq!(
            input_datetime(datetime!(2024-05-01 09:05:30)),
            "2024-05-01 09:05:30"
        );
        let precise = datetime!(2024-05-01 09:05:30.5);
        assert_eq!(format_datetime(precise), "2024-05-01T09:05:30.5");
        let text = input_datetime(precise).replacen(' ', "T", 1);
        assert_eq!(parse_datetime(&text), Some(precise));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_datetime("tomorrow"), None);
        assert_eq!(parse_date("05/01/2024"), None);
        assert_eq!(parse_time("25:00"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn date_accepts_datetime_prefix() {
        assert_eq!(parse_date("2024-05-01"), Some(date!(2024-05-01)));
        assert_eq!(
            parse_date("2024-05-01T00:00:00.000Z"),
            Some(date!(2024-05-01))
        );
    }

    #[test]
    fn formats_match_stored_layout() {
        assert_eq!(
            format_datetime(datetime!(2024-05-01 09:05)),
            "2024-05-01T09:05:00"
        );
        assert_eq!(format_date(date!(2024-05-01)), "2024-05-01");
        assert_eq!(format_time(time!(7:03)), "07:03");
        assert_eq!(
            display_datetime(datetime!(2024-05-01 09:05)),
            "2024-05-01 09:05"
        );
    }
}
