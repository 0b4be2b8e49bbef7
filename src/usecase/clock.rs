use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::domain::timefmt;

/// Local wall clock.
///
/// The offset is captured once at startup, before any threads exist,
/// because `time` refuses to query it from a multi-threaded process on some
/// platforms. A detected clock re-queries the offset on every read and keeps
/// the startup value only when the query is refused, so on those platforms
/// a long session does not follow a DST change until restart.
#[derive(Debug, Clone, Copy)]
pub struct LocalClock {
    offset: UtcOffset,
    follow_system: bool,
}

impl LocalClock {
    pub fn detect() -> Self {
        let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
        timefmt::set_local_offset(offset);
        Self {
            offset,
            follow_system: true,
        }
    }

    /// A clock pinned to `offset`; never consults the system.
    pub fn with_offset(offset: UtcOffset) -> Self {
        Self {
            offset,
            follow_system: false,
        }
    }

    pub fn offset_at(&self, at: OffsetDateTime) -> UtcOffset {
        if self.follow_system {
            UtcOffset::local_offset_at(at).unwrap_or(self.offset)
        } else {
            self.offset
        }
    }

    pub fn now(&self) -> PrimitiveDateTime {
        let utc = OffsetDateTime::now_utc();
        let now = utc.to_offset(self.offset_at(utc));
        PrimitiveDateTime::new(now.date(), now.time())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn offset_shifts_wall_time() {
        let utc = LocalClock::with_offset(UtcOffset::UTC).now();
        let ahead = LocalClock::with_offset(UtcOffset::from_hms(2, 0, 0).unwrap()).now();
        let diff = (ahead - utc).whole_minutes();
        assert!((119..=120).contains(&diff), "diff was {diff}");
    }

    #[test]
    fn pinned_clock_ignores_season() {
        let cet = UtcOffset::from_hms(1, 0, 0).unwrap();
        let clock = LocalClock::with_offset(cet);
        assert_eq!(clock.offset_at(datetime!(2024-01-15 12:00 UTC)), cet);
        assert_eq!(clock.offset_at(datetime!(2024-07-15 12:00 UTC)), cet);
    }

    #[test]
    fn detected_clock_reports_a_valid_offset_year_round() {
        let clock = LocalClock::detect();
        for at in [datetime!(2024-01-15 12:00 UTC), datetime!(2024-07-15 12:00 UTC)] {
            let offset = clock.offset_at(at);
            assert!(offset.whole_hours().abs() <= 14, "offset was {offset}");
        }
    }
}
