//! Rolling window key generation.
//!
//! A window is the ordered list of bucket ids that are currently live for a
//! granularity: `window_size` consecutive calendar slots ending with the slot
//! that contains "now". Minutes, hours, days and weeks have fixed lengths;
//! months and years do not, so stepping is done on the calendar from the start
//! of the slot rather than by adding seconds.

use alloc::vec::Vec;

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, TimeDelta, Timelike};

use super::{BucketId, Granularity};

impl Granularity {
    /// Start of the calendar slot containing `at`.
    pub fn truncate(self, at: NaiveDateTime) -> Option<NaiveDateTime> {
        let date = at.date();
        match self {
            Self::Minute => date.and_hms_opt(at.hour(), at.minute(), 0),
            Self::Hour => date.and_hms_opt(at.hour(), 0, 0),
            Self::Day => date.and_hms_opt(0, 0, 0),
            Self::Week => date
                .checked_sub_days(Days::new(u64::from(
                    date.weekday().num_days_from_monday(),
                )))?
                .and_hms_opt(0, 0, 0),
            Self::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?.and_hms_opt(0, 0, 0),
            Self::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1)?.and_hms_opt(0, 0, 0),
        }
    }

    /// Move `at` by `units` calendar units (negative moves back).
    pub fn offset(self, at: NaiveDateTime, units: i64) -> Option<NaiveDateTime> {
        let delta = match self {
            Self::Minute => TimeDelta::try_minutes(units)?,
            Self::Hour => TimeDelta::try_hours(units)?,
            Self::Day => TimeDelta::try_days(units)?,
            Self::Week => TimeDelta::try_weeks(units)?,
            Self::Month => return offset_months(at, units),
            Self::Year => return offset_months(at, units.checked_mul(12)?),
        };
        at.checked_add_signed(delta)
    }
}

fn offset_months(at: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        at.checked_add_months(magnitude)
    } else {
        at.checked_sub_months(magnitude)
    }
}

/// Bucket id of the slot containing `at`.
pub fn bucket_id(granularity: Granularity, at: NaiveDateTime) -> BucketId {
    let (year, month, day) = (at.year(), at.month(), at.day());
    match granularity {
        Granularity::Minute => BucketId::format(format_args!(
            "{year:04}-{month:02}-{day:02} {:02}:{:02}",
            at.hour(),
            at.minute()
        )),
        Granularity::Hour => {
            BucketId::format(format_args!("{year:04}-{month:02}-{day:02} {:02}", at.hour()))
        }
        Granularity::Day => BucketId::format(format_args!("{year:04}-{month:02}-{day:02}")),
        Granularity::Week => {
            let week = at.iso_week();
            BucketId::format(format_args!("{} week {}", week.year(), week.week()))
        }
        Granularity::Month => BucketId::format(format_args!("{year:04}-{month:02}")),
        Granularity::Year => BucketId::format(format_args!("{year:04}")),
    }
}

/// The six bucket ids an instant belongs to, indexed like [`Granularity::ALL`].
pub fn bucket_ids(at: NaiveDateTime) -> [BucketId; 6] {
    Granularity::ALL.map(|g| bucket_id(g, at))
}

/// Ids of the live window at `now`, oldest first.
///
/// Walks forward one unit at a time from `now - (window_size - 1)` until the
/// formatted id reaches the id of `now + 1`. The walk is capped at the window
/// size so a degenerate calendar can never produce an oversized window.
pub fn window_ids(granularity: Granularity, now: NaiveDateTime) -> Vec<BucketId> {
    let size = granularity.window_size();
    let mut ids = Vec::with_capacity(size);

    let Some(anchor) = granularity.truncate(now) else {
        return ids;
    };
    let stop = granularity
        .offset(anchor, 1)
        .map(|next| bucket_id(granularity, next));

    let mut current = granularity.offset(anchor, 1 - size as i64);
    while let Some(at) = current {
        let id = bucket_id(granularity, at);
        if stop.as_ref() == Some(&id) || ids.len() == size {
            break;
        }
        ids.push(id);
        current = granularity.offset(at, 1);
    }

    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn test_bucket_id_formats() {
        let t = at(2024, 3, 1, 12, 30);
        let ids = bucket_ids(t);
        assert_eq!(ids[0], "2024-03-01 12:30");
        assert_eq!(ids[1], "2024-03-01 12");
        assert_eq!(ids[2], "2024-03-01");
        assert_eq!(ids[3], "2024 week 9");
        assert_eq!(ids[4], "2024-03");
        assert_eq!(ids[5], "2024");
    }

    #[test]
    fn test_iso_week_uses_iso_year() {
        // 2024-12-30 is a Monday in ISO week 1 of 2025
        assert_eq!(bucket_id(Granularity::Week, at(2024, 12, 30, 8, 0)), "2025 week 1");
        // 2021-01-03 is a Sunday in ISO week 53 of 2020
        assert_eq!(bucket_id(Granularity::Week, at(2021, 1, 3, 8, 0)), "2020 week 53");
    }

    #[test]
    fn test_last_60_minutes() {
        let ids = window_ids(Granularity::Minute, at(2024, 3, 1, 12, 30));
        assert_eq!(ids.len(), 60);
        assert_eq!(ids[0], "2024-03-01 11:31");
        assert_eq!(ids[59], "2024-03-01 12:30");
    }

    #[test]
    fn test_every_window_has_exact_size_and_ends_now() {
        let now = at(2024, 3, 1, 12, 30);
        for g in Granularity::ALL {
            let ids = window_ids(g, now);
            assert_eq!(ids.len(), g.window_size(), "{g} window has the wrong size");
            assert_eq!(ids.last(), Some(&bucket_id(g, now)), "{g} window must end now");

            let anchor = g.truncate(now).unwrap();
            let starts: Vec<NaiveDateTime> = (0..ids.len() as i64)
                .map(|k| g.offset(anchor, k + 1 - ids.len() as i64).unwrap())
                .collect();
            for (k, (id, start)) in ids.iter().zip(&starts).enumerate() {
                assert_eq!(id, &bucket_id(g, *start), "{g} window slot {k} is out of place");
            }
            assert!(
                starts.windows(2).all(|pair| pair[0] < pair[1]),
                "{g} window must strictly increase in time"
            );
        }
    }

    #[test]
    fn test_last_24_hours_crosses_midnight() {
        let ids = window_ids(Granularity::Hour, at(2024, 3, 1, 5, 59));
        assert_eq!(ids[0], "2024-02-29 06");
        assert_eq!(ids[23], "2024-03-01 05");
    }

    #[test]
    fn test_last_12_months_on_month_end() {
        // Plain month arithmetic from the 31st would skip or repeat months
        let ids = window_ids(Granularity::Month, at(2024, 3, 31, 23, 0));
        assert_eq!(ids.len(), 12);
        assert_eq!(ids[0], "2023-04");
        assert_eq!(ids[10], "2024-02");
        assert_eq!(ids[11], "2024-03");
    }

    #[test]
    fn test_last_4_years_on_leap_day() {
        let ids = window_ids(Granularity::Year, at(2024, 2, 29, 0, 0));
        let ids: Vec<&str> = ids.iter().map(BucketId::as_str).collect();
        assert_eq!(ids, ["2021", "2022", "2023", "2024"]);
    }

    #[test]
    fn test_last_5_weeks_across_year_boundary() {
        let ids = window_ids(Granularity::Week, at(2025, 1, 15, 10, 0));
        let ids: Vec<&str> = ids.iter().map(BucketId::as_str).collect();
        assert_eq!(
            ids,
            ["2024 week 51", "2024 week 52", "2025 week 1", "2025 week 2", "2025 week 3"]
        );
    }

    #[test]
    fn test_last_7_days_in_order() {
        let now = at(2024, 3, 2, 0, 0);
        let ids = window_ids(Granularity::Day, now);
        assert_eq!(ids[0], "2024-02-25");
        assert_eq!(ids[4], "2024-02-29");
        assert_eq!(ids[6], "2024-03-02");
    }

    #[test]
    fn test_offset_months_is_calendar_aware() {
        let start = Granularity::Month.truncate(at(2024, 1, 31, 12, 0)).unwrap();
        let next = Granularity::Month.offset(start, 1).unwrap();
        assert_eq!(bucket_id(Granularity::Month, next), "2024-02");
        let back = Granularity::Year.offset(start, -3).unwrap();
        assert_eq!(bucket_id(Granularity::Year, back), "2021");
    }
}
