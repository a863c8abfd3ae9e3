//! The catch-up computation for recurring transactions.
//!
//! When the user creates a recurring transaction whose anchor date lies in
//! the past, some occurrences have already been missed. This module counts
//! them so the create flow can offer to backfill the missed transactions.

use time::Date;

use super::RecurrencePattern;

/// The occurrences of a recurring transaction that fall on or before today.
///
/// This set is transient: it is computed per request and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOccurrences {
    /// How many occurrences are due.
    pub count: u32,
    /// The date of the earliest due occurrence (the anchor), if any are due.
    pub first: Option<Date>,
    /// The date of the latest due occurrence, if any are due.
    pub last: Option<Date>,
}

impl PendingOccurrences {
    fn none() -> Self {
        Self {
            count: 0,
            first: None,
            last: None,
        }
    }
}

/// Count the occurrences of a series that fall between its anchor date and
/// `today`, inclusive on both ends.
///
/// Starting at the anchor, dates are generated by repeatedly applying the
/// pattern's step function; every generated date at or before `today` is a
/// pending occurrence. A missing anchor yields zero occurrences rather than
/// an error, as does an anchor in the future. An anchor equal to `today`
/// yields exactly one.
///
/// Runs in O(count) steps and has no side effects.
pub fn pending_occurrences(
    anchor: Option<Date>,
    pattern: RecurrencePattern,
    today: Date,
) -> PendingOccurrences {
    let Some(anchor) = anchor else {
        return PendingOccurrences::none();
    };

    if anchor > today {
        return PendingOccurrences::none();
    }

    let mut count = 0;
    let mut date = anchor;
    let mut last = anchor;

    while date <= today {
        count += 1;
        last = date;
        date = pattern.step(date);
    }

    PendingOccurrences {
        count,
        first: Some(anchor),
        last: Some(last),
    }
}

#[cfg(test)]
mod pending_occurrences_tests {
    use time::{Duration, macros::date};

    use crate::recurring::RecurrencePattern;

    use super::{PendingOccurrences, pending_occurrences};

    #[test]
    fn missing_anchor_yields_zero() {
        let result = pending_occurrences(None, RecurrencePattern::Daily, date!(2024 - 03 - 01));

        assert_eq!(result, PendingOccurrences::none());
    }

    #[test]
    fn future_anchor_yields_zero() {
        let result = pending_occurrences(
            Some(date!(2024 - 03 - 02)),
            RecurrencePattern::Daily,
            date!(2024 - 03 - 01),
        );

        assert_eq!(result.count, 0);
        assert_eq!(result.first, None);
        assert_eq!(result.last, None);
    }

    #[test]
    fn anchor_today_yields_exactly_one() {
        let today = date!(2024 - 03 - 01);

        for pattern in RecurrencePattern::ALL {
            let result = pending_occurrences(Some(today), pattern, today);

            assert_eq!(result.count, 1, "{pattern} should have one occurrence");
            assert_eq!(result.first, Some(today));
            assert_eq!(result.last, Some(today));
        }
    }

    #[test]
    fn monthly_counts_missed_months() {
        let result = pending_occurrences(
            Some(date!(2024 - 01 - 15)),
            RecurrencePattern::Monthly,
            date!(2024 - 04 - 10),
        );

        assert_eq!(result.count, 3);
        assert_eq!(result.first, Some(date!(2024 - 01 - 15)));
        assert_eq!(result.last, Some(date!(2024 - 03 - 15)));
    }

    #[test]
    fn weekly_anchor_equal_to_today() {
        let today = date!(2024 - 03 - 01);
        let result = pending_occurrences(Some(today), RecurrencePattern::Weekly, today);

        assert_eq!(result.count, 1);
        assert_eq!(result.first, Some(today));
        assert_eq!(result.last, Some(today));
    }

    #[test]
    fn daily_counts_every_day_inclusive() {
        let result = pending_occurrences(
            Some(date!(2024 - 02 - 27)),
            RecurrencePattern::Daily,
            date!(2024 - 03 - 02),
        );

        // Feb 27, 28, 29 (leap year), Mar 1, Mar 2.
        assert_eq!(result.count, 5);
        assert_eq!(result.last, Some(date!(2024 - 03 - 02)));
    }

    #[test]
    fn monthly_clamped_anchor_keeps_stepping() {
        let result = pending_occurrences(
            Some(date!(2024 - 01 - 31)),
            RecurrencePattern::Monthly,
            date!(2024 - 03 - 31),
        );

        // Jan 31, Feb 29, Mar 29.
        assert_eq!(result.count, 3);
        assert_eq!(result.last, Some(date!(2024 - 03 - 29)));
    }

    #[test]
    fn yearly_counts_missed_years() {
        let result = pending_occurrences(
            Some(date!(2020 - 02 - 29)),
            RecurrencePattern::Yearly,
            date!(2023 - 02 - 27),
        );

        // 2020-02-29, 2021-02-28, 2022-02-28 (2023-02-28 is after today).
        assert_eq!(result.count, 3);
        assert_eq!(result.last, Some(date!(2022 - 02 - 28)));
    }

    #[test]
    fn count_is_monotonic_in_today() {
        let anchor = date!(2024 - 01 - 15);

        for pattern in RecurrencePattern::ALL {
            let mut previous_count = 0;
            let mut today = date!(2024 - 01 - 01);

            while today <= date!(2025 - 02 - 01) {
                let count = pending_occurrences(Some(anchor), pattern, today).count;

                assert!(
                    count >= previous_count,
                    "{pattern} count went from {previous_count} to {count} at {today}"
                );

                previous_count = count;
                today += Duration::days(1);
            }
        }
    }

    #[test]
    fn first_is_always_the_anchor_when_due() {
        let anchor = date!(2023 - 11 - 30);
        let result = pending_occurrences(
            Some(anchor),
            RecurrencePattern::Monthly,
            date!(2024 - 03 - 15),
        );

        assert_eq!(result.first, Some(anchor));
        assert_eq!(result.count, 4);
    }
}
