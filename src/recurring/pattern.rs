//! The schedule of a recurring transaction and its date stepping function.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month};

use crate::Error;

/// How often a recurring transaction produces an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    /// Every day.
    Daily,
    /// Every seven days.
    Weekly,
    /// Once a month on the same day-of-month, clamped to the last day of
    /// shorter months.
    Monthly,
    /// Once a year on the same date, with Feb 29 clamped to Feb 28 in
    /// non-leap years.
    Yearly,
}

impl RecurrencePattern {
    /// Every pattern, in the order forms should list them.
    pub const ALL: [RecurrencePattern; 4] = [
        RecurrencePattern::Daily,
        RecurrencePattern::Weekly,
        RecurrencePattern::Monthly,
        RecurrencePattern::Yearly,
    ];

    /// The string stored in the database and submitted by forms.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrencePattern::Daily => "daily",
            RecurrencePattern::Weekly => "weekly",
            RecurrencePattern::Monthly => "monthly",
            RecurrencePattern::Yearly => "yearly",
        }
    }

    /// Advance `date` by one occurrence.
    ///
    /// The result is always strictly after `date`. Monthly and yearly steps
    /// keep the day-of-month where possible and clamp to the last day of the
    /// target month otherwise, so Jan 31 steps to Feb 28 (or Feb 29 in a leap
    /// year) rather than spilling into March.
    pub fn step(&self, date: Date) -> Date {
        match self {
            RecurrencePattern::Daily => date + Duration::days(1),
            RecurrencePattern::Weekly => date + Duration::weeks(1),
            RecurrencePattern::Monthly => {
                let month = date.month().next();
                let year = if month == Month::January {
                    date.year() + 1
                } else {
                    date.year()
                };
                let day = date.day().min(month.length(year));

                // The day is clamped to the month length, so this cannot fail.
                Date::from_calendar_date(year, month, day).unwrap()
            }
            RecurrencePattern::Yearly => {
                let year = date.year() + 1;
                let day = date.day().min(date.month().length(year));

                Date::from_calendar_date(year, date.month(), day).unwrap()
            }
        }
    }
}

impl FromStr for RecurrencePattern {
    type Err = Error;

    /// Parse a pattern string.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidRecurrencePattern] for anything other than the
    /// four known pattern strings. An unknown pattern is rejected rather than
    /// silently treated as daily, since that would quietly schedule
    /// transactions the user never asked for.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(RecurrencePattern::Daily),
            "weekly" => Ok(RecurrencePattern::Weekly),
            "monthly" => Ok(RecurrencePattern::Monthly),
            "yearly" => Ok(RecurrencePattern::Yearly),
            _ => Err(Error::InvalidRecurrencePattern(s.to_owned())),
        }
    }
}

impl Display for RecurrencePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
