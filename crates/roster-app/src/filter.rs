// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::{Date, Duration, Month, OffsetDateTime, Time};
use tracing::debug;

use crate::{ActivityFilter, DateRange, FilterState, RoleFilter, TeamFilter, ViewState};

/// Half-open `[start_ms, end_ms)` interval in unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateBounds {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl DateBounds {
    pub const fn contains(self, at_ms: i64) -> bool {
        at_ms >= self.start_ms && at_ms < self.end_ms
    }
}

impl DateRange {
    /// Resolves the named range against `now`. `AllTime` is unbounded.
    pub fn bounds(self, now: OffsetDateTime) -> Option<DateBounds> {
        let now_ms = unix_millis(now);
        match self {
            Self::AllTime => None,
            Self::Last30Days => Some(DateBounds {
                start_ms: unix_millis(now - Duration::days(30)),
                end_ms: now_ms,
            }),
            Self::PreviousMonth => {
                let this_month = first_of_month(now.date())?;
                let last_month = add_months(this_month, -1)?;
                Some(DateBounds {
                    start_ms: unix_millis(midnight(last_month, now)),
                    end_ms: unix_millis(midnight(this_month, now)),
                })
            }
            Self::Last6Months => {
                let start = add_months(now.date(), -6)?;
                Some(DateBounds {
                    start_ms: unix_millis(now.replace_date(start)),
                    end_ms: now_ms,
                })
            }
        }
    }
}

impl ViewState {
    /// Replaces the filter and restarts pagination. The sort is never touched.
    pub fn set_filter(&mut self, filter: FilterState) -> bool {
        if filter == self.filter {
            return false;
        }
        debug!(?filter, "filter changed");
        self.filter = filter;
        self.reset();
        true
    }

    pub fn set_date_range(&mut self, date_range: DateRange) -> bool {
        self.set_filter(FilterState {
            date_range,
            ..self.filter
        })
    }

    pub fn set_role(&mut self, role: Option<RoleFilter>) -> bool {
        self.set_filter(FilterState { role, ..self.filter })
    }

    pub fn set_team(&mut self, team: TeamFilter) -> bool {
        self.set_filter(FilterState { team, ..self.filter })
    }

    pub fn set_activity(&mut self, activity: ActivityFilter) -> bool {
        self.set_filter(FilterState {
            activity,
            ..self.filter
        })
    }
}

pub fn unix_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn add_months(date: Date, months: i32) -> Option<Date> {
    let base_month = i32::from(date.month() as u8);
    let total_month = base_month - 1 + months;
    let year = date.year() + total_month.div_euclid(12);
    let month = Month::try_from((total_month.rem_euclid(12) + 1) as u8).ok()?;
    let day = date.day().min(last_day_of_month(year, month)?);
    Date::from_calendar_date(year, month, day).ok()
}

fn last_day_of_month(year: i32, month: Month) -> Option<u8> {
    let (next_year, next_month) = if month == Month::December {
        (year + 1, Month::January)
    } else {
        (year, month.next())
    };
    let first_next = Date::from_calendar_date(next_year, next_month, 1).ok()?;
    first_next.previous_day().map(|last| last.day())
}

fn first_of_month(date: Date) -> Option<Date> {
    date.replace_day(1).ok()
}

fn midnight(date: Date, like: OffsetDateTime) -> OffsetDateTime {
    date.with_time(Time::MIDNIGHT).assume_offset(like.offset())
}
