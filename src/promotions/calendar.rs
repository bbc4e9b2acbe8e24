//! The recurring Steam sale calendar and the date math for announcing it.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

/// A recurring storefront sale window.
#[derive(Debug, Clone, Copy)]
pub struct SaleWindow {
    pub name: &'static str,
    pub emoji: &'static str,
    pub month: u32,
    pub start_day: u32,
    pub duration_days: u32,
}

/// Steam's seasonal sales. Valve shifts the exact dates a little each year;
/// these are the customary start days.
pub const SALES_CALENDAR: [SaleWindow; 6] = [
    SaleWindow {
        name: "Spring Sale",
        emoji: "🌸",
        month: 3,
        start_day: 14,
        duration_days: 14,
    },
    SaleWindow {
        name: "Summer Sale",
        emoji: "☀️",
        month: 6,
        start_day: 23,
        duration_days: 14,
    },
    SaleWindow {
        name: "Autumn Sale",
        emoji: "🍂",
        month: 11,
        start_day: 21,
        duration_days: 14,
    },
    SaleWindow {
        name: "Winter Sale",
        emoji: "❄️",
        month: 12,
        start_day: 20,
        duration_days: 14,
    },
    SaleWindow {
        name: "Lunar New Year Sale",
        emoji: "🧧",
        month: 2,
        start_day: 1,
        duration_days: 7,
    },
    SaleWindow {
        name: "Halloween Sale",
        emoji: "🎃",
        month: 10,
        start_day: 28,
        duration_days: 7,
    },
];

/// A sale due to start within the lookahead horizon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromotionDue {
    pub name: &'static str,
    pub emoji: &'static str,
    pub starts_on: NaiveDate,
    pub days_until: i64,
    pub duration_days: u32,
}

/// Sales starting within `lookahead_days` of `now`, soonest first.
///
/// A sale starting today counts (`days_until == 0`); `days_until` is never
/// negative because a window already past rolls over to next year's date.
pub fn due_announcements(now: DateTime<Utc>, lookahead_days: i64) -> Vec<PromotionDue> {
    let today = now.date_naive();
    let mut due = Vec::new();

    for window in &SALES_CALENDAR {
        let Some(starts_on) = next_occurrence(window, today) else {
            continue;
        };
        let days_until = (starts_on - today).num_days();
        if days_until <= lookahead_days {
            due.push(PromotionDue {
                name: window.name,
                emoji: window.emoji,
                starts_on,
                days_until,
                duration_days: window.duration_days,
            });
        }
    }

    due.sort_by_key(|d| d.days_until);
    due
}

/// This year's occurrence, or next year's when this year's date is past.
fn next_occurrence(window: &SaleWindow, today: NaiveDate) -> Option<NaiveDate> {
    let this_year = NaiveDate::from_ymd_opt(today.year(), window.month, window.start_day)?;
    if this_year < today {
        NaiveDate::from_ymd_opt(today.year() + 1, window.month, window.start_day)
    } else {
        Some(this_year)
    }
}
