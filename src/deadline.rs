// src/deadline.rs
//! Application deadlines quoted in notice text, and how close they are.

use chrono::{Datelike, FixedOffset, NaiveDate, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;

/// Admission offices publish in KST; "today" is judged there.
const KST_OFFSET_SECS: i32 = 9 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    /// More than a year past.
    Expired,
    RecentPast,
    /// Due today or within 3 days.
    High,
    /// Within a week.
    Medium,
    /// Within 30 days.
    Low,
    Normal,
}

impl Urgency {
    pub fn for_days(days_left: i64) -> Self {
        match days_left {
            d if d < -365 => Urgency::Expired,
            d if d < 0 => Urgency::RecentPast,
            0..=3 => Urgency::High,
            4..=7 => Urgency::Medium,
            8..=30 => Urgency::Low,
            _ => Urgency::Normal,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Urgency::High => "🔴",
            Urgency::Medium => "🟡",
            Urgency::Low => "🟢",
            _ => "⚪",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    pub date: NaiveDate,
    pub days_left: i64,
    pub urgency: Urgency,
}

impl Deadline {
    pub fn new(date: NaiveDate, today: NaiveDate) -> Self {
        let days_left = (date - today).num_days();
        Self {
            date,
            days_left,
            urgency: Urgency::for_days(days_left),
        }
    }

    /// Looks in the title first, then the body.
    pub fn find(title: &str, content: &str, today: NaiveDate) -> Option<Self> {
        extract_deadline(title, content, today).map(|d| Self::new(d, today))
    }
}

enum Shape {
    FullDate,
    MonthDay,
}

fn patterns() -> &'static [(Regex, Shape)] {
    static PATTERNS: OnceCell<Vec<(Regex, Shape)>> = OnceCell::new();
    PATTERNS.get_or_init(|| {
        vec![
            (Regex::new(r"(\d{4})\.(\d{1,2})\.(\d{1,2})").unwrap(), Shape::FullDate),
            (Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").unwrap(), Shape::FullDate),
            (Regex::new(r"~\s*(\d{1,2})\.(\d{1,2})").unwrap(), Shape::MonthDay),
            (Regex::new(r"마감\s*[:：]\s*(\d{1,2})\.(\d{1,2})").unwrap(), Shape::MonthDay),
        ]
    })
}

/// First date matching `YYYY.MM.DD`, `YYYY-MM-DD`, `~M.D` or `마감: M.D`,
/// in that order of preference. Month-day forms whose month is already
/// behind `today` roll into next year; full dates older than last year are
/// read as this year. Impossible dates are skipped.
pub fn extract_deadline(title: &str, content: &str, today: NaiveDate) -> Option<NaiveDate> {
    scan(title, today).or_else(|| scan(content, today))
}

fn scan(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let year = today.year();
    for (re, shape) in patterns() {
        for caps in re.captures_iter(text) {
            let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
            let date = match shape {
                Shape::FullDate => {
                    let (Some(y), Some(m), Some(d)) = (num(1), num(2), num(3)) else {
                        continue;
                    };
                    let y = i32::try_from(y).unwrap_or(year);
                    let y = if y < year - 1 { year } else { y };
                    NaiveDate::from_ymd_opt(y, m, d)
                }
                Shape::MonthDay => {
                    let (Some(m), Some(d)) = (num(1), num(2)) else {
                        continue;
                    };
                    let y = if m < today.month() { year + 1 } else { year };
                    NaiveDate::from_ymd_opt(y, m, d)
                }
            };
            if date.is_some() {
                return date;
            }
        }
    }
    None
}

pub fn today_kst() -> NaiveDate {
    match FixedOffset::east_opt(KST_OFFSET_SECS) {
        Some(tz) => Utc::now().with_timezone(&tz).date_naive(),
        None => Utc::now().date_naive(),
    }
}
