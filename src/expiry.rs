//! Calendar helpers for document expiry.
//!
//! Day counts are whole calendar days between local dates; the time-of-day part of
//! server timestamps is ignored.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

const WIRE_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const LONG_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[month repr:long] [day], [year]");
const SHORT_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[month repr:short] [day], [year]");

/// Parse `YYYY-MM-DD`, accepting and discarding a trailing `T...` time part.
pub fn parse_wire_date(raw: &str) -> Option<Date> {
    let date_part = raw.trim().split('T').next()?;
    Date::parse(date_part, WIRE_DATE).ok()
}

pub fn format_wire_date(date: Date) -> String {
    date.format(WIRE_DATE).unwrap_or_else(|_| date.to_string())
}

/// "October 29, 2026"
pub fn format_long_date(date: Date) -> String {
    date.format(LONG_DATE).unwrap_or_else(|_| date.to_string())
}

/// "Oct 29, 2026"
pub fn format_short_date(date: Date) -> String {
    date.format(SHORT_DATE).unwrap_or_else(|_| date.to_string())
}

/// Today's date in the local timezone, falling back to UTC when the offset is unknown.
pub fn today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

/// Whole days from `today` until `expiry`; negative once expired.
pub fn days_until(expiry: Date, today: Date) -> i64 {
    (expiry - today).whole_days()
}

/// Bucket used by the status badge next to each document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryTier {
    Expired,
    ExpiringSoon,
    Approaching,
    Valid,
}

impl ExpiryTier {
    pub fn from_days(days: i64) -> Self {
        if days < 0 {
            ExpiryTier::Expired
        } else if days <= 30 {
            ExpiryTier::ExpiringSoon
        } else if days <= 90 {
            ExpiryTier::Approaching
        } else {
            ExpiryTier::Valid
        }
    }
}

pub fn status_badge(days: i64) -> String {
    match ExpiryTier::from_days(days) {
        ExpiryTier::Expired => format!("Expired {} days ago", days.abs()),
        ExpiryTier::ExpiringSoon | ExpiryTier::Approaching => format!("Expires in {days} days"),
        ExpiryTier::Valid => format!("Valid ({days} days left)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn parses_plain_and_timestamped_dates() {
        assert_eq!(parse_wire_date("2026-10-29"), Some(date!(2026 - 10 - 29)));
        assert_eq!(
            parse_wire_date("2026-10-29T00:00:00.000Z"),
            Some(date!(2026 - 10 - 29))
        );
        assert_eq!(parse_wire_date("29/10/2026"), None);
        assert_eq!(parse_wire_date(""), None);
    }

    #[test]
    fn days_until_counts_calendar_days() {
        let today = date!(2026 - 10 - 19);
        assert_eq!(days_until(date!(2026 - 10 - 29), today), 10);
        assert_eq!(days_until(today, today), 0);
        assert_eq!(days_until(date!(2026 - 10 - 18), today), -1);
        assert_eq!(days_until(date!(2027 - 10 - 19), today), 365);
    }

    #[test]
    fn badge_text_per_tier() {
        assert_eq!(status_badge(-1), "Expired 1 days ago");
        assert_eq!(status_badge(0), "Expires in 0 days");
        assert_eq!(status_badge(30), "Expires in 30 days");
        assert_eq!(ExpiryTier::from_days(31), ExpiryTier::Approaching);
        assert_eq!(status_badge(90), "Expires in 90 days");
        assert_eq!(status_badge(91), "Valid (91 days left)");
    }

    #[test]
    fn formats_dates_for_messages() {
        assert_eq!(format_long_date(date!(2026 - 10 - 29)), "October 29, 2026");
        assert_eq!(format_short_date(date!(2026 - 01 - 05)), "Jan 05, 2026");
        assert_eq!(format_wire_date(date!(2026 - 01 - 05)), "2026-01-05");
    }
}
