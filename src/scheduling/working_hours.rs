//! Working-hours lookup for a link and date

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};

use crate::{
    error::AppResult,
    models::{booking_link::BookingLink, calendar::WorkingWindow},
};

/// Source of the working-hour windows a link offers on a date
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkingHoursProvider: Send + Sync {
    async fn working_hours(&self, link: &BookingLink, date: NaiveDate) -> AppResult<Vec<WorkingWindow>>;
}

/// Same window on every listed weekday, nothing on other days
#[derive(Debug, Clone)]
pub struct StandardWorkingHours {
    window: WorkingWindow,
    days: Vec<Weekday>,
}

impl StandardWorkingHours {
    pub fn new(window: WorkingWindow, days: Vec<Weekday>) -> Self {
        Self { window, days }
    }

    /// Monday to Friday over `window`
    pub fn weekdays(window: WorkingWindow) -> Self {
        Self::new(
            window,
            vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
        )
    }
}

impl Default for StandardWorkingHours {
    fn default() -> Self {
        let window = WorkingWindow::new(
            chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
        );
        Self::weekdays(window)
    }
}

#[async_trait]
impl WorkingHoursProvider for StandardWorkingHours {
    async fn working_hours(&self, _link: &BookingLink, date: NaiveDate) -> AppResult<Vec<WorkingWindow>> {
        if self.days.contains(&date.weekday()) {
            Ok(vec![self.window])
        } else {
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_weekends_have_no_hours() {
        let hours = StandardWorkingHours::default();
        let link = BookingLink::new(Uuid::new_v4(), "intro", 30);

        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let saturday = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();

        let windows = hours.working_hours(&link, monday).await.unwrap();
        assert_eq!(windows, vec![WorkingWindow::parse("09:00", "17:00").unwrap()]);
        assert!(hours.working_hours(&link, saturday).await.unwrap().is_empty());
    }
}
