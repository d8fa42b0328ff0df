//! Booking analytics for a link

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{analytics::BookingAnalytics, booking::BookingStatus},
    repository::SchedulingStore,
};

fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

#[derive(Clone)]
pub struct AnalyticsService {
    store: Arc<dyn SchedulingStore>,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Counts by status and the derived show, close and qualification rates.
    ///
    /// Bookings are filtered on their scheduled start; leads are counted over
    /// the whole link.
    pub async fn get_booking_analytics(
        &self,
        link_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> AppResult<BookingAnalytics> {
        // Unknown links are a 404, not an empty report
        self.store.get_booking_link(link_id).await?;

        let bookings = self.store.list_bookings(link_id, from, to).await?;
        let leads = self.store.list_leads(link_id).await?;

        let count = |status: BookingStatus| bookings.iter().filter(|b| b.status == status).count();
        let completed = count(BookingStatus::Completed);
        let no_show = count(BookingStatus::NoShow);
        let closed_won = bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Completed && b.closed_won)
            .count();
        let qualified_leads = leads.iter().filter(|l| l.qualified).count();

        Ok(BookingAnalytics {
            booking_link_id: link_id,
            total: bookings.len(),
            scheduled: count(BookingStatus::Scheduled),
            rescheduled: count(BookingStatus::Rescheduled),
            completed,
            no_show,
            cancelled: count(BookingStatus::Cancelled),
            closed_won,
            leads: leads.len(),
            qualified_leads,
            show_rate: ratio(completed, completed + no_show),
            close_rate: ratio(closed_won, completed),
            qualification_rate: ratio(qualified_leads, leads.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppError,
        models::{
            booking::NewBooking,
            booking_link::BookingLink,
            lead::NewLead,
        },
        repository::memory::MemoryStore,
    };
    use chrono::{Duration, TimeZone};

    async fn booking(store: &MemoryStore, link: &BookingLink, hour: u32) -> Uuid {
        let start = Utc.with_ymd_and_hms(2026, 3, 3, hour, 0, 0).unwrap();
        let (booking, _) = store
            .create_booking(NewBooking {
                booking_link_id: link.id,
                lead_id: None,
                assigned_host_id: link.owner_id,
                scheduled_start: start,
                scheduled_end: start + Duration::minutes(30),
                timezone: "UTC".to_string(),
                invitee_name: "Ada".to_string(),
                invitee_email: format!("ada{}@acme.io", hour),
                event_title: "Intro".to_string(),
            })
            .await
            .unwrap();
        booking.id
    }

    async fn lead(store: &MemoryStore, link: &BookingLink, email: &str, qualified: bool) {
        store
            .upsert_lead(NewLead {
                booking_link_id: link.id,
                name: "Lead".to_string(),
                email: email.to_string(),
                phone: None,
                company: None,
                country_code: None,
                form_responses: Default::default(),
                qualified,
                disqualification_reason: None,
                last_booking_id: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rates_follow_outcomes() {
        let store = Arc::new(MemoryStore::new());
        let link = BookingLink::new(Uuid::new_v4(), "demo", 30);
        store.insert_link(link.clone(), Vec::new()).await;

        let won = booking(&store, &link, 9).await;
        let lost = booking(&store, &link, 10).await;
        let absent = booking(&store, &link, 11).await;
        let dropped = booking(&store, &link, 12).await;
        booking(&store, &link, 13).await;

        store.set_booking_outcome(won, BookingStatus::Completed, true).await.unwrap();
        store.set_booking_outcome(lost, BookingStatus::Completed, false).await.unwrap();
        store.set_booking_outcome(absent, BookingStatus::NoShow, false).await.unwrap();
        store.cancel_booking(dropped, None, "host").await.unwrap();

        lead(&store, &link, "a@acme.io", true).await;
        lead(&store, &link, "b@acme.io", true).await;
        lead(&store, &link, "c@acme.io", true).await;
        lead(&store, &link, "d@gmail.com", false).await;

        let analytics = AnalyticsService::new(store)
            .get_booking_analytics(link.id, None, None)
            .await
            .unwrap();

        assert_eq!(analytics.total, 5);
        assert_eq!(analytics.scheduled, 1);
        assert_eq!(analytics.completed, 2);
        assert_eq!(analytics.no_show, 1);
        assert_eq!(analytics.cancelled, 1);
        assert_eq!(analytics.closed_won, 1);
        assert_eq!(analytics.show_rate, Some(2.0 / 3.0));
        assert_eq!(analytics.close_rate, Some(0.5));
        assert_eq!(analytics.qualification_rate, Some(0.75));
    }

    #[tokio::test]
    async fn test_empty_link_has_no_rates() {
        let store = Arc::new(MemoryStore::new());
        let link = BookingLink::new(Uuid::new_v4(), "quiet", 30);
        store.insert_link(link.clone(), Vec::new()).await;
        let service = AnalyticsService::new(store);

        let analytics = service.get_booking_analytics(link.id, None, None).await.unwrap();
        assert_eq!(analytics.total, 0);
        assert_eq!(analytics.show_rate, None);
        assert_eq!(analytics.close_rate, None);
        assert_eq!(analytics.qualification_rate, None);

        let missing = service.get_booking_analytics(Uuid::new_v4(), None, None).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }
}
