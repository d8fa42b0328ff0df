//! End-to-end scheduling scenarios against the in-memory store

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use meetlink_server::{
    config::SchedulingConfig,
    error::AppError,
    models::{
        booking::{BookingRequest, RescheduleRequest},
        booking_link::{AssignmentType, BookingLink, DateRangeKind, DateRangePolicy, LinkHost},
        rule::{RoutingRule, RuleOperator},
    },
    repository::{memory::MemoryStore, SchedulingStore},
    scheduling::StandardWorkingHours,
    services::{
        clock::{Clock, FixedClock},
        notifications::LogNotifier,
        Collaborators, Services,
    },
};

// Monday 2026-03-02 07:00 UTC
fn monday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 7, 0, 0).unwrap()
}

fn tuesday(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 3, h, m, 0).unwrap()
}

struct World {
    store: Arc<MemoryStore>,
    clock: Arc<FixedClock>,
    services: Services,
}

fn world(now: DateTime<Utc>) -> World {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(now));
    let services = Services::new(
        Collaborators {
            store: store.clone(),
            working_hours: Arc::new(StandardWorkingHours::default()),
            notifier: Arc::new(LogNotifier),
            history: store.clone(),
            clock: clock.clone(),
        },
        &SchedulingConfig::default(),
    );
    World { store, clock, services }
}

async fn link_with_hosts(store: &MemoryStore, kind: AssignmentType, hosts: usize) -> (BookingLink, Vec<Uuid>) {
    let mut link = BookingLink::new(Uuid::new_v4(), "discovery-call", 30);
    link.assignment_type = kind;
    let roster: Vec<Uuid> = (0..hosts).map(|_| Uuid::new_v4()).collect();
    let entries = roster
        .iter()
        .enumerate()
        .map(|(i, host)| LinkHost::active(*host, (hosts - i) as i32))
        .collect();
    store.insert_link(link.clone(), entries).await;
    (link, roster)
}

/// Store an edited link, keeping its roster
async fn save(store: &MemoryStore, link: &BookingLink) {
    let hosts = store.list_link_hosts(link.id).await.unwrap();
    store.insert_link(link.clone(), hosts).await;
}

fn request(start: DateTime<Utc>, email: &str) -> BookingRequest {
    BookingRequest {
        start_time: start,
        timezone: "UTC".to_string(),
        name: "Katherine Johnson".to_string(),
        email: email.to_string(),
        phone: None,
        company: Some("NASA".to_string()),
        country_code: None,
        form_responses: Default::default(),
        lead_id: None,
        assigned_host_id: None,
    }
}

#[test]
fn test_working_day_yields_sixteen_half_hour_slots() {
    let w = world(monday_morning());
    tokio_test::block_on(async {
        let (link, _) = link_with_hosts(&w.store, AssignmentType::Owner, 1).await;
        let day = w
            .services
            .availability
            .get_available_slots(&link, "2026-03-03", "UTC")
            .await
            .unwrap();

        assert_eq!(day.slots.len(), 16);
        assert_eq!(day.slots[0].start, tuesday(9, 0));
        assert_eq!(day.slots[15].end, tuesday(17, 0));
        assert!(day.message.is_none());
    });
}

#[tokio::test]
async fn test_busy_half_hour_removes_exactly_one_slot() {
    let w = world(monday_morning());
    let (link, hosts) = link_with_hosts(&w.store, AssignmentType::Owner, 1).await;
    w.store.block_time(hosts[0], tuesday(10, 0), tuesday(10, 30)).await;

    let day = w
        .services
        .availability
        .get_available_slots(&link, "2026-03-03", "UTC")
        .await
        .unwrap();

    assert_eq!(day.slots.len(), 15);
    assert!(day.slots.iter().all(|slot| slot.start != tuesday(10, 0)));
    assert!(day.slots.iter().any(|slot| slot.start == tuesday(9, 30)));
    assert!(day.slots.iter().any(|slot| slot.start == tuesday(10, 30)));
}

#[tokio::test]
async fn test_round_robin_spreads_bookings_evenly() {
    let w = world(monday_morning());
    let (link, hosts) = link_with_hosts(&w.store, AssignmentType::RoundRobin, 3).await;

    let mut per_host: HashMap<Uuid, usize> = HashMap::new();
    for i in 0..14 {
        let start = tuesday(9, 0) + Duration::minutes(30 * i);
        let confirmation = w
            .services
            .bookings
            .book_slot(&link, request(start, &format!("lead{}@acme.io", i)))
            .await
            .unwrap();
        *per_host.entry(confirmation.booking.assigned_host_id).or_insert(0) += 1;
    }

    // 14 bookings over 3 hosts: 4 or 5 each
    assert_eq!(per_host.len(), 3);
    for host in &hosts {
        let count = per_host[host];
        assert!((4..=5).contains(&count), "host {} got {}", host, count);
    }
}

#[tokio::test]
async fn test_load_balanced_always_picks_a_least_loaded_host() {
    let w = world(monday_morning());
    let (link, hosts) = link_with_hosts(&w.store, AssignmentType::LoadBalanced, 3).await;

    // Lopsided start: first host already carries two meetings this week
    for start in [tuesday(9, 0), tuesday(9, 30)] {
        let mut req = request(start, "seed@acme.io");
        req.assigned_host_id = Some(hosts[0]);
        w.services.bookings.book_slot(&link, req).await.unwrap();
    }

    let mut counts: HashMap<Uuid, usize> = HashMap::from([(hosts[0], 2), (hosts[1], 0), (hosts[2], 0)]);
    for i in 0..8 {
        let start = tuesday(11, 0) + Duration::minutes(30 * i);
        let confirmation = w
            .services
            .bookings
            .book_slot(&link, request(start, &format!("lb{}@acme.io", i)))
            .await
            .unwrap();
        let chosen = confirmation.booking.assigned_host_id;
        let lowest = counts.values().copied().min().unwrap();
        assert_eq!(counts[&chosen], lowest, "booking {} went to a busier host", i);
        *counts.get_mut(&chosen).unwrap() += 1;
    }
}

#[tokio::test]
async fn test_bookings_stay_within_roster_and_routing_targets() {
    let w = world(monday_morning());
    let (mut link, hosts) = link_with_hosts(&w.store, AssignmentType::RoundRobin, 2).await;
    let specialist = Uuid::new_v4();
    link.routing_rules = vec![RoutingRule {
        question_ref: "region".to_string(),
        operator: RuleOperator::Equals,
        value: "emea".to_string(),
        outcome: specialist,
    }];
    save(&w.store, &link).await;
    let bookings = &w.services.bookings;

    // Nobody the slot listing never looked at
    let mut stranger = request(tuesday(10, 0), "stranger@acme.io");
    stranger.assigned_host_id = Some(Uuid::new_v4());
    let result = bookings.book_slot(&link, stranger).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    // A routing target only counts when the answers route there
    let mut unrouted = request(tuesday(10, 0), "unrouted@acme.io");
    unrouted.assigned_host_id = Some(specialist);
    let result = bookings.book_slot(&link, unrouted).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let mut routed = request(tuesday(10, 0), "routed@acme.io");
    routed.form_responses.insert("region".to_string(), serde_json::json!("emea"));
    routed.assigned_host_id = Some(specialist);
    let confirmation = bookings.book_slot(&link, routed).await.unwrap();
    assert_eq!(confirmation.booking.assigned_host_id, specialist);

    let mut listed = request(tuesday(11, 0), "listed@acme.io");
    listed.assigned_host_id = Some(hosts[1]);
    let confirmation = bookings.book_slot(&link, listed).await.unwrap();
    assert_eq!(confirmation.booking.assigned_host_id, hosts[1]);

    let stored = w.store.list_bookings(link.id, None, None).await.unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn test_minimum_notice_boundary() {
    // Monday 08:30: one hour of notice means 09:30 is the first start
    let w = world(Utc.with_ymd_and_hms(2026, 3, 2, 8, 30, 0).unwrap());
    let (mut link, _) = link_with_hosts(&w.store, AssignmentType::Owner, 1).await;
    link.min_notice_hours = 1;
    save(&w.store, &link).await;

    let now = w.clock.now();
    let availability = &w.services.availability;
    assert!(!availability
        .is_slot_available(&link, now + Duration::minutes(30), "UTC")
        .await
        .unwrap());
    assert!(availability
        .is_slot_available(&link, now + Duration::hours(2), "UTC")
        .await
        .unwrap());

    let result = w
        .services
        .bookings
        .book_slot(&link, request(now + Duration::minutes(30), "early@acme.io"))
        .await;
    assert!(matches!(result, Err(AppError::SlotNoLongerAvailable(_))));
}

#[tokio::test]
async fn test_daily_limit_keeps_only_the_earliest_slot() {
    let w = world(monday_morning());
    let (mut link, _) = link_with_hosts(&w.store, AssignmentType::RoundRobin, 2).await;
    link.max_bookings_per_day = Some(3);
    save(&w.store, &link).await;

    for (i, start) in [tuesday(13, 0), tuesday(15, 0)].into_iter().enumerate() {
        w.services
            .bookings
            .book_slot(&link, request(start, &format!("day{}@acme.io", i)))
            .await
            .unwrap();
    }

    let day = w
        .services
        .availability
        .get_available_slots(&link, "2026-03-03", "UTC")
        .await
        .unwrap();
    assert_eq!(day.slots.len(), 1);
    assert_eq!(day.slots[0].start, tuesday(9, 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_of_one_slot_admit_exactly_one() {
    for round in 0..10 {
        let w = world(monday_morning());
        let (link, _) = link_with_hosts(&w.store, AssignmentType::Owner, 1).await;

        let attempts: Vec<_> = (0..2)
            .map(|i| {
                let services = w.services.clone();
                let link = link.clone();
                tokio::spawn(async move {
                    services
                        .bookings
                        .book_slot(&link, request(tuesday(10, 0), &format!("race{}@acme.io", i)))
                        .await
                })
            })
            .collect();

        let mut booked = 0;
        let mut refused = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => booked += 1,
                Err(AppError::SlotNoLongerAvailable(_)) => refused += 1,
                Err(other) => panic!("round {}: unexpected error {}", round, other),
            }
        }
        assert_eq!((booked, refused), (1, 1), "round {}", round);
    }
}

#[tokio::test]
async fn test_reschedule_keeps_booking_and_event_in_step() {
    let w = world(monday_morning());
    let (link, _) = link_with_hosts(&w.store, AssignmentType::Owner, 1).await;
    let original = w
        .services
        .bookings
        .book_slot(&link, request(tuesday(10, 0), "move@acme.io"))
        .await
        .unwrap();

    for new_start in [tuesday(14, 0), tuesday(10, 30), tuesday(16, 30)] {
        let moved = w
            .services
            .bookings
            .reschedule_booking(
                original.booking.id,
                RescheduleRequest {
                    new_start,
                    timezone: "UTC".to_string(),
                },
            )
            .await
            .unwrap();

        let booking = w.store.get_booking(original.booking.id).await.unwrap();
        let event = w.store.get_calendar_event(booking.calendar_event_id).await.unwrap();
        assert_eq!(moved.booking.scheduled_start, new_start);
        assert_eq!(booking.scheduled_start, event.start_time);
        assert_eq!(booking.scheduled_end, event.end_time);
        assert_eq!(event.id, original.calendar_event.id);
    }
}

#[tokio::test]
async fn test_business_day_window_counts_weekdays_only() {
    // Friday 2026-03-06: five business days later is Friday 2026-03-13
    let w = world(Utc.with_ymd_and_hms(2026, 3, 6, 7, 0, 0).unwrap());
    let (mut link, _) = link_with_hosts(&w.store, AssignmentType::Owner, 1).await;
    link.date_range = DateRangePolicy {
        kind: DateRangeKind::BusinessDays,
        value: 5,
    };
    save(&w.store, &link).await;

    let availability = &w.services.availability;
    let last_day = availability
        .get_available_slots(&link, "2026-03-13", "UTC")
        .await
        .unwrap();
    assert_eq!(last_day.slots.len(), 16);

    // Saturday eight days out lies past the window
    let saturday = availability
        .get_available_slots(&link, "2026-03-14", "UTC")
        .await
        .unwrap();
    assert!(saturday.slots.is_empty());
    assert_eq!(
        saturday.message.as_deref(),
        Some("Bookings are only accepted until 2026-03-13")
    );
}

#[tokio::test]
async fn test_reminders_flow_through_the_dispatcher() {
    let w = world(monday_morning());
    let (link, _) = link_with_hosts(&w.store, AssignmentType::Owner, 1).await;
    let confirmation = w
        .services
        .bookings
        .book_slot(&link, request(tuesday(10, 0), "remind@acme.io"))
        .await
        .unwrap();

    // Nothing is due yet
    let sent = w.services.bookings.dispatch_due_reminders(w.clock.now()).await.unwrap();
    assert_eq!(sent, 0);

    // 24h before the meeting
    w.clock.set(tuesday(10, 0) - Duration::hours(24));
    let sent = w.services.bookings.dispatch_due_reminders(w.clock.now()).await.unwrap();
    assert_eq!(sent, 1);

    let history = w.store.history().await;
    assert!(history
        .iter()
        .any(|event| event.booking_id == Some(confirmation.booking.id)));
}
