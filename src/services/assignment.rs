//! Host assignment
//!
//! Precedence: routing rules (first match), then the link's strategy.
//! Round-robin hands the booking to the roster successor of the host of the
//! link's most recent booking. Load-balanced picks the host with the fewest
//! live bookings in the current ISO week (Monday to Sunday, UTC), ties going
//! to roster order. `rule_based` links whose rules do not match fall back to
//! round-robin. `owner` links go to the owner.
//!
//! At booking time the choice is limited to hosts free for the slot: the
//! round-robin walk continues past busy hosts, load balancing only compares
//! free hosts, and a busy routing target is passed over.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use super::clock::Clock;
use crate::{
    error::{AppError, AppResult},
    models::{
        booking_link::{AssignmentType, BookingLink},
        rule::FormResponses,
    },
    repository::SchedulingStore,
    scheduling::rules::RuleCondition,
};

/// `[monday 00:00, next monday 00:00)` in UTC around `now`
pub fn iso_week_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive();
    let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    let start = Utc.from_utc_datetime(&monday.and_time(NaiveTime::MIN));
    (start, start + Duration::days(7))
}

#[derive(Clone)]
pub struct AssignmentService {
    store: Arc<dyn SchedulingStore>,
    clock: Arc<dyn Clock>,
}

impl AssignmentService {
    pub fn new(store: Arc<dyn SchedulingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Host a new booking would go to, ignoring calendars
    pub async fn determine_assignment(
        &self,
        link: &BookingLink,
        roster: &[Uuid],
        responses: &FormResponses,
    ) -> AppResult<Uuid> {
        self.assign(link, roster, responses, |_| true)
            .await?
            .ok_or_else(|| AppError::Internal("assignment found no host".to_string()))
    }

    /// Every host `assign` could return for these answers
    pub(crate) fn candidates(
        &self,
        link: &BookingLink,
        roster: &[Uuid],
        responses: &FormResponses,
    ) -> Vec<Uuid> {
        let mut hosts = effective_roster(link, roster);
        let targets = link
            .routing_rules
            .iter()
            .filter(|rule| rule.matches(responses))
            .map(|rule| rule.outcome);

        for host in targets {
            if !hosts.contains(&host) {
                hosts.push(host);
            }
        }
        hosts
    }

    /// Pick a host among those `eligible` accepts; `None` when none qualifies
    pub(crate) async fn assign<F>(
        &self,
        link: &BookingLink,
        roster: &[Uuid],
        responses: &FormResponses,
        eligible: F,
    ) -> AppResult<Option<Uuid>>
    where
        F: Fn(Uuid) -> bool + Send + Sync,
    {
        let roster = effective_roster(link, roster);

        if let Some(rule) = link
            .routing_rules
            .iter()
            .filter(|rule| rule.matches(responses))
            .find(|rule| eligible(rule.outcome))
        {
            tracing::debug!(link_id = %link.id, host = %rule.outcome, question = %rule.question_ref, "routed");
            return Ok(Some(rule.outcome));
        }

        let host = match link.assignment_type {
            AssignmentType::RoundRobin | AssignmentType::RuleBased => {
                self.round_robin(link, &roster, &eligible).await?
            }
            AssignmentType::LoadBalanced => self.load_balanced(link, &roster, &eligible).await?,
            AssignmentType::Owner => {
                // The owner only takes meetings on a roster they belong to
                if roster.contains(&link.owner_id) && eligible(link.owner_id) {
                    Some(link.owner_id)
                } else {
                    roster.iter().copied().find(|host| eligible(*host))
                }
            }
        };

        tracing::debug!(
            link_id = %link.id,
            strategy = link.assignment_type.as_str(),
            host = ?host,
            "assigned"
        );
        Ok(host)
    }

    async fn round_robin<F>(&self, link: &BookingLink, roster: &[Uuid], eligible: &F) -> AppResult<Option<Uuid>>
    where
        F: Fn(Uuid) -> bool + Sync,
    {
        let last_host = self
            .store
            .latest_booking(link.id)
            .await?
            .map(|booking| booking.assigned_host_id);

        let start = last_host
            .and_then(|host| roster.iter().position(|h| *h == host))
            .map(|index| (index + 1) % roster.len())
            .unwrap_or(0);

        Ok((0..roster.len())
            .map(|offset| roster[(start + offset) % roster.len()])
            .find(|host| eligible(*host)))
    }

    async fn load_balanced<F>(&self, link: &BookingLink, roster: &[Uuid], eligible: &F) -> AppResult<Option<Uuid>>
    where
        F: Fn(Uuid) -> bool + Sync,
    {
        let (week_start, week_end) = iso_week_bounds(self.clock.now());
        let counts = self
            .store
            .count_bookings_by_host(link.id, week_start, week_end)
            .await?;

        let mut best: Option<(Uuid, i64)> = None;
        for host in roster.iter().copied().filter(|host| eligible(*host)) {
            let count = counts.get(&host).copied().unwrap_or(0);
            // Strictly fewer: ties stay with the earlier roster entry
            if best.map_or(true, |(_, lowest)| count < lowest) {
                best = Some((host, count));
            }
        }
        Ok(best.map(|(host, _)| host))
    }
}

fn effective_roster(link: &BookingLink, roster: &[Uuid]) -> Vec<Uuid> {
    if roster.is_empty() {
        vec![link.owner_id]
    } else {
        roster.to_vec()
    }
}
