//! Booking link configuration and host roster

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::rule::{DisqualificationRule, RoutingRule};
use crate::error::{AppError, AppResult};

/// How far ahead a link accepts bookings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DateRangeKind {
    /// `value` calendar days from today
    CalendarDays,
    /// `value` weekdays (Mon-Fri) from today; weekends extend the window
    BusinessDays,
    /// Capped at one year from today
    Indefinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DateRangePolicy {
    #[serde(rename = "type")]
    pub kind: DateRangeKind,
    pub value: i32,
}

impl Default for DateRangePolicy {
    fn default() -> Self {
        Self {
            kind: DateRangeKind::CalendarDays,
            value: 60,
        }
    }
}

/// Strategy used to pick the host of a new booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentType {
    #[default]
    Owner,
    RoundRobin,
    LoadBalanced,
    RuleBased,
}

impl AssignmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentType::Owner => "owner",
            AssignmentType::RoundRobin => "round_robin",
            AssignmentType::LoadBalanced => "load_balanced",
            AssignmentType::RuleBased => "rule_based",
        }
    }
}

impl std::str::FromStr for AssignmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(AssignmentType::Owner),
            "round_robin" => Ok(AssignmentType::RoundRobin),
            "load_balanced" => Ok(AssignmentType::LoadBalanced),
            "rule_based" => Ok(AssignmentType::RuleBased),
            other => Err(format!("unknown assignment type '{}'", other)),
        }
    }
}

/// Implicit qualification checks run before the explicit rule list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct QualificationSettings {
    /// Reject addresses on free webmail domains
    pub require_business_email: bool,
    /// ISO country codes accepted; empty accepts all
    pub allowed_country_codes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct NotificationSettings {
    pub send_confirmation_email: bool,
    pub send_reminders: bool,
    /// Minutes before the meeting at which reminders go out
    pub reminder_offsets_minutes: Vec<i64>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            send_confirmation_email: true,
            send_reminders: true,
            reminder_offsets_minutes: vec![24 * 60, 60],
        }
    }
}

/// One schedulable booking link. Read-only to the scheduling core.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingLink {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub slug: String,
    pub name: String,
    /// Meeting length in minutes
    pub duration_minutes: i32,
    #[serde(default)]
    pub date_range: DateRangePolicy,
    /// Minutes between consecutive slot starts
    #[serde(default = "default_increment")]
    pub start_time_increment: i32,
    #[serde(default)]
    pub buffer_before: i32,
    #[serde(default)]
    pub buffer_after: i32,
    #[serde(default)]
    pub min_notice_hours: i32,
    #[serde(default)]
    pub max_bookings_per_day: Option<i32>,
    #[serde(default)]
    pub assignment_type: AssignmentType,
    #[serde(default = "default_true")]
    pub allow_reschedule: bool,
    #[serde(default)]
    pub prevent_duplicate_bookings: bool,
    #[serde(default)]
    pub disqualification_rules: Vec<DisqualificationRule>,
    #[serde(default)]
    pub routing_rules: Vec<RoutingRule>,
    #[serde(default)]
    pub qualification: QualificationSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
}

fn default_increment() -> i32 {
    30
}

fn default_true() -> bool {
    true
}

impl BookingLink {
    /// A link with structural defaults for everything but the essentials
    pub fn new(owner_id: Uuid, slug: impl Into<String>, duration_minutes: i32) -> Self {
        let slug = slug.into();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name: slug.clone(),
            slug,
            duration_minutes,
            date_range: DateRangePolicy::default(),
            start_time_increment: default_increment(),
            buffer_before: 0,
            buffer_after: 0,
            min_notice_hours: 0,
            max_bookings_per_day: None,
            assignment_type: AssignmentType::default(),
            allow_reschedule: true,
            prevent_duplicate_bookings: false,
            disqualification_rules: Vec::new(),
            routing_rules: Vec::new(),
            qualification: QualificationSettings::default(),
            notifications: NotificationSettings::default(),
        }
    }
}

impl BookingLink {
    /// Reject configurations the slot engine cannot work with
    pub fn check_config(&self) -> AppResult<()> {
        let invalid = |msg: String| Err(AppError::InvalidConfiguration(msg));
        if self.duration_minutes <= 0 {
            return invalid(format!("duration must be positive (got {})", self.duration_minutes));
        }
        if self.start_time_increment <= 0 {
            return invalid(format!(
                "start time increment must be positive (got {})",
                self.start_time_increment
            ));
        }
        if self.buffer_before < 0 || self.buffer_after < 0 {
            return invalid("buffers cannot be negative".to_string());
        }
        if self.min_notice_hours < 0 {
            return invalid("minimum notice cannot be negative".to_string());
        }
        if self.date_range.value < 0 {
            return invalid("date range value cannot be negative".to_string());
        }
        if matches!(self.max_bookings_per_day, Some(limit) if limit < 0) {
            return invalid("daily booking limit cannot be negative".to_string());
        }
        Ok(())
    }
}

/// A host on a link's roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LinkHost {
    pub user_id: Uuid,
    pub priority: i32,
    pub is_active: bool,
}

impl LinkHost {
    pub fn active(user_id: Uuid, priority: i32) -> Self {
        Self {
            user_id,
            priority,
            is_active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_sparse_json() {
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "owner_id": Uuid::new_v4(),
            "slug": "demo",
            "name": "Demo call",
            "duration_minutes": 45
        });
        let link: BookingLink = serde_json::from_value(json).unwrap();
        assert_eq!(link.start_time_increment, 30);
        assert_eq!(link.buffer_before, 0);
        assert_eq!(link.date_range, DateRangePolicy::default());
        assert_eq!(link.assignment_type, AssignmentType::Owner);
        assert!(link.allow_reschedule);
        assert!(link.notifications.send_confirmation_email);
        assert!(link.check_config().is_ok());
    }

    #[test]
    fn test_check_config_rejects_bad_values() {
        let mut link = BookingLink::new(Uuid::new_v4(), "demo", 30);
        link.start_time_increment = 0;
        assert!(matches!(link.check_config(), Err(AppError::InvalidConfiguration(_))));

        let mut link = BookingLink::new(Uuid::new_v4(), "demo", 30);
        link.buffer_after = -5;
        assert!(matches!(link.check_config(), Err(AppError::InvalidConfiguration(_))));

        let link = BookingLink::new(Uuid::new_v4(), "demo", 0);
        assert!(matches!(link.check_config(), Err(AppError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_assignment_type_parsing() {
        assert_eq!("load_balanced".parse::<AssignmentType>(), Ok(AssignmentType::LoadBalanced));
        assert_eq!(AssignmentType::RuleBased.as_str(), "rule_based");
        assert!("random".parse::<AssignmentType>().is_err());
    }
}
