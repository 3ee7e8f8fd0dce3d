use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppointmentStatus;

/// Appointment entity - a scheduled meeting with a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub assigned_to: Option<Uuid>,
    pub title: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn new(
        customer_id: Uuid,
        assigned_to: Option<Uuid>,
        title: String,
        scheduled_at: DateTime<Utc>,
        duration_minutes: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            customer_id,
            assigned_to,
            title,
            scheduled_at,
            duration_minutes,
            status: AppointmentStatus::Scheduled,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Cancel with a mandatory reason. Idempotent on already-cancelled.
    pub fn cancel(&mut self, reason: String) {
        self.status = AppointmentStatus::Cancelled;
        self.cancel_reason = Some(reason);
        self.updated_at = Utc::now();
    }

    /// Scheduled in the future, within `window` of `now`.
    pub fn is_upcoming_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.status == AppointmentStatus::Scheduled
            && self.scheduled_at > now
            && self.scheduled_at <= now + window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_records_reason() {
        let mut appt = Appointment::new(
            Uuid::new_v4(),
            None,
            "Kickoff".into(),
            Utc::now() + Duration::hours(2),
            30,
        );
        appt.cancel("customer unavailable".into());
        assert_eq!(appt.status, AppointmentStatus::Cancelled);
        assert_eq!(appt.cancel_reason.as_deref(), Some("customer unavailable"));
    }

    #[test]
    fn upcoming_window_excludes_past_and_cancelled() {
        let now = Utc::now();
        let mut appt = Appointment::new(Uuid::new_v4(), None, "Review".into(), now + Duration::hours(1), 60);
        assert!(appt.is_upcoming_within(now, Duration::hours(24)));
        assert!(!appt.is_upcoming_within(now, Duration::minutes(30)));
        appt.cancel("moved".into());
        assert!(!appt.is_upcoming_within(now, Duration::hours(24)));
    }
}
