use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use atrium_core::domain::{Appointment, AppointmentStatus};
use atrium_core::error::RepoError;
use atrium_core::ports::{AppointmentRepository, BaseRepository, Page};

/// In-memory appointment repository.
pub struct InMemoryAppointmentRepository {
    rows: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryAppointmentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRepository<Appointment, Uuid> for InMemoryAppointmentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, RepoError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn save(&self, appointment: Appointment) -> Result<Appointment, RepoError> {
        self.rows
            .write()
            .await
            .insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn list(
        &self,
        limit: u64,
        offset: u64,
        status: Option<AppointmentStatus>,
        upcoming_only: bool,
    ) -> Result<Page<Appointment>, RepoError> {
        let now = Utc::now();
        let rows = self.rows.read().await;
        let mut matching: Vec<Appointment> = rows
            .values()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .filter(|a| {
                !upcoming_only
                    || (a.status == AppointmentStatus::Scheduled && a.scheduled_at > now)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok(Page { items, total })
    }

    async fn count(&self, status: Option<AppointmentStatus>) -> Result<u64, RepoError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .count() as u64)
    }

    async fn upcoming_within(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<Appointment>, RepoError> {
        let rows = self.rows.read().await;
        let mut upcoming: Vec<Appointment> = rows
            .values()
            .filter(|a| a.is_upcoming_within(now, window))
            .cloned()
            .collect();
        upcoming.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at));
        Ok(upcoming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appointment(hours_from_now: i64) -> Appointment {
        Appointment::new(
            Uuid::new_v4(),
            None,
            "Site visit".into(),
            Utc::now() + Duration::hours(hours_from_now),
            45,
        )
    }

    #[tokio::test]
    async fn upcoming_listing_skips_past_and_cancelled() {
        let repo = InMemoryAppointmentRepository::new();
        repo.save(appointment(-2)).await.unwrap();
        repo.save(appointment(2)).await.unwrap();
        let mut cancelled = appointment(3);
        cancelled.cancel("double booked".into());
        repo.save(cancelled).await.unwrap();

        let page = repo.list(10, 0, None, true).await.unwrap();
        assert_eq!(page.total, 1);

        let soon = repo.upcoming_within(Utc::now(), Duration::hours(24)).await.unwrap();
        assert_eq!(soon.len(), 1);
    }

    #[tokio::test]
    async fn counts_by_status() {
        let repo = InMemoryAppointmentRepository::new();
        repo.save(appointment(1)).await.unwrap();
        let mut done = appointment(-1);
        done.status = AppointmentStatus::Completed;
        repo.save(done).await.unwrap();

        assert_eq!(repo.count(None).await.unwrap(), 2);
        assert_eq!(
            repo.count(Some(AppointmentStatus::Completed)).await.unwrap(),
            1
        );
    }
}
