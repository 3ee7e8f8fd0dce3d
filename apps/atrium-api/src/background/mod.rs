//! Background jobs: token purging and appointment reminders.

mod scheduler;

pub use scheduler::{Scheduler, SchedulerConfig};

use chrono::{Duration, Utc};
use tokio_cron_scheduler::JobSchedulerError;

use atrium_core::ports::MailJob;

use crate::config::AppConfig;
use crate::state::AppState;

/// Register and start the recurring jobs.
pub async fn start(_config: &AppConfig, state: &AppState) -> Result<(), JobSchedulerError> {
    let scheduler = Scheduler::new(SchedulerConfig::from_env()).await?;

    // Hourly: drop expired refresh and reset tokens.
    let purge_state = state.clone();
    scheduler
        .add_cron("0 0 * * * *", move || {
            let state = purge_state.clone();
            async move {
                let now = Utc::now();
                match state.refresh_tokens.purge_expired(now).await {
                    Ok(purged) if purged > 0 => {
                        tracing::info!(purged, "Expired refresh tokens purged");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!("Refresh token purge failed: {}", e),
                }
                match state.reset_tokens.purge_expired(now).await {
                    Ok(purged) if purged > 0 => {
                        tracing::info!(purged, "Expired reset tokens purged");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!("Reset token purge failed: {}", e),
                }
            }
        })
        .await?;

    // Every 15 minutes: queue reminder mail for appointments starting
    // within the next day.
    let reminder_state = state.clone();
    scheduler
        .add_cron("0 */15 * * * *", move || {
            let state = reminder_state.clone();
            async move {
                let upcoming = match state
                    .appointments
                    .upcoming_within(Utc::now(), Duration::hours(24))
                    .await
                {
                    Ok(upcoming) => upcoming,
                    Err(e) => {
                        tracing::error!("Upcoming appointment lookup failed: {}", e);
                        return;
                    }
                };

                for appointment in upcoming {
                    let customer = match state.customers.find_by_id(appointment.customer_id).await
                    {
                        Ok(Some(customer)) => customer,
                        Ok(None) => continue,
                        Err(e) => {
                            tracing::error!("Customer lookup for reminder failed: {}", e);
                            continue;
                        }
                    };

                    // The cache marks reminders we already sent.
                    let marker = format!("reminder:{}", appointment.id);
                    if state.cache.exists(&marker).await {
                        continue;
                    }

                    let mail = MailJob::new(
                        customer.email.clone(),
                        format!("Reminder: {}", appointment.title),
                        format!(
                            "Hello {},\n\nThis is a reminder for your appointment \
                             \"{}\" on {}.\n",
                            customer.name,
                            appointment.title,
                            appointment.scheduled_at.format("%Y-%m-%d %H:%M UTC")
                        ),
                    );
                    if let Err(e) = state.mail.enqueue(mail).await {
                        tracing::error!("Could not queue reminder mail: {}", e);
                        continue;
                    }
                    if let Err(e) = state
                        .cache
                        .set(&marker, "sent", Some(std::time::Duration::from_secs(86400)))
                        .await
                    {
                        tracing::warn!("Could not mark reminder as sent: {}", e);
                    }
                    tracing::info!(appointment_id = %appointment.id, "Reminder queued");
                }
            }
        })
        .await?;

    scheduler.start().await
}
