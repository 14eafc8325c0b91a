// SPDX-FileCopyrightText: 2026 Dutyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The polling driver behind the escalation scheduler.
//!
//! Each tick drains every due job. Executing a job means running exactly one
//! escalation step: pick the step's channel, send if the user has that
//! channel (a channel the user lacks makes the step a counted no-op), advance
//! the notification's step counter, and schedule the next step's wake-up.
//! Jobs without a policy perform a single best-effort delivery instead.
//!
//! Crash safety: the claim pushes `due_at` forward inside a transaction, so
//! a driver that dies mid-step leaves the job to come due again after the
//! lock window. That retries the send -- at-least-once, not exactly-once.

use std::sync::Arc;
use std::time::Duration;

use dutyline_core::{ChatTransport, DutylineError, EscalationJob, SmsTransport};
use dutyline_dispatch::deliver;
use dutyline_storage::queries::{jobs, notifications, policies, users};
use dutyline_storage::Database;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How far a claim pushes `due_at` forward; a crashed driver's job comes
/// due again after this window.
const CLAIM_LOCK_SECS: i64 = 300;

/// Drives due escalation jobs against the database and transports.
pub struct EscalationRunner {
    db: Arc<Database>,
    chat: Option<Arc<dyn ChatTransport>>,
    sms: Option<Arc<dyn SmsTransport>>,
    poll_interval: Duration,
}

impl EscalationRunner {
    pub fn new(
        db: Arc<Database>,
        chat: Option<Arc<dyn ChatTransport>>,
        sms: Option<Arc<dyn SmsTransport>>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            db,
            chat,
            sms,
            poll_interval,
        }
    }

    /// Run until the cancellation token fires, draining due jobs every tick.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(interval_secs = self.poll_interval.as_secs(), "escalation runner started");
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.drain_due_jobs().await {
                        error!(error = %e, "escalation drain failed");
                    }
                }
                _ = cancel.cancelled() => {
                    info!("escalation runner stopping");
                    break;
                }
            }
        }
    }

    /// Claim and execute every currently due job. Returns how many ran.
    pub async fn drain_due_jobs(&self) -> Result<usize, DutylineError> {
        let mut executed = 0;
        while let Some(job) = jobs::claim_due_job(&self.db, CLAIM_LOCK_SECS).await? {
            self.execute_job(&job).await?;
            executed += 1;
        }
        Ok(executed)
    }

    fn chat(&self) -> Option<&dyn ChatTransport> {
        self.chat.as_deref()
    }

    fn sms(&self) -> Option<&dyn SmsTransport> {
        self.sms.as_deref()
    }

    /// Execute one claimed job: a single escalation step, or the one-shot
    /// best-effort delivery for policy-less notifications.
    async fn execute_job(&self, job: &EscalationJob) -> Result<(), DutylineError> {
        let db = &self.db;

        let Some(notification) = notifications::get_notification(db, &job.notification_id).await?
        else {
            warn!(notification = %job.notification_id, "job for unknown notification; dropping");
            jobs::complete_job(db, &job.notification_id).await?;
            return Ok(());
        };

        // The response may have landed while the cancel signal failed, or a
        // user may have archived the notification. Either way: stop quietly.
        if !notification.status.is_active() {
            debug!(
                notification = %notification.id,
                status = %notification.status,
                "notification no longer active; finishing job"
            );
            jobs::complete_job(db, &notification.id).await?;
            return Ok(());
        }

        // Snooze suspends escalation without touching status or step index.
        if let Some(snoozed_until) = notification.snoozed_until.as_deref()
            && snoozed_until > now_timestamp().as_str()
        {
            debug!(notification = %notification.id, until = snoozed_until, "job snoozed");
            jobs::defer_job(db, &notification.id, snoozed_until).await?;
            return Ok(());
        }

        let Some(user) = users::get_user(db, &notification.user_id).await? else {
            warn!(notification = %notification.id, "owner missing; finishing job");
            jobs::complete_job(db, &notification.id).await?;
            return Ok(());
        };

        let Some(policy_id) = job.policy_id.as_deref() else {
            // No policy: one best-effort delivery on the preferred channel.
            let sent =
                deliver::deliver_preferred(db, self.chat(), self.sms(), &notification, &user)
                    .await?;
            if sent {
                notifications::set_status(
                    db,
                    &notification.id,
                    dutyline_core::NotificationStatus::Delivered,
                )
                .await?;
            }
            jobs::complete_job(db, &notification.id).await?;
            return Ok(());
        };

        let steps = policies::steps_for_policy(db, policy_id).await?;
        let index = usize::try_from(job.next_step).unwrap_or(usize::MAX);
        let Some(step) = steps.get(index) else {
            jobs::complete_job(db, &notification.id).await?;
            return Ok(());
        };

        let sent = deliver::deliver_via_channel(
            db,
            self.chat(),
            self.sms(),
            &notification,
            &user,
            step.channel,
        )
        .await?;
        debug!(
            notification = %notification.id,
            step = index,
            channel = %step.channel,
            sent,
            "escalation step executed"
        );

        // A no-op step (user lacks the channel) still counts as executed.
        notifications::advance_escalation_step(db, &notification.id, index as i64).await?;

        match steps.get(index + 1) {
            Some(next) => {
                jobs::reschedule_job(db, &notification.id, (index + 1) as i64, next.delay_seconds)
                    .await?;
            }
            None => {
                jobs::complete_job(db, &notification.id).await?;
            }
        }
        Ok(())
    }
}

/// Current UTC instant in the storage timestamp format, for lexicographic
/// comparison against stored timestamps.
fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
