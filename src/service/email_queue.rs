use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::BoxFuture;
use log::{error, info, warn};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{
    config::QueueConfig,
    db::{self, email_queue::NewEmail},
    errors::MyError,
    models::{EmailQueueItem, EmailStatus},
    PGPool,
};

use super::{
    mail::{sanitize_spam_triggers, Mailer, OutgoingMail},
    templates::RenderedEmail,
};

/// Items still `sending` after this long belong to a run that died.
const STALE_AFTER_MINUTES: i64 = 30;
const RETRY_STEP_MINUTES: i64 = 5;

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BatchReport {
    pub reset: u64,
    pub claimed: usize,
    pub sent: usize,
    pub retried: usize,
    pub failed: usize,
    /// Items whose outcome could not be stored; they stay `sending` until reset as stale.
    pub errors: usize,
}

/// Where a claimed item goes after one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Retry { at: DateTime<Utc>, error: String },
    Failed { error: String },
}

pub async fn enqueue(
    executor: impl PgExecutor<'_>,
    recipient: &str,
    email: RenderedEmail,
) -> Result<Uuid, MyError> {
    let new_email = NewEmail {
        recipient: recipient.to_string(),
        subject: email.subject,
        template: email.template,
        body: email.body,
        send_after: Utc::now(),
    };
    Ok(db::email_queue::enqueue(executor, &new_email).await?)
}

/// When a failed item should be tried again, or `None` once it has used all attempts.
pub fn next_attempt(attempts: i32, max_attempts: i32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if attempts >= max_attempts {
        None
    } else {
        Some(now + Duration::minutes(RETRY_STEP_MINUTES * i64::from(attempts.max(1))))
    }
}

pub fn delivery_outcome(result: Result<(), MyError>, attempts: i32, max_attempts: i32, now: DateTime<Utc>) -> Delivery {
    match result {
        Ok(()) => Delivery::Sent,
        Err(err) => match next_attempt(attempts, max_attempts, now) {
            Some(at) => Delivery::Retry { at, error: err.to_string() },
            None => Delivery::Failed { error: err.to_string() },
        },
    }
}

/// Stores the outcome of a delivery attempt.
pub trait DeliveryLog: Send + Sync {
    fn record<'a>(&'a self, item: &'a EmailQueueItem, delivery: &'a Delivery) -> BoxFuture<'a, Result<(), MyError>>;
}

impl DeliveryLog for PGPool {
    fn record<'a>(&'a self, item: &'a EmailQueueItem, delivery: &'a Delivery) -> BoxFuture<'a, Result<(), MyError>> {
        Box::pin(async move {
            match delivery {
                Delivery::Sent => db::email_queue::mark_sent(item.id, self).await?,
                Delivery::Retry { at, error } => {
                    db::email_queue::mark_failed_attempt(item.id, error, Some(*at), self).await?
                }
                Delivery::Failed { error } => db::email_queue::mark_failed_attempt(item.id, error, None, self).await?,
            };
            Ok(())
        })
    }
}

fn outgoing(item: &EmailQueueItem) -> OutgoingMail {
    OutgoingMail {
        to: item.recipient.clone(),
        subject: sanitize_spam_triggers(&item.subject),
        body: sanitize_spam_triggers(&item.body),
    }
}

/// Sends claimed items sequentially, pausing `config.delay` between messages.
/// An outcome that cannot be stored is logged and counted; the rest of the batch still goes out.
pub async fn deliver(
    batch: &[EmailQueueItem],
    mailer: &dyn Mailer,
    store: &dyn DeliveryLog,
    config: &QueueConfig,
) -> BatchReport {
    let mut report = BatchReport {
        claimed: batch.len(),
        ..Default::default()
    };
    for (index, item) in batch.iter().enumerate() {
        if index > 0 && !config.delay.is_zero() {
            tokio::time::sleep(config.delay).await;
        }
        let result = mailer.send(&outgoing(item)).await;
        if let Err(err) = &result {
            warn!(
                "sending {} ({}) to {} failed on attempt {}: {}",
                item.id, item.template, item.recipient, item.attempts, err
            );
        }
        let delivery = delivery_outcome(result, item.attempts, config.max_attempts, Utc::now());
        if let Err(err) = store.record(item, &delivery).await {
            error!("could not store outcome {:?} of {}: {}", delivery, item.id, err);
            report.errors += 1;
            continue;
        }
        match delivery {
            Delivery::Sent => report.sent += 1,
            Delivery::Retry { .. } => report.retried += 1,
            Delivery::Failed { .. } => report.failed += 1,
        }
    }
    report
}

/// Resets stale items, claims one batch of due messages and delivers it.
pub async fn process_batch(pool: &PGPool, mailer: &dyn Mailer, config: &QueueConfig) -> Result<BatchReport, MyError> {
    let reset = db::email_queue::reset_stale(Utc::now() - Duration::minutes(STALE_AFTER_MINUTES), pool).await?;
    if reset > 0 {
        warn!("reset {} stale email queue items", reset);
    }

    let batch = db::email_queue::claim_batch(config.batch_size, pool).await?;
    let mut report = deliver(&batch, mailer, pool, config).await;
    report.reset = reset;

    if report.claimed > 0 {
        info!(
            "email queue batch: {} claimed, {} sent, {} retried, {} failed, {} unrecorded",
            report.claimed, report.sent, report.retried, report.failed, report.errors
        );
    }
    Ok(report)
}

/// Runs `process_batch` every `poll_interval` on the current actix runtime.
pub fn spawn_worker(pool: PGPool, mailer: Arc<dyn Mailer>, config: QueueConfig) {
    let Some(poll_interval) = config.poll_interval else {
        info!("in-process email queue worker disabled");
        return;
    };
    actix_rt::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(err) = process_batch(&pool, mailer.as_ref(), &config).await {
                error!("email queue run failed: {:?}", err);
            }
        }
    });
    info!("email queue worker polling every {:?}", poll_interval);
}

pub async fn get_all(status: Option<EmailStatus>, pool: &PGPool) -> Result<Vec<EmailQueueItem>, MyError> {
    Ok(db::email_queue::get_all(status, pool).await?)
}

pub async fn cancel(id: Uuid, pool: &PGPool) -> Result<(), MyError> {
    match db::email_queue::cancel(id, pool).await? {
        0 => Err(MyError::bad_request("only pending messages can be cancelled")),
        _ => Ok(()),
    }
}

pub async fn retry(id: Uuid, pool: &PGPool) -> Result<(), MyError> {
    match db::email_queue::retry(id, pool).await? {
        0 => Err(MyError::bad_request("only failed messages can be retried")),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::service::mail::testing::MemoryMailer;

    #[test]
    fn retries_back_off_linearly() {
        let now = Utc::now();
        assert_eq!(next_attempt(1, 3, now), Some(now + Duration::minutes(5)));
        assert_eq!(next_attempt(2, 3, now), Some(now + Duration::minutes(10)));
    }

    #[test]
    fn exhausted_items_are_not_rescheduled() {
        let now = Utc::now();
        assert_eq!(next_attempt(3, 3, now), None);
        assert_eq!(next_attempt(4, 3, now), None);
    }

    fn item(recipient: &str, attempts: i32) -> EmailQueueItem {
        let now = Utc::now();
        EmailQueueItem {
            id: Uuid::new_v4(),
            recipient: recipient.into(),
            subject: "Act now!!".into(),
            template: "interest_confirmation".into(),
            body: "Lunch is free.".into(),
            status: EmailStatus::Sending,
            attempts,
            last_error: None,
            send_after: now,
            created_at: now,
            updated_at: now,
            sent_at: None,
        }
    }

    fn queue_config() -> QueueConfig {
        QueueConfig {
            batch_size: 10,
            delay: std::time::Duration::ZERO,
            max_attempts: 3,
            poll_interval: None,
        }
    }

    /// Keeps outcomes in memory; fails to store the outcome for `broken`.
    #[derive(Default)]
    struct MemoryLog {
        recorded: Mutex<Vec<(String, Delivery)>>,
        broken: Option<Uuid>,
    }

    impl DeliveryLog for MemoryLog {
        fn record<'a>(&'a self, item: &'a EmailQueueItem, delivery: &'a Delivery) -> BoxFuture<'a, Result<(), MyError>> {
            Box::pin(async move {
                if self.broken == Some(item.id) {
                    return Err(MyError::InternalError);
                }
                self.recorded.lock().unwrap().push((item.recipient.clone(), delivery.clone()));
                Ok(())
            })
        }
    }

    #[test]
    fn failures_retry_until_attempts_run_out() {
        let now = Utc::now();
        let err = || Err(MyError::mail("rejected"));
        assert_eq!(delivery_outcome(Ok(()), 3, 3, now), Delivery::Sent);
        assert_eq!(
            delivery_outcome(err(), 1, 3, now),
            Delivery::Retry {
                at: now + Duration::minutes(5),
                error: "mail delivery failed: rejected".into()
            }
        );
        assert_eq!(
            delivery_outcome(err(), 3, 3, now),
            Delivery::Failed { error: "mail delivery failed: rejected".into() }
        );
    }

    #[actix_web::test]
    async fn batch_is_sent_retried_and_failed() {
        let mailer = MemoryMailer {
            reject: vec!["bounce@example.com".into(), "gone@example.com".into()],
            ..Default::default()
        };
        let log = MemoryLog::default();
        let batch = [
            item("anna@example.com", 1),
            item("bounce@example.com", 1),
            item("gone@example.com", 3),
        ];
        let report = deliver(&batch, &mailer, &log, &queue_config()).await;
        assert_eq!(
            report,
            BatchReport { reset: 0, claimed: 3, sent: 1, retried: 1, failed: 1, errors: 0 }
        );

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Respond soon!");
        assert_eq!(sent[0].body, "Lunch is at no cost.");

        let recorded = log.recorded.lock().unwrap();
        assert_eq!(recorded[0], ("anna@example.com".to_string(), Delivery::Sent));
        assert!(matches!(recorded[1].1, Delivery::Retry { .. }));
        assert!(matches!(recorded[2].1, Delivery::Failed { .. }));
    }

    #[actix_web::test]
    async fn storage_error_does_not_stop_the_batch() {
        let mailer = MemoryMailer::default();
        let batch = [
            item("anna@example.com", 1),
            item("bert@example.com", 1),
            item("carla@example.com", 1),
        ];
        let log = MemoryLog {
            broken: Some(batch[1].id),
            ..Default::default()
        };
        let report = deliver(&batch, &mailer, &log, &queue_config()).await;
        assert_eq!(report.sent, 2);
        assert_eq!(report.errors, 1);
        assert_eq!(mailer.sent.lock().unwrap().len(), 3);
        let recorded: Vec<String> = log.recorded.lock().unwrap().iter().map(|(to, _)| to.clone()).collect();
        assert_eq!(recorded, ["anna@example.com", "carla@example.com"]);
    }
}
