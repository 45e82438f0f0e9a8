use chrono::{DateTime, Duration, Utc};
use log::info;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    config::Config,
    db,
    dto::{FormStatus, InterestForm},
    errors::MyError,
    models::Interest,
    PGPool,
};

use super::{crypto, email_queue, templates};

/// A repeated interest for the same training within this window is not stored again.
pub const DUPLICATE_WINDOW_HOURS: i64 = 24;

pub fn duplicate_key(email: &str, training_name: &str) -> String {
    format!("interest:{}:{}", email.to_lowercase(), training_name.trim().to_lowercase())
}

/// Interests recorded after this instant suppress a repeat at `now`.
pub fn suppression_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(DUPLICATE_WINDOW_HOURS)
}

/// Stores the interest unless an equal one was recorded inside the duplicate window.
/// Concurrent submissions of the same pair are serialised by a transaction-scoped advisory lock.
pub async fn record(tx: &mut Transaction<'_, Postgres>, form: &InterestForm) -> Result<Option<Interest>, MyError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(duplicate_key(&form.email, &form.training_name))
        .execute(&mut **tx)
        .await?;

    let since = suppression_cutoff(Utc::now());
    if db::interest::exists_since(&mut **tx, &form.email, &form.training_name, since).await? {
        info!("duplicate interest of {} in '{}' suppressed", form.email, form.training_name);
        return Ok(None);
    }
    Ok(Some(db::interest::create(&mut **tx, form).await?))
}

pub async fn create(form: InterestForm, config: &Config, pool: &PGPool) -> Result<FormStatus, MyError> {
    let form = form.validate()?;
    let mut tx = pool.begin().await?;

    db::user::upsert_by_email(&mut *tx, &form.contact(), &crypto::new_access_key()).await?;

    if let Some(interest) = record(&mut tx, &form).await? {
        email_queue::enqueue(
            &mut *tx,
            &form.email,
            templates::interest_confirmation(&form, &config.mail.from_name),
        )
        .await?;
        email_queue::enqueue(&mut *tx, &config.mail.admin_notify, templates::interest_admin_notice(&form)).await?;
        info!("interest {} of {} in '{}' recorded", interest.id, form.email, form.training_name);
    }

    tx.commit().await?;
    Ok(FormStatus::InterestSuccess)
}

pub async fn get_all(pool: &PGPool) -> Result<Vec<Interest>, MyError> {
    Ok(db::interest::get_all(pool).await?)
}

pub async fn delete(id: Uuid, pool: &PGPool) -> Result<(), MyError> {
    match db::interest::delete(id, pool).await? {
        0 => Err(MyError::NotFound),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_ignores_case_and_padding() {
        assert_eq!(
            duplicate_key("Anna@Example.com", " BHV Basic "),
            duplicate_key("anna@example.com", "bhv basic")
        );
        assert_ne!(
            duplicate_key("anna@example.com", "BHV Basic"),
            duplicate_key("anna@example.com", "BHV Refresher")
        );
    }

    #[test]
    fn repeats_are_suppressed_for_a_day() {
        let now = Utc::now();
        let cutoff = suppression_cutoff(now);
        assert_eq!(cutoff, now - Duration::hours(24));
        assert!(now - Duration::hours(23) > cutoff);
        assert!(now - Duration::hours(25) < cutoff);
    }
}
