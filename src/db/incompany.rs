use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{
    dto::IncompanyForm,
    models::{IncompanyRequest, RequestStatus},
    PGPool,
};

pub async fn create(executor: impl PgExecutor<'_>, form: &IncompanyForm) -> Result<IncompanyRequest, sqlx::Error> {
    sqlx::query_as::<_, IncompanyRequest>(
        "INSERT INTO incompany_requests
            (id, company, contact_name, email, phone, training_topic, participant_count, preferred_period, message, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&form.company)
    .bind(&form.contact_name)
    .bind(&form.email)
    .bind(&form.phone)
    .bind(&form.training_topic)
    .bind(form.participant_count)
    .bind(&form.preferred_period)
    .bind(&form.message)
    .bind(RequestStatus::New)
    .fetch_one(executor)
    .await
}

pub async fn get_all(status: Option<RequestStatus>, pool: &PGPool) -> Result<Vec<IncompanyRequest>, sqlx::Error> {
    match status {
        Some(status) => {
            sqlx::query_as::<_, IncompanyRequest>(
                "SELECT * FROM incompany_requests WHERE status = $1 ORDER BY created_at DESC",
            )
            .bind(status)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, IncompanyRequest>("SELECT * FROM incompany_requests ORDER BY created_at DESC")
                .fetch_all(pool)
                .await
        }
    }
}

pub async fn set_status(id: Uuid, status: RequestStatus, pool: &PGPool) -> Result<IncompanyRequest, sqlx::Error> {
    sqlx::query_as::<_, IncompanyRequest>(
        "UPDATE incompany_requests SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(status)
    .bind(id)
    .fetch_one(pool)
    .await
}
