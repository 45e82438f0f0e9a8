use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{
    models::{Certificate, CertificateDetail},
    PGPool,
};

const DETAIL: &str = "SELECT cert.*, cp.user_id, u.name, u.email, cp.course_id,
    c.name AS course_name, c.course_date
    FROM certificates cert
    JOIN course_participants cp ON cp.id = cert.participant_id
    JOIN users u ON u.id = cp.user_id
    JOIN courses c ON c.id = cp.course_id";

pub async fn create(executor: impl PgExecutor<'_>, certificate: &Certificate) -> Result<Certificate, sqlx::Error> {
    sqlx::query_as::<_, Certificate>(
        "INSERT INTO certificates
            (id, participant_id, certificate_type, certificate_number, file_path, file_hash, generated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *",
    )
    .bind(certificate.id)
    .bind(certificate.participant_id)
    .bind(&certificate.certificate_type)
    .bind(&certificate.certificate_number)
    .bind(&certificate.file_path)
    .bind(&certificate.file_hash)
    .bind(certificate.generated_at)
    .fetch_one(executor)
    .await
}

pub async fn find(
    executor: impl PgExecutor<'_>,
    participant_id: Uuid,
    certificate_type: &str,
) -> Result<Option<Certificate>, sqlx::Error> {
    sqlx::query_as::<_, Certificate>(
        "SELECT * FROM certificates WHERE participant_id = $1 AND certificate_type = $2",
    )
    .bind(participant_id)
    .bind(certificate_type)
    .fetch_optional(executor)
    .await
}

pub async fn get_detail(id: Uuid, pool: &PGPool) -> Result<CertificateDetail, sqlx::Error> {
    sqlx::query_as::<_, CertificateDetail>(&format!("{DETAIL} WHERE cert.id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn list(course_id: Option<Uuid>, pool: &PGPool) -> Result<Vec<CertificateDetail>, sqlx::Error> {
    match course_id {
        Some(course_id) => {
            sqlx::query_as::<_, CertificateDetail>(&format!(
                "{DETAIL} WHERE cp.course_id = $1 ORDER BY cert.generated_at DESC"
            ))
            .bind(course_id)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, CertificateDetail>(&format!("{DETAIL} ORDER BY cert.generated_at DESC"))
                .fetch_all(pool)
                .await
        }
    }
}

pub async fn list_for_user(user_id: Uuid, pool: &PGPool) -> Result<Vec<CertificateDetail>, sqlx::Error> {
    sqlx::query_as::<_, CertificateDetail>(&format!(
        "{DETAIL} WHERE cp.user_id = $1 ORDER BY c.course_date DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn increment_downloads(id: Uuid, pool: &PGPool) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("UPDATE certificates SET download_count = download_count + 1 WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

pub async fn mark_email_sent(executor: impl PgExecutor<'_>, id: Uuid) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("UPDATE certificates SET email_sent = TRUE WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(res.rows_affected())
}
