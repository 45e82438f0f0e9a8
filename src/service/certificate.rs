use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use log::{info, warn};
use uuid::Uuid;

use crate::{
    config::Config,
    db,
    errors::MyError,
    models::{Certificate, CertificateDetail, ParticipantDetail, PaymentStatus},
    PGPool,
};

use super::{
    crypto, email_queue,
    pdf::{Font, PdfPage, A4_LANDSCAPE},
    templates::{self, fill_placeholders},
};

pub const DEFAULT_CERTIFICATE_TYPE: &str = "participation";

/// (text, font size, font, baseline) for every centred line of the certificate.
const LAYOUT: [(&str, f32, Font, f32); 8] = [
    ("CERTIFICATE OF {{type}}", 34.0, Font::Bold, 470.0),
    ("This is to certify that", 16.0, Font::Regular, 410.0),
    ("{{name}}", 28.0, Font::Bold, 360.0),
    ("has successfully participated in the training", 16.0, Font::Regular, 310.0),
    ("{{course}}", 24.0, Font::Bold, 265.0),
    ("held on {{date}} in {{location}}", 14.0, Font::Regular, 225.0),
    ("Issued on {{issued}}", 11.0, Font::Regular, 120.0),
    ("Certificate number {{number}}", 11.0, Font::Regular, 100.0),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateContent {
    pub certificate_type: String,
    pub name: String,
    pub course: String,
    pub date: String,
    pub location: String,
    pub issued: String,
    pub number: String,
}

impl CertificateContent {
    pub fn lines(&self) -> Vec<(String, f32, Font, f32)> {
        let kind = self.certificate_type.to_uppercase();
        let values = [
            ("type", kind.as_str()),
            ("name", self.name.as_str()),
            ("course", self.course.as_str()),
            ("date", self.date.as_str()),
            ("location", self.location.as_str()),
            ("issued", self.issued.as_str()),
            ("number", self.number.as_str()),
        ];
        LAYOUT
            .iter()
            .map(|(text, size, font, y)| (fill_placeholders(text, &values), *size, *font, *y))
            .collect()
    }

    pub fn render_pdf(&self) -> Vec<u8> {
        let mut page = PdfPage::new(A4_LANDSCAPE).with_border();
        for (text, size, font, y) in self.lines() {
            page.centered(y, size, font, &text);
        }
        page.render()
    }
}

#[derive(Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct GenerationReport {
    pub generated: usize,
    pub existing: usize,
    pub skipped_unpaid: usize,
}

pub fn certificate_number(issued: &DateTime<Utc>, id: &Uuid) -> String {
    let suffix: String = id.simple().to_string().chars().take(8).collect();
    format!("CERT-{}-{}", issued.year(), suffix.to_uppercase())
}

fn file_path(dir: &Path, number: &str) -> PathBuf {
    dir.join(format!("{number}.pdf"))
}

/// Certificates are only issued for paid enrollments; one issued before is reused,
/// `None` means a new one has to be rendered.
pub fn reuse_or_issue(
    payment_status: PaymentStatus,
    existing: Option<Certificate>,
) -> Result<Option<Certificate>, MyError> {
    if payment_status != PaymentStatus::Paid {
        return Err(MyError::bad_request("certificates are only issued for paid enrollments"));
    }
    Ok(existing)
}

/// Issues the certificate of the given type for a paid enrollment.
/// Returns the existing certificate unchanged when one was issued before.
pub async fn generate(
    participant_id: Uuid,
    certificate_type: &str,
    config: &Config,
    pool: &PGPool,
) -> Result<(Certificate, bool), MyError> {
    let participant = db::participant::get_detail(participant_id, pool).await?;
    let existing = db::certificate::find(pool, participant_id, certificate_type).await?;
    match reuse_or_issue(participant.payment_status, existing)? {
        Some(existing) => Ok((existing, false)),
        None => issue(&participant, certificate_type, config, pool).await,
    }
}

async fn issue(
    participant: &ParticipantDetail,
    certificate_type: &str,
    config: &Config,
    pool: &PGPool,
) -> Result<(Certificate, bool), MyError> {
    let id = Uuid::new_v4();
    let issued = Utc::now();
    let number = certificate_number(&issued, &id);
    let content = CertificateContent {
        certificate_type: certificate_type.to_string(),
        name: participant.name.clone(),
        course: participant.course_name.clone(),
        date: templates::format_day(&participant.course_date),
        location: participant.location.clone(),
        issued: templates::format_day(&issued),
        number: number.clone(),
    };
    let pdf = content.render_pdf();

    tokio::fs::create_dir_all(&config.certificate_dir).await?;
    let path = file_path(&config.certificate_dir, &number);
    tokio::fs::write(&path, &pdf).await?;

    let certificate = Certificate {
        id,
        participant_id: participant.id,
        certificate_type: certificate_type.to_string(),
        certificate_number: number,
        file_path: path.to_string_lossy().into_owned(),
        file_hash: crypto::hash_bytes(&pdf),
        download_count: 0,
        email_sent: false,
        generated_at: issued,
    };
    match db::certificate::create(pool, &certificate).await {
        Ok(created) => {
            info!(
                "certificate {} issued to {} for {}",
                created.certificate_number, participant.email, participant.course_name
            );
            Ok((created, true))
        }
        Err(err) => {
            if let Err(io_err) = tokio::fs::remove_file(&path).await {
                warn!("could not remove orphaned {}: {}", path.display(), io_err);
            }
            match MyError::from(err) {
                // issued concurrently by another request
                MyError::Conflict => {
                    let existing = db::certificate::find(pool, participant.id, certificate_type)
                        .await?
                        .ok_or(MyError::Conflict)?;
                    Ok((existing, false))
                }
                other => Err(other),
            }
        }
    }
}

pub async fn generate_for_course(
    course_id: Uuid,
    certificate_type: &str,
    config: &Config,
    pool: &PGPool,
) -> Result<GenerationReport, MyError> {
    db::course::get_by_id(course_id, pool).await?;
    let mut report = GenerationReport::default();
    for participant in db::participant::list_for_course(course_id, pool).await? {
        if participant.payment_status != PaymentStatus::Paid {
            report.skipped_unpaid += 1;
            continue;
        }
        match db::certificate::find(pool, participant.id, certificate_type).await? {
            Some(_) => report.existing += 1,
            None => {
                let (_, created) = issue(&participant, certificate_type, config, pool).await?;
                if created {
                    report.generated += 1;
                } else {
                    report.existing += 1;
                }
            }
        }
    }
    info!("certificates for course {}: {:?}", course_id, report);
    Ok(report)
}

pub fn download_link(config: &Config, certificate_id: Uuid, access_key: &str) -> String {
    format!(
        "{}/portal/certificates/{}/download?key={}",
        config.public_base_url, certificate_id, access_key
    )
}

/// Queues the certificate email with the portal download link and flags the certificate as sent.
pub async fn send(certificate_id: Uuid, config: &Config, pool: &PGPool) -> Result<(), MyError> {
    let detail = db::certificate::get_detail(certificate_id, pool).await?;
    let user = db::user::get_by_id(detail.user_id, pool).await?;
    let link = download_link(config, certificate_id, &user.access_key);

    let mut tx = pool.begin().await?;
    email_queue::enqueue(
        &mut *tx,
        &user.email,
        templates::certificate_available(&user.name, &detail.course_name, &link, &config.mail.from_name),
    )
    .await?;
    db::certificate::mark_email_sent(&mut *tx, certificate_id).await?;
    tx.commit().await?;
    info!("certificate {} queued for {}", detail.certificate.certificate_number, user.email);
    Ok(())
}

pub async fn list(course_id: Option<Uuid>, pool: &PGPool) -> Result<Vec<CertificateDetail>, MyError> {
    Ok(db::certificate::list(course_id, pool).await?)
}

pub struct Download {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// With `owner` set, certificates of other users are reported as missing.
pub fn check_owner(owner: Option<Uuid>, certificate_user: Uuid) -> Result<(), MyError> {
    match owner {
        Some(user_id) if user_id != certificate_user => Err(MyError::NotFound),
        _ => Ok(()),
    }
}

/// Reads a stored PDF and refuses it when it no longer matches the hash recorded at issue.
pub async fn read_verified(path: &str, file_hash: &str) -> Result<Vec<u8>, MyError> {
    let bytes = tokio::fs::read(path).await?;
    if !crypto::digest_eq(&crypto::hash_bytes(&bytes), file_hash) {
        warn!("certificate file {} does not match its hash", path);
        return Err(MyError::InternalError);
    }
    Ok(bytes)
}

/// Reads the stored PDF, checking it against the recorded hash, and counts the download.
pub async fn download(certificate_id: Uuid, owner: Option<Uuid>, pool: &PGPool) -> Result<Download, MyError> {
    let detail = db::certificate::get_detail(certificate_id, pool).await?;
    check_owner(owner, detail.user_id)?;
    let bytes = read_verified(&detail.certificate.file_path, &detail.certificate.file_hash).await?;
    db::certificate::increment_downloads(certificate_id, pool).await?;
    Ok(Download {
        file_name: format!("{}.pdf", detail.certificate.certificate_number),
        bytes,
    })
}
