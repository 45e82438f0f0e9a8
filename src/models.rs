use chrono::{DateTime, Utc};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    /// Cancelled enrollments no longer hold a seat.
    pub fn holds_seat(&self) -> bool {
        !matches!(self, PaymentStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    New,
    Contacted,
    Quoted,
    Won,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "email_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    Pending,
    Sending,
    Sent,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, FromRow, serde::Serialize, serde::Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    #[serde(skip_serializing)]
    pub access_key: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, serde::Serialize, serde::Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub course_date: DateTime<Utc>,
    pub location: String,
    pub price_cents: i64,
    pub max_participants: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn requires_payment(&self) -> bool {
        self.price_cents > 0
    }

    pub fn is_full(&self, enrolled: i64) -> bool {
        enrolled >= i64::from(self.max_participants)
    }
}

/// A course together with the number of seats currently taken.
#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct CourseWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub course: Course,
    pub enrolled: i64,
}

impl CourseWithCount {
    pub fn seats_left(&self) -> i64 {
        (i64::from(self.course.max_participants) - self.enrolled).max(0)
    }
}

#[derive(Debug, Clone, FromRow, serde::Serialize, serde::Deserialize)]
pub struct CourseParticipant {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub payment_status: PaymentStatus,
    pub enrollment_date: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Enrollment joined with the participant and course it links.
#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct ParticipantDetail {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub payment_status: PaymentStatus,
    pub enrollment_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub course_name: String,
    pub course_date: DateTime<Utc>,
    pub location: String,
}

#[derive(Debug, Clone, FromRow, serde::Serialize, serde::Deserialize)]
pub struct Interest {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub training_name: String,
    pub periods: Option<String>,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, serde::Serialize, serde::Deserialize)]
pub struct IncompanyRequest {
    pub id: Uuid,
    pub company: String,
    pub contact_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub training_topic: String,
    pub participant_count: Option<i32>,
    pub preferred_period: Option<String>,
    pub message: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, serde::Serialize, serde::Deserialize)]
pub struct Certificate {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub certificate_type: String,
    pub certificate_number: String,
    #[serde(skip_serializing)]
    pub file_path: String,
    pub file_hash: String,
    pub download_count: i32,
    pub email_sent: bool,
    pub generated_at: DateTime<Utc>,
}

/// Certificate with the participant and course it was issued for.
#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct CertificateDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub certificate: Certificate,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub course_id: Uuid,
    pub course_name: String,
    pub course_date: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, serde::Serialize, serde::Deserialize)]
pub struct EmailQueueItem {
    pub id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub template: String,
    pub body: String,
    pub status: EmailStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub send_after: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn course(max_participants: i32, price_cents: i64) -> Course {
        Course {
            id: Uuid::new_v4(),
            name: "First aid".to_string(),
            description: None,
            course_date: Utc::now() + Duration::days(10),
            location: "Utrecht".to_string(),
            price_cents,
            max_participants,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn course_is_full_at_capacity() {
        let c = course(2, 0);
        assert!(!c.is_full(1));
        assert!(c.is_full(2));
        assert!(c.is_full(3));
    }

    #[test]
    fn free_courses_need_no_payment() {
        assert!(!course(5, 0).requires_payment());
        assert!(course(5, 19900).requires_payment());
    }

    #[test]
    fn seats_left_never_negative() {
        let overbooked = CourseWithCount { course: course(2, 0), enrolled: 3 };
        assert_eq!(overbooked.seats_left(), 0);
        let open = CourseWithCount { course: course(10, 0), enrolled: 4 };
        assert_eq!(open.seats_left(), 6);
    }

    #[test]
    fn payment_status_serializes_lowercase() {
        let json = serde_json::to_string(&PaymentStatus::Refunded).unwrap();
        assert_eq!(json, "\"refunded\"");
        assert!(!PaymentStatus::Cancelled.holds_seat());
        assert!(PaymentStatus::Pending.holds_seat());
    }
}
