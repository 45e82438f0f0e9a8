use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    errors::MyError,
    models::{EmailStatus, PaymentStatus, RequestStatus},
};

const MAX_TEXT: usize = 200;
const MAX_LONG_TEXT: usize = 4000;

/// Plain-text outcome tokens answered by the public intake forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormStatus {
    Ok,
    Enrolled,
    EnrolledPaymentRequired,
    AlreadyEnrolled,
    CourseFull,
    CourseUnavailable,
    InterestSuccess,
    IncompanySuccess,
    Error(String),
}

impl FormStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, FormStatus::Error(_))
    }
}

impl fmt::Display for FormStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormStatus::Ok => f.write_str("ok"),
            FormStatus::Enrolled => f.write_str("enrolled"),
            FormStatus::EnrolledPaymentRequired => f.write_str("enrolled_payment_required"),
            FormStatus::AlreadyEnrolled => f.write_str("already_enrolled"),
            FormStatus::CourseFull => f.write_str("course_full"),
            FormStatus::CourseUnavailable => f.write_str("course_unavailable"),
            FormStatus::InterestSuccess => f.write_str("interest_success"),
            FormStatus::IncompanySuccess => f.write_str("incompany_success"),
            FormStatus::Error(message) => write!(f, "error: {message}"),
        }
    }
}

impl From<MyError> for FormStatus {
    fn from(err: MyError) -> Self {
        match err {
            MyError::BadClientData { message } => FormStatus::Error(message),
            MyError::CourseFull => FormStatus::CourseFull,
            MyError::NotFound => FormStatus::CourseUnavailable,
            MyError::Conflict => FormStatus::AlreadyEnrolled,
            _ => FormStatus::Error("internal error".to_string()),
        }
    }
}

/// JSON envelope shared by every admin endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl ApiResponse<()> {
    pub fn ok(message: impl Into<String>) -> Self {
        ApiResponse { status: "success", message: message.into(), data: None }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        ApiResponse { status: "success", message: "ok".to_string(), data: Some(data) }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        ApiResponse { status: "success", message: message.into(), data: Some(data) }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains("..")
        }
        None => false,
    }
}

fn required(field: &str, value: String, max: usize) -> Result<String, MyError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(MyError::bad_request(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(MyError::bad_request(format!("{field} is too long")));
    }
    Ok(value)
}

fn optional(field: &str, value: Option<String>, max: usize) -> Result<Option<String>, MyError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if v.is_empty() => Ok(None),
        Some(v) if v.chars().count() > max => {
            Err(MyError::bad_request(format!("{field} is too long")))
        }
        other => Ok(other),
    }
}

fn email(value: String) -> Result<String, MyError> {
    let value = value.trim().to_lowercase();
    if is_valid_email(&value) {
        Ok(value)
    } else {
        Err(MyError::bad_request("invalid email"))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnrollForm {
    pub course_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
}

impl EnrollForm {
    /// Trims every field, lowercases the email and rejects incomplete submissions.
    pub fn validate(self) -> Result<Self, MyError> {
        Ok(EnrollForm {
            course_id: self.course_id,
            name: required("name", self.name, MAX_TEXT)?,
            email: email(self.email)?,
            phone: optional("phone", self.phone, 40)?,
            company: optional("company", self.company, MAX_TEXT)?,
            notes: optional("notes", self.notes, MAX_LONG_TEXT)?,
        })
    }

    pub fn contact(&self) -> ContactDetails {
        ContactDetails {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            company: self.company.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct InterestForm {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub training_name: String,
    pub periods: Option<String>,
    pub comments: Option<String>,
}

impl InterestForm {
    pub fn validate(self) -> Result<Self, MyError> {
        Ok(InterestForm {
            name: required("name", self.name, MAX_TEXT)?,
            email: email(self.email)?,
            phone: optional("phone", self.phone, 40)?,
            company: optional("company", self.company, MAX_TEXT)?,
            training_name: required("training_name", self.training_name, MAX_TEXT)?,
            periods: optional("periods", self.periods, MAX_TEXT)?,
            comments: optional("comments", self.comments, MAX_LONG_TEXT)?,
        })
    }

    pub fn contact(&self) -> ContactDetails {
        ContactDetails {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            company: self.company.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IncompanyForm {
    pub company: String,
    pub contact_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub training_topic: String,
    pub participant_count: Option<i32>,
    pub preferred_period: Option<String>,
    pub message: Option<String>,
}

impl IncompanyForm {
    pub fn validate(self) -> Result<Self, MyError> {
        if let Some(count) = self.participant_count {
            if count < 1 {
                return Err(MyError::bad_request("participant_count must be positive"));
            }
        }
        Ok(IncompanyForm {
            company: required("company", self.company, MAX_TEXT)?,
            contact_name: required("contact_name", self.contact_name, MAX_TEXT)?,
            email: email(self.email)?,
            phone: optional("phone", self.phone, 40)?,
            training_topic: required("training_topic", self.training_topic, MAX_TEXT)?,
            participant_count: self.participant_count,
            preferred_period: optional("preferred_period", self.preferred_period, MAX_TEXT)?,
            message: optional("message", self.message, MAX_LONG_TEXT)?,
        })
    }

    pub fn contact(&self) -> ContactDetails {
        ContactDetails {
            name: self.contact_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            company: Some(self.company.clone()),
        }
    }
}

/// The user columns every form submission upserts.
#[derive(Debug, Clone)]
pub struct ContactDetails {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

impl Claims {
    pub fn new(username: &str, exp: usize) -> Self {
        Self {
            sub: username.to_string(),
            exp,
        }
    }
}

/// Column value for partial updates built by `get_values`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    OptionalText(Option<String>),
    BigInt(i64),
    Int(i32),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

#[derive(Debug, Deserialize, Clone)]
pub struct NewCourseDto {
    pub name: String,
    pub description: Option<String>,
    pub course_date: DateTime<Utc>,
    pub location: String,
    pub price_cents: i64,
    pub max_participants: i32,
    pub active: Option<bool>,
}

impl NewCourseDto {
    pub fn validate(self) -> Result<Self, MyError> {
        if self.price_cents < 0 {
            return Err(MyError::bad_request("price_cents must not be negative"));
        }
        if self.max_participants < 1 {
            return Err(MyError::bad_request("max_participants must be at least 1"));
        }
        Ok(NewCourseDto {
            name: required("name", self.name, MAX_TEXT)?,
            description: optional("description", self.description, MAX_LONG_TEXT)?,
            location: required("location", self.location, MAX_TEXT)?,
            ..self
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct UpdateCourseDto {
    pub name: Option<String>,
    pub description: Option<String>,
    pub course_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub price_cents: Option<i64>,
    pub max_participants: Option<i32>,
    pub active: Option<bool>,
}

impl UpdateCourseDto {
    pub fn validate(&self) -> Result<(), MyError> {
        if matches!(self.price_cents, Some(p) if p < 0) {
            return Err(MyError::bad_request("price_cents must not be negative"));
        }
        if matches!(self.max_participants, Some(m) if m < 1) {
            return Err(MyError::bad_request("max_participants must be at least 1"));
        }
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            return Err(MyError::bad_request("name is required"));
        }
        Ok(())
    }

    pub fn get_values(&self) -> Option<Vec<(&'static str, FieldValue)>> {
        let mut fields: Vec<(&'static str, FieldValue)> = Vec::new();
        if let Some(v) = &self.name {
            fields.push(("name", FieldValue::Text(v.trim().to_string())));
        }
        if let Some(v) = &self.description {
            let v = v.trim();
            fields.push(("description", FieldValue::OptionalText((!v.is_empty()).then(|| v.to_string()))));
        }
        if let Some(v) = self.course_date {
            fields.push(("course_date", FieldValue::Timestamp(v)));
        }
        if let Some(v) = &self.location {
            fields.push(("location", FieldValue::Text(v.trim().to_string())));
        }
        if let Some(v) = self.price_cents {
            fields.push(("price_cents", FieldValue::BigInt(v)));
        }
        if let Some(v) = self.max_participants {
            fields.push(("max_participants", FieldValue::Int(v)));
        }
        if let Some(v) = self.active {
            fields.push(("active", FieldValue::Bool(v)));
        }

        if fields.is_empty() {
            None
        } else {
            Some(fields)
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct UpdateUserDto {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub active: Option<bool>,
}

impl UpdateUserDto {
    pub fn validate(&self) -> Result<(), MyError> {
        if let Some(e) = &self.email {
            if !is_valid_email(&e.trim().to_lowercase()) {
                return Err(MyError::bad_request("invalid email"));
            }
        }
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            return Err(MyError::bad_request("name is required"));
        }
        Ok(())
    }

    pub fn get_values(&self) -> Option<Vec<(&'static str, FieldValue)>> {
        let mut fields: Vec<(&'static str, FieldValue)> = Vec::new();
        if let Some(v) = &self.name {
            fields.push(("name", FieldValue::Text(v.trim().to_string())));
        }
        if let Some(v) = &self.email {
            fields.push(("email", FieldValue::Text(v.trim().to_lowercase())));
        }
        if let Some(v) = &self.phone {
            let v = v.trim();
            fields.push(("phone", FieldValue::OptionalText((!v.is_empty()).then(|| v.to_string()))));
        }
        if let Some(v) = &self.company {
            let v = v.trim();
            fields.push(("company", FieldValue::OptionalText((!v.is_empty()).then(|| v.to_string()))));
        }
        if let Some(v) = self.active {
            fields.push(("active", FieldValue::Bool(v)));
        }

        if fields.is_empty() {
            None
        } else {
            Some(fields)
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CourseFilter {
    pub active: Option<bool>,
    pub location: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct UserFilter {
    pub q: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentStatusDto {
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RequestStatusDto {
    pub status: RequestStatus,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RequestStatusFilter {
    pub status: Option<RequestStatus>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EmailStatusFilter {
    pub status: Option<EmailStatus>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CertificateFilter {
    pub course_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GenerateCertificateDto {
    pub certificate_type: Option<String>,
}

impl GenerateCertificateDto {
    pub fn certificate_type(&self) -> String {
        match self.certificate_type.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_lowercase(),
            _ => crate::service::certificate::DEFAULT_CERTIFICATE_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlanningQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AccessKeyQuery {
    pub key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enroll_form() -> EnrollForm {
        EnrollForm {
            course_id: Uuid::new_v4(),
            name: "  Anna de Vries ".to_string(),
            email: " Anna@Example.COM ".to_string(),
            phone: Some("".to_string()),
            company: Some(" Acme ".to_string()),
            notes: None,
        }
    }

    #[test]
    fn status_tokens_render_as_plain_text() {
        assert_eq!(FormStatus::EnrolledPaymentRequired.to_string(), "enrolled_payment_required");
        assert_eq!(FormStatus::CourseFull.to_string(), "course_full");
        assert_eq!(FormStatus::InterestSuccess.to_string(), "interest_success");
        assert_eq!(FormStatus::Error("invalid email".into()).to_string(), "error: invalid email");
    }

    #[test]
    fn internal_errors_do_not_leak_into_tokens() {
        let status: FormStatus = MyError::InternalError.into();
        assert_eq!(status.to_string(), "error: internal error");
        let status: FormStatus = MyError::Conflict.into();
        assert_eq!(status, FormStatus::AlreadyEnrolled);
    }

    #[test]
    fn enroll_form_is_normalized() {
        let form = enroll_form().validate().unwrap();
        assert_eq!(form.name, "Anna de Vries");
        assert_eq!(form.email, "anna@example.com");
        assert_eq!(form.phone, None);
        assert_eq!(form.company.as_deref(), Some("Acme"));
    }

    #[test]
    fn enroll_form_requires_name_and_valid_email() {
        let mut form = enroll_form();
        form.name = "   ".to_string();
        assert!(matches!(form.validate(), Err(MyError::BadClientData { .. })));

        let mut form = enroll_form();
        form.email = "not-an-email".to_string();
        let err = form.validate().unwrap_err();
        assert_eq!(err.to_string(), "bad request: invalid email");
    }

    #[test]
    fn email_syntax() {
        assert!(is_valid_email("a@b.nl"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.nl"));
        assert!(!is_valid_email("a@@b.nl"));
        assert!(!is_valid_email("a b@c.nl"));
        assert!(!is_valid_email("a@b..nl"));
    }

    #[test]
    fn incompany_rejects_non_positive_headcount() {
        let form = IncompanyForm {
            company: "Acme".into(),
            contact_name: "Bob".into(),
            email: "bob@acme.com".into(),
            phone: None,
            training_topic: "Fire safety".into(),
            participant_count: Some(0),
            preferred_period: None,
            message: None,
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn empty_course_update_has_no_values() {
        assert!(UpdateCourseDto::default().get_values().is_none());
    }

    #[test]
    fn course_update_lists_only_set_fields() {
        let dto = UpdateCourseDto {
            name: Some(" BHV ".into()),
            description: Some("".into()),
            max_participants: Some(12),
            ..Default::default()
        };
        let values = dto.get_values().unwrap();
        assert_eq!(
            values,
            vec![
                ("name", FieldValue::Text("BHV".into())),
                ("description", FieldValue::OptionalText(None)),
                ("max_participants", FieldValue::Int(12)),
            ]
        );
    }

    #[test]
    fn course_update_rejects_zero_capacity() {
        let dto = UpdateCourseDto { max_participants: Some(0), ..Default::default() };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn user_update_lowercases_email() {
        let dto = UpdateUserDto { email: Some("X@Y.COM".into()), ..Default::default() };
        assert!(dto.validate().is_ok());
        assert_eq!(dto.get_values().unwrap(), vec![("email", FieldValue::Text("x@y.com".into()))]);
    }

    #[test]
    fn certificate_type_defaults() {
        assert_eq!(GenerateCertificateDto::default().certificate_type(), "participation");
        let dto = GenerateCertificateDto { certificate_type: Some(" Completion ".into()) };
        assert_eq!(dto.certificate_type(), "completion");
    }

    #[test]
    fn api_response_skips_missing_data() {
        let json = serde_json::to_value(ApiResponse::ok("deleted")).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "success", "message": "deleted" }));
    }
}
