use actix_web::{
    error,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use derive_more::{Display, Error};
use log::error;

#[derive(Debug, Display, Error, serde::Deserialize, serde::Serialize)]
pub enum MyError {
    #[display(fmt = "internal error")]
    InternalError,

    #[display(fmt = "bad request: {}", message)]
    BadClientData { message: String },

    #[display(fmt = "not found")]
    NotFound,

    #[display(fmt = "conflict with existing data")]
    Conflict,

    #[display(fmt = "course is full")]
    CourseFull,

    #[display(fmt = "timeout")]
    Timeout,

    #[display(fmt = "authentication error")]
    AuthError,

    #[display(fmt = "token decoding error")]
    DecodeError,

    #[display(fmt = "token expired")]
    TokenExpirationError,

    #[display(fmt = "unauthorized")]
    Unauthorized,

    #[display(fmt = "mail delivery failed: {}", message)]
    MailError { message: String },
}

impl MyError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        MyError::BadClientData { message: message.into() }
    }

    pub fn mail(message: impl Into<String>) -> Self {
        MyError::MailError { message: message.into() }
    }
}

impl error::ResponseError for MyError {
    fn error_response(&self) -> HttpResponse {
        let message = match self {
            // detail is only ever logged
            MyError::MailError { .. } => "mail delivery failed".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(serde_json::json!({ "status": "error", "message": message }))
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            MyError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            MyError::BadClientData { .. } => StatusCode::BAD_REQUEST,
            MyError::NotFound => StatusCode::NOT_FOUND,
            MyError::Conflict => StatusCode::CONFLICT,
            MyError::CourseFull => StatusCode::CONFLICT,
            MyError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            MyError::AuthError => StatusCode::UNAUTHORIZED,
            MyError::DecodeError => StatusCode::UNAUTHORIZED,
            MyError::TokenExpirationError => StatusCode::UNAUTHORIZED,
            MyError::Unauthorized => StatusCode::UNAUTHORIZED,
            MyError::MailError { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<sqlx::Error> for MyError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => MyError::NotFound,
            sqlx::Error::Database(db_err)
                if db_err.is_unique_violation() || db_err.is_foreign_key_violation() =>
            {
                MyError::Conflict
            }
            sqlx::Error::PoolTimedOut => {
                error!("database pool timed out");
                MyError::Timeout
            }
            _ => {
                error!("database error: {:?}", err);
                MyError::InternalError
            }
        }
    }
}

impl From<std::io::Error> for MyError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            return MyError::NotFound;
        }
        error!("io error: {:?}", err);
        MyError::InternalError
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{body::to_bytes, ResponseError};

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: MyError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, MyError::NotFound));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unexpected_database_errors_are_internal() {
        let err: MyError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, MyError::InternalError));
    }

    #[actix_web::test]
    async fn error_response_is_json_envelope() {
        let resp = MyError::bad_request("email is invalid").error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["message"], "bad request: email is invalid");
    }

    #[actix_web::test]
    async fn mail_error_detail_is_not_exposed() {
        let resp = MyError::mail("sendmail exited with 75").error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["message"], "mail delivery failed");
    }
}
