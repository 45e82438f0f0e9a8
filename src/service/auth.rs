use std::future::{ready, Ready};
use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    HttpMessage,
};
use futures_util::future::LocalBoxFuture;
use log::warn;

/// Set on the request by `AdminAuthMiddleware` once the session token checks out.
#[derive(Debug, Clone)]
pub struct AdminAuthData {
    pub username: String,
}

pub struct AdminAuthMiddleware {
    pub jwt_secret: Rc<String>,
}

impl AdminAuthMiddleware {
    pub fn new(jwt_secret: &str) -> Self {
        AdminAuthMiddleware {
            jwt_secret: Rc::new(jwt_secret.to_string()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Transform = AdminAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminAuthMiddlewareService {
            service,
            jwt_secret: self.jwt_secret.clone(),
        }))
    }
}

pub struct AdminAuthMiddlewareService<S> {
    service: S,
    jwt_secret: Rc<String>,
}

impl<S, B> Service<ServiceRequest> for AdminAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let validation = jwt::parse_request(&req, "Bearer ")
            .and_then(|token| jwt::decode_claims(&token, &self.jwt_secret));
        match validation {
            Ok(claims) => {
                req.extensions_mut().insert(AdminAuthData { username: claims.sub });
                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res)
                })
            }
            Err(err) => {
                warn!("rejected admin request {} {}: {}", req.method(), req.uri(), err);
                Box::pin(async move { Err(err.into()) })
            }
        }
    }
}

pub mod jwt {
    use std::time::Duration;

    use actix_web::dev::ServiceRequest;
    use chrono::{TimeZone, Utc};
    use jsonwebtoken::{
        decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
    };
    use log::info;

    use crate::{
        config::AdminConfig,
        dto::{Claims, LoginRequest, LoginResponse},
        errors::MyError,
        service::crypto,
    };

    pub fn create(username: &str, ttl: Duration, secret: &str) -> Result<(String, usize), MyError> {
        let exp = Utc::now().timestamp() as usize + ttl.as_secs() as usize;
        let claims = Claims::new(username, exp);
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|_| MyError::InternalError)?;
        Ok((token, exp))
    }

    /// Decodes and validates the session token, including its expiry.
    pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, MyError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => MyError::TokenExpirationError,
                _ => MyError::DecodeError,
            })
    }

    pub fn parse_request(req: &ServiceRequest, prefix: &str) -> Result<String, MyError> {
        if let Some(auth_header) = req.headers().get("Authorization") {
            if let Ok(auth_value) = auth_header.to_str() {
                if let Some(token) = auth_value.strip_prefix(prefix) {
                    return Ok(token.trim().to_string());
                }
            }
        }
        Err(MyError::AuthError)
    }

    /// Checks the credentials against the configured admin account and opens a session.
    pub fn login(admin: &AdminConfig, req: &LoginRequest) -> Result<LoginResponse, MyError> {
        let pwd_hash = crypto::get_sha3_256_hash(&req.password);
        let username_ok = req.username.trim() == admin.username;
        let password_ok = crypto::digest_eq(&pwd_hash, &admin.password_hash);
        if !(username_ok && password_ok) {
            return Err(MyError::AuthError);
        }
        let (token, exp) = create(&admin.username, admin.session_ttl, &admin.jwt_secret)?;
        let expires_at = Utc
            .timestamp_opt(exp as i64, 0)
            .single()
            .ok_or(MyError::InternalError)?;
        info!("admin session opened for {}", admin.username);
        Ok(LoginResponse { token, expires_at })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::jwt;
    use crate::{config::AdminConfig, dto::LoginRequest, errors::MyError, service::crypto};

    fn admin() -> AdminConfig {
        AdminConfig {
            username: "admin".into(),
            password_hash: crypto::get_sha3_256_hash("s3cret"),
            jwt_secret: "jwt-secret".into(),
            session_ttl: Duration::from_secs(3600),
        }
    }

    #[test]
    fn token_round_trips_username() {
        let (token, _) = jwt::create("admin", Duration::from_secs(60), "k").unwrap();
        let claims = jwt::decode_claims(&token, "k").unwrap();
        assert_eq!(claims.sub, "admin");
    }

    #[test]
    fn token_with_other_secret_is_rejected() {
        let (token, _) = jwt::create("admin", Duration::from_secs(60), "k").unwrap();
        assert!(matches!(jwt::decode_claims(&token, "other"), Err(MyError::DecodeError)));
    }

    #[test]
    fn login_with_valid_credentials() {
        let req = LoginRequest { username: "admin".into(), password: "s3cret".into() };
        let res = jwt::login(&admin(), &req).unwrap();
        assert!(jwt::decode_claims(&res.token, "jwt-secret").is_ok());
        assert!(res.expires_at > chrono::Utc::now());
    }

    #[test]
    fn login_with_wrong_password_fails() {
        let req = LoginRequest { username: "admin".into(), password: "guess".into() };
        assert!(matches!(jwt::login(&admin(), &req), Err(MyError::AuthError)));
    }
}
