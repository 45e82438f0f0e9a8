use actix_web::{post, web, HttpResponse, Responder};
use log::{info, warn};

use crate::{config::Config, dto::{ApiResponse, LoginRequest}, service};

#[post("/admin/login")]
pub async fn login(req: web::Json<LoginRequest>, config: web::Data<Config>) -> impl Responder {
    match service::auth::jwt::login(&config.admin, &req) {
        Ok(val) => {
            info!("RESPONSE /ADMIN/LOGIN: session until {}", val.expires_at);
            HttpResponse::Ok().json(ApiResponse::with_message("logged in", val))
        }
        Err(err) => {
            warn!("failed admin login for '{}'", req.username);
            HttpResponse::from_error(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};

    use crate::handlers::{init_routes, test_support};

    #[actix_web::test]
    async fn login_then_reach_admin_scope() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_support::lazy_pool()))
                .app_data(web::Data::new(test_support::config()))
                .configure(|cfg| init_routes(cfg, test_support::JWT_SECRET)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/admin/login")
            .set_json(serde_json::json!({ "username": "admin", "password": "s3cret" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "success");
        assert!(body["data"]["token"].as_str().is_some());
    }

    #[actix_web::test]
    async fn wrong_password_is_unauthorized() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_support::config()))
                .configure(|cfg| init_routes(cfg, test_support::JWT_SECRET)),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/admin/login")
            .set_json(serde_json::json!({ "username": "admin", "password": "nope" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn admin_routes_require_a_session() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_support::lazy_pool()))
                .app_data(web::Data::new(test_support::config()))
                .configure(|cfg| init_routes(cfg, test_support::JWT_SECRET)),
        )
        .await;

        let req = test::TestRequest::get().uri("/admin/dashboard").to_request();
        let resp = test::try_call_service(&app, req).await;
        let status = match resp {
            Ok(resp) => resp.status(),
            Err(err) => err.as_response_error().status_code(),
        };
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/admin/courses")
            .insert_header(("Authorization", "Bearer garbage"))
            .to_request();
        let status = match test::try_call_service(&app, req).await {
            Ok(resp) => resp.status(),
            Err(err) => err.as_response_error().status_code(),
        };
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
