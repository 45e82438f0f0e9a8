use actix_web::{
    error::InternalError, get, http::header::ContentType, post, web, HttpResponse, Responder,
};
use log::error;

use crate::{
    config::Config,
    dto::{ApiResponse, EnrollForm, FormStatus, IncompanyForm, InterestForm},
    service, PGPool,
};

fn token_response(status: FormStatus) -> HttpResponse {
    let mut builder = if status.is_error() {
        HttpResponse::BadRequest()
    } else {
        HttpResponse::Ok()
    };
    builder.insert_header(ContentType::plaintext()).body(status.to_string())
}

fn outcome(result: Result<FormStatus, crate::errors::MyError>, form: &str) -> HttpResponse {
    match result {
        Ok(status) => token_response(status),
        Err(err) => {
            error!("[{:} : {:}] {} form failed: {:?}", file!(), line!(), form, err);
            token_response(err.into())
        }
    }
}

#[post("/enroll")]
pub async fn enroll(
    form: web::Form<EnrollForm>,
    config: web::Data<Config>,
    pool_state: web::Data<PGPool>,
) -> impl Responder {
    let conn: &PGPool = pool_state.get_ref();
    outcome(service::enrollment::enroll(form.into_inner(), &config, conn).await, "enroll")
}

#[post("/interest")]
pub async fn interest(
    form: web::Form<InterestForm>,
    config: web::Data<Config>,
    pool_state: web::Data<PGPool>,
) -> impl Responder {
    let conn: &PGPool = pool_state.get_ref();
    outcome(service::interest::create(form.into_inner(), &config, conn).await, "interest")
}

#[post("/incompany")]
pub async fn incompany(
    form: web::Form<IncompanyForm>,
    config: web::Data<Config>,
    pool_state: web::Data<PGPool>,
) -> impl Responder {
    let conn: &PGPool = pool_state.get_ref();
    outcome(service::incompany::create(form.into_inner(), &config, conn).await, "incompany")
}

#[get("/courses")]
pub async fn open_courses(pool_state: web::Data<PGPool>) -> impl Responder {
    let conn: &PGPool = pool_state.get_ref();
    match service::course::get_open(conn).await {
        Ok(courses) => {
            let listing: Vec<serde_json::Value> = courses
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "id": c.course.id,
                        "name": c.course.name,
                        "description": c.course.description,
                        "course_date": c.course.course_date,
                        "location": c.course.location,
                        "price_cents": c.course.price_cents,
                        "seats_left": c.seats_left(),
                    })
                })
                .collect();
            HttpResponse::Ok().json(ApiResponse::data(listing))
        }
        Err(err) => HttpResponse::from_error(err),
    }
}

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().insert_header(ContentType::plaintext()).body("ok")
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::FormConfig::default().error_handler(|err, _req| {
        let response = token_response(FormStatus::Error("invalid form data".to_string()));
        InternalError::from_response(err, response).into()
    }))
    .service(enroll)
    .service(interest)
    .service(incompany);
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};

    use crate::handlers::{init_routes, test_support};

    macro_rules! app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(test_support::lazy_pool()))
                    .app_data(web::Data::new(test_support::config()))
                    .configure(|cfg| init_routes(cfg, test_support::JWT_SECRET)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn health_answers_ok() {
        let app = app!();
        let req = test::TestRequest::get().uri("/health").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "ok");
    }

    #[actix_web::test]
    async fn enroll_with_invalid_email_returns_error_token() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/forms/enroll")
            .set_form([
                ("course_id", "8d0f3a5e-6f43-4b7e-9a57-3f1f2f0c9a10"),
                ("name", "Anna"),
                ("email", "anna-at-example"),
            ])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = test::read_body(resp).await;
        assert_eq!(body, "error: invalid email");
    }

    #[actix_web::test]
    async fn malformed_form_returns_error_token() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/forms/enroll")
            .set_form([("course_id", "not-a-uuid"), ("name", "Anna"), ("email", "a@b.nl")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = test::read_body(resp).await;
        assert_eq!(body, "error: invalid form data");
    }

    #[actix_web::test]
    async fn interest_requires_training_name() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/forms/interest")
            .set_form([("name", "Anna"), ("email", "anna@example.com"), ("training_name", " ")])
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "error: training_name is required");
    }

    #[actix_web::test]
    async fn incompany_requires_company() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/forms/incompany")
            .set_form([
                ("company", ""),
                ("contact_name", "Bob"),
                ("email", "bob@acme.com"),
                ("training_topic", "Fire safety"),
            ])
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "error: company is required");
    }
}
