use actix_web::{get, post, web, HttpResponse};
use uuid::Uuid;

use crate::{
    config::Config,
    dto::{ApiResponse, EmailStatusFilter},
    errors::MyError,
    service::{self, mail::Mailer},
    PGPool,
};

#[get("/email-queue")]
pub async fn get_all(filter: web::Query<EmailStatusFilter>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, MyError> {
    let items = service::email_queue::get_all(filter.status, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(items)))
}

/// Runs one batch right away instead of waiting for the worker.
#[post("/email-queue/process")]
pub async fn process(
    mailer: web::Data<dyn Mailer>,
    config: web::Data<Config>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, MyError> {
    let report = service::email_queue::process_batch(pool_state.get_ref(), mailer.get_ref(), &config.queue).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(format!("{} sent", report.sent), report)))
}

#[post("/email-queue/{id}/retry")]
pub async fn retry(id: web::Path<Uuid>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, MyError> {
    service::email_queue::retry(id.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("message requeued")))
}

#[post("/email-queue/{id}/cancel")]
pub async fn cancel(id: web::Path<Uuid>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, MyError> {
    service::email_queue::cancel(id.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("message cancelled")))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_all)
        .service(process)
        .service(retry)
        .service(cancel);
}
