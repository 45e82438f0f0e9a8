use actix_web::{get, web, HttpResponse};
use chrono::{Datelike, Utc};

use crate::{
    dto::{ApiResponse, PlanningQuery},
    errors::MyError,
    service, PGPool,
};

#[get("/dashboard")]
pub async fn get_dashboard(pool_state: web::Data<PGPool>) -> Result<HttpResponse, MyError> {
    let dashboard = service::dashboard::dashboard(pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(dashboard)))
}

#[get("/planning")]
pub async fn get_planning(query: web::Query<PlanningQuery>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, MyError> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let months = service::dashboard::planning(year, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(format!("planning {year}"), months)))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_dashboard).service(get_planning);
}
