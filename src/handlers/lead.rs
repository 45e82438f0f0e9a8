use actix_web::{delete, get, put, web, HttpResponse};
use uuid::Uuid;

use crate::{
    dto::{ApiResponse, RequestStatusDto, RequestStatusFilter},
    errors::MyError,
    service, PGPool,
};

#[get("/interests")]
pub async fn list_interests(pool_state: web::Data<PGPool>) -> Result<HttpResponse, MyError> {
    let interests = service::interest::get_all(pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(interests)))
}

#[delete("/interests/{id}")]
pub async fn delete_interest(id: web::Path<Uuid>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, MyError> {
    service::interest::delete(id.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("interest deleted")))
}

#[get("/incompany")]
pub async fn incompany_requests(
    filter: web::Query<RequestStatusFilter>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, MyError> {
    let requests = service::incompany::get_all(filter.status, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(requests)))
}

#[put("/incompany/{id}/status")]
pub async fn set_incompany_status(
    id: web::Path<Uuid>,
    dto: web::Json<RequestStatusDto>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, MyError> {
    let request = service::incompany::set_status(id.into_inner(), dto.status, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message("status updated", request)))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_interests)
        .service(delete_interest)
        .service(incompany_requests)
        .service(set_incompany_status);
}
