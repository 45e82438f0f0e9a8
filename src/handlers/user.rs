use actix_web::{delete, get, post, put, web, HttpResponse};
use uuid::Uuid;

use crate::{
    config::Config,
    dto::{ApiResponse, UpdateUserDto, UserFilter},
    errors::MyError,
    service, PGPool,
};

#[get("/users")]
pub async fn get_all(filter: web::Query<UserFilter>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, MyError> {
    let users = service::user::get_all(&filter, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(users)))
}

#[get("/users/{id}")]
pub async fn get_by_id(id: web::Path<Uuid>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, MyError> {
    let overview = service::user::get_overview(id.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(overview)))
}

#[put("/users/{id}")]
pub async fn update(
    id: web::Path<Uuid>,
    dto: web::Json<UpdateUserDto>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, MyError> {
    let user = service::user::update(id.into_inner(), dto.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message("user updated", user)))
}

#[post("/users/{id}/activate")]
pub async fn activate(id: web::Path<Uuid>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, MyError> {
    let user = service::user::set_active(id.into_inner(), true, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message("user activated", user)))
}

#[post("/users/{id}/deactivate")]
pub async fn deactivate(id: web::Path<Uuid>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, MyError> {
    let user = service::user::set_active(id.into_inner(), false, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message("user deactivated", user)))
}

#[post("/users/{id}/rotate-key")]
pub async fn rotate_key(id: web::Path<Uuid>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, MyError> {
    service::user::rotate_access_key(id.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("access key rotated")))
}

#[post("/users/{id}/send-access")]
pub async fn send_access(
    id: web::Path<Uuid>,
    config: web::Data<Config>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, MyError> {
    service::user::send_portal_access(id.into_inner(), &config, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("portal access mail queued")))
}

#[delete("/users/{id}")]
pub async fn delete(id: web::Path<Uuid>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, MyError> {
    service::user::delete(id.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("user deleted")))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_all)
        .service(get_by_id)
        .service(update)
        .service(activate)
        .service(deactivate)
        .service(rotate_key)
        .service(send_access)
        .service(delete);
}
