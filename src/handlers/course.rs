use actix_web::{delete, get, post, put, web, HttpResponse};
use uuid::Uuid;

use crate::{
    config::Config,
    dto::{ApiResponse, CourseFilter, GenerateCertificateDto, NewCourseDto, PaymentStatusDto, UpdateCourseDto},
    errors::MyError,
    service, PGPool,
};

#[post("/courses")]
pub async fn create(new_course_dto: web::Json<NewCourseDto>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, MyError> {
    let course = service::course::create(new_course_dto.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::with_message("course created", course)))
}

#[get("/courses")]
pub async fn get_all(filter: web::Query<CourseFilter>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, MyError> {
    let courses = service::course::get_all(&filter, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(courses)))
}

#[get("/courses/{id}")]
pub async fn get_by_id(id: web::Path<Uuid>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, MyError> {
    let course = service::course::get_by_id(id.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(course)))
}

#[put("/courses/{id}")]
pub async fn update(
    id: web::Path<Uuid>,
    update_course_dto: web::Json<UpdateCourseDto>,
    pool_state: web::Data<PGPool>
) -> Result<HttpResponse, MyError> {
    let course = service::course::update(id.into_inner(), update_course_dto.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message("course updated", course)))
}

#[delete("/courses/{id}")]
pub async fn delete(id: web::Path<Uuid>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, MyError> {
    service::course::delete(id.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("course deleted")))
}

#[get("/courses/{id}/participants")]
pub async fn list_participants(id: web::Path<Uuid>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, MyError> {
    let participants = service::enrollment::list_for_course(id.into_inner(), pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(participants)))
}

#[post("/courses/{id}/certificates")]
pub async fn generate_certificates(
    id: web::Path<Uuid>,
    dto: Option<web::Json<GenerateCertificateDto>>,
    config: web::Data<Config>,
    pool_state: web::Data<PGPool>
) -> Result<HttpResponse, MyError> {
    let certificate_type = dto.map(|d| d.into_inner()).unwrap_or_default().certificate_type();
    let report = service::certificate::generate_for_course(id.into_inner(), &certificate_type, &config, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        format!("{} certificates generated", report.generated),
        report
    )))
}

#[put("/participants/{id}/payment-status")]
pub async fn set_payment_status(
    id: web::Path<Uuid>,
    dto: web::Json<PaymentStatusDto>,
    pool_state: web::Data<PGPool>
) -> Result<HttpResponse, MyError> {
    let participant = service::enrollment::set_payment_status(id.into_inner(), dto.payment_status, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message("payment status updated", participant)))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create)
        .service(get_all)
        .service(get_by_id)
        .service(update)
        .service(delete)
        .service(list_participants)
        .service(generate_certificates)
        .service(set_payment_status);
}
