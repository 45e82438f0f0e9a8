use actix_web::{
    get,
    http::header::{ContentDisposition, DispositionParam, DispositionType},
    post, web, HttpResponse,
};
use uuid::Uuid;

use crate::{
    config::Config,
    dto::{ApiResponse, CertificateFilter, GenerateCertificateDto},
    errors::MyError,
    service::{self, certificate::Download},
    PGPool,
};

pub fn pdf_response(file: Download) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(file.file_name)],
        })
        .body(file.bytes)
}

#[get("/certificates")]
pub async fn get_all(filter: web::Query<CertificateFilter>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, MyError> {
    let certificates = service::certificate::list(filter.course_id, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(certificates)))
}

#[post("/participants/{id}/certificates")]
pub async fn generate(
    id: web::Path<Uuid>,
    dto: Option<web::Json<GenerateCertificateDto>>,
    config: web::Data<Config>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, MyError> {
    let certificate_type = dto.map(|d| d.into_inner()).unwrap_or_default().certificate_type();
    let (certificate, created) =
        service::certificate::generate(id.into_inner(), &certificate_type, &config, pool_state.get_ref()).await?;
    let response = if created {
        HttpResponse::Created().json(ApiResponse::with_message("certificate generated", certificate))
    } else {
        HttpResponse::Ok().json(ApiResponse::with_message("certificate already issued", certificate))
    };
    Ok(response)
}

#[post("/certificates/{id}/send")]
pub async fn send(
    id: web::Path<Uuid>,
    config: web::Data<Config>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, MyError> {
    service::certificate::send(id.into_inner(), &config, pool_state.get_ref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("certificate mail queued")))
}

#[get("/certificates/{id}/download")]
pub async fn download_certificate(id: web::Path<Uuid>, pool_state: web::Data<PGPool>) -> Result<HttpResponse, MyError> {
    let file = service::certificate::download(id.into_inner(), None, pool_state.get_ref()).await?;
    Ok(pdf_response(file))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_all)
        .service(generate)
        .service(send)
        .service(download_certificate);
}
