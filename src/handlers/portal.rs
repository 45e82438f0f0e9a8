use actix_web::{get, web, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::{
    dto::{AccessKeyQuery, ApiResponse},
    errors::MyError,
    service, PGPool,
};

use super::certificate::pdf_response;

const ACCESS_KEY_HEADER: &str = "X-Access-Key";

/// The header wins over the `key` query parameter used by mailed links.
fn access_key(req: &HttpRequest, query: &AccessKeyQuery) -> Result<String, MyError> {
    req.headers()
        .get(ACCESS_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| query.key.clone())
        .ok_or(MyError::AuthError)
}

#[get("/portal")]
pub async fn portal_overview(
    req: HttpRequest,
    query: web::Query<AccessKeyQuery>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, MyError> {
    let conn: &PGPool = pool_state.get_ref();
    let user = service::portal::authenticate(&access_key(&req, &query)?, conn).await?;
    let overview = service::user::get_overview(user.id, conn).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(overview)))
}

#[get("/portal/certificates/{id}/download")]
pub async fn download_certificate(
    req: HttpRequest,
    id: web::Path<Uuid>,
    query: web::Query<AccessKeyQuery>,
    pool_state: web::Data<PGPool>,
) -> Result<HttpResponse, MyError> {
    let conn: &PGPool = pool_state.get_ref();
    let user = service::portal::authenticate(&access_key(&req, &query)?, conn).await?;
    let file = service::certificate::download(id.into_inner(), Some(user.id), conn).await?;
    Ok(pdf_response(file))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(portal_overview).service(download_certificate);
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};

    use crate::handlers::{init_routes, test_support};

    #[actix_web::test]
    async fn missing_or_malformed_key_is_unauthorized() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_support::lazy_pool()))
                .app_data(web::Data::new(test_support::config()))
                .configure(|cfg| init_routes(cfg, test_support::JWT_SECRET)),
        )
        .await;

        let req = test::TestRequest::get().uri("/portal").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get().uri("/portal?key=not-a-key").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/portal/certificates/8d0f3a5e-6f43-4b7e-9a57-3f1f2f0c9a10/download")
            .insert_header(("X-Access-Key", "zz"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }
}
