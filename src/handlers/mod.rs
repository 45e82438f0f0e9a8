pub mod auth;
pub mod certificate;
pub mod course;
pub mod dashboard;
pub mod email_queue;
pub mod forms;
pub mod lead;
pub mod portal;
pub mod user;

use actix_web::web;

use crate::service::auth::AdminAuthMiddleware;

/// Public forms, the participant portal and the session-gated admin API.
pub fn init_routes(cfg: &mut web::ServiceConfig, jwt_secret: &str) {
    cfg.service(forms::health)
        .service(forms::open_courses)
        .service(web::scope("/forms").configure(forms::init_routes))
        .configure(portal::init_routes)
        .service(auth::login)
        .service(
            web::scope("/admin")
                .wrap(AdminAuthMiddleware::new(jwt_secret))
                .configure(dashboard::init_routes)
                .configure(course::init_routes)
                .configure(user::init_routes)
                .configure(lead::init_routes)
                .configure(certificate::init_routes)
                .configure(email_queue::init_routes),
        );
}
