pub mod config;
pub mod db;
pub mod dto;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod service;

use std::{io, sync::Arc};

use actix_web::{web, App, HttpServer};
use log::{error, info};
use sqlx::{postgres::Postgres, Pool};

use config::Config;
use db::init_db_pool;
use service::{
    email_queue,
    log::{init_logger, LoggerMiddleware},
    mail::{self, Mailer},
};

type PGPool = Pool<Postgres>;

/// Runs a single email queue batch and exits, for cron-driven setups.
const PROCESS_QUEUE_COMMAND: &str = "process-email-queue";

#[actix_web::main]
async fn main() -> io::Result<()> {
    init_logger();
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("configuration error: {}", err);
            std::process::exit(1);
        }
    };

    let pool: PGPool = init_db_pool(&config)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    let mailer: Arc<dyn Mailer> = Arc::from(mail::from_config(&config.mail));

    if std::env::args().nth(1).as_deref() == Some(PROCESS_QUEUE_COMMAND) {
        return match email_queue::process_batch(&pool, &*mailer, &config.queue).await {
            Ok(report) => {
                info!("email queue processed: {:?}", report);
                Ok(())
            }
            Err(err) => {
                error!("email queue run failed: {:?}", err);
                Err(io::Error::new(io::ErrorKind::Other, err.to_string()))
            }
        };
    }

    email_queue::spawn_worker(pool.clone(), mailer.clone(), config.queue.clone());

    let bind = (config.host.clone(), config.port);
    info!("listening on {}:{}", bind.0, bind.1);
    let jwt_secret = config.admin.jwt_secret.clone();
    let config_data = web::Data::new(config);
    let mailer_data: web::Data<dyn Mailer> = web::Data::from(mailer);
    HttpServer::new(move || {
        App::new()
            .wrap(LoggerMiddleware)
            .app_data(web::Data::new(pool.clone()))
            .app_data(config_data.clone())
            .app_data(mailer_data.clone())
            .configure(|cfg| handlers::init_routes(cfg, &jwt_secret))
    })
    .bind(bind)?
    .run()
    .await
}
