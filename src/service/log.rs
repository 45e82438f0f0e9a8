use std::future::{ready, Ready};
use std::io::Write;
use std::time::Instant;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use colored::Colorize;
use env_logger::Builder;
use futures_util::future::LocalBoxFuture;
use log::{info, Level, LevelFilter};

/// Logs every request line and the status it was answered with.
pub struct LoggerMiddleware;

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggerMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggerMiddlewareService { service }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let started = Instant::now();
        let line = format!("{} {}", req.method(), req.path());
        let fut = self.service.call(req);

        Box::pin(async move {
            match fut.await {
                Ok(res) => {
                    info!("{} -> {} in {:?}", line, res.status(), started.elapsed());
                    Ok(res)
                }
                Err(err) => {
                    info!("{} -> {} in {:?}", line, err.as_response_error().status_code(), started.elapsed());
                    Err(err)
                }
            }
        })
    }
}

fn paint(level: Level) -> colored::ColoredString {
    let name = level.as_str();
    match level {
        Level::Error => name.red().bold(),
        Level::Warn => name.yellow().bold(),
        Level::Info => name.green().bold(),
        Level::Debug => name.blue().bold(),
        Level::Trace => name.magenta().bold(),
    }
}

/// `RUST_LOG` controls filtering; defaults to `info`.
pub fn init_logger() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {} [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                paint(record.level()),
                record.target(),
                record.args()
            )
        })
        .init()
}
