pub mod enforce;
pub mod telemetry;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    enforce::configure(cfg);
    telemetry::configure(cfg);
}
