pub mod policies;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    policies::configure(cfg);
}
