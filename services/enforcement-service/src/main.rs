use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use llm_governance_database::SessionStore;
use llm_governance_decision_client::DecisionClient;
use llm_governance_semantic::{HashEmbedder, IntentEncoder};
use tracing::{info, Level};

mod config;
mod handlers;

use config::Config;

pub struct AppState {
    pub session_store: SessionStore,
    pub decision_client: DecisionClient,
    pub intent_encoder: IntentEncoder<HashEmbedder>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).json().init();

    dotenv::dotenv().ok();
    let config = Config::from_env().unwrap_or_default();

    info!("Starting enforcement-service on {}:{}", config.host, config.port);

    let pool = llm_governance_database::create_pool(&config.database_url)
        .await
        .expect("failed to create database pool");

    let decision_client = DecisionClient::connect_lazy(&config.decision_service_url).expect("failed to construct decision-service client");

    let state = web::Data::new(AppState {
        session_store: SessionStore::new(pool),
        decision_client,
        intent_encoder: IntentEncoder::new(HashEmbedder),
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(tracing_actix_web::TracingLogger::default())
            .wrap(Cors::permissive())
            .configure(handlers::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
