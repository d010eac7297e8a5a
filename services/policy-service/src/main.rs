use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use llm_governance_database::{PolicyStore, VectorIndex};
use llm_governance_decision_client::DecisionClient;
use llm_governance_semantic::{Canonicalizer, HashEmbedder, PassthroughCanonicalizer, PolicyEncoder};
use tracing::{info, Level};

mod config;
mod handlers;

use config::Config;

pub struct AppState {
    pub policy_store: PolicyStore,
    pub vector_index: VectorIndex,
    pub decision_client: DecisionClient,
    pub policy_encoder: PolicyEncoder<HashEmbedder>,
    pub canonicalizer: Box<dyn Canonicalizer>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).json().init();

    dotenv::dotenv().ok();
    let config = Config::from_env().unwrap_or_default();

    info!("Starting policy-service on {}:{}", config.host, config.port);

    let pool = llm_governance_database::create_pool(&config.database_url)
        .await
        .expect("failed to create database pool");

    let vector_index = VectorIndex::connect(&config.vector_index_url).expect("failed to connect to vector index");

    let decision_client = DecisionClient::connect_lazy(&config.decision_service_url).expect("failed to construct decision-service client");

    let state = web::Data::new(AppState {
        policy_store: PolicyStore::new(pool),
        vector_index,
        decision_client,
        policy_encoder: PolicyEncoder::new(HashEmbedder),
        canonicalizer: Box::new(PassthroughCanonicalizer),
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
