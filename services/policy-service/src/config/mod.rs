use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub vector_index_url: String,
    pub decision_service_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("POLICY_SERVICE_").from_env::<Self>()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            database_url: "sqlite://policy_service.db".to_string(),
            vector_index_url: "http://127.0.0.1:6334".to_string(),
            decision_service_url: "http://127.0.0.1:50051".to_string(),
        }
    }
}
