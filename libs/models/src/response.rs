use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::decision::Decision;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcementResponse {
    pub decision: Decision,
    #[serde(default)]
    pub modified_params: HashMap<String, serde_json::Value>,
    pub drift_score: f64,
    pub drift_triggered: bool,
    #[serde(default)]
    pub slice_similarities: HashMap<String, f32>,
    pub evidence: serde_json::Value,
}
