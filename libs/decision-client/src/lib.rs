pub mod client;
pub mod proto {
    tonic::include_proto!("agentguard.decision.v1");
}

pub use client::{DecisionClient, EnforceOutcome, RemoveAgentRulesOutcome, SessionQueryOutcome};
