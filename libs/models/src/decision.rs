use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The five enforcement outcomes a decision can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Allow,
    Deny,
    Modify,
    StepUp,
    Defer,
}

impl Decision {
    /// Map the remote decision service's numeric code when it did not
    /// return a named decision: `1 -> ALLOW`, anything else `-> DENY`.
    pub fn from_code(code: i32) -> Self {
        if code == 1 {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_up_serializes_with_underscore() {
        assert_eq!(Decision::StepUp.to_string(), "STEP_UP");
    }

    #[test]
    fn unrecognized_code_maps_to_deny() {
        assert_eq!(Decision::from_code(0), Decision::Deny);
        assert_eq!(Decision::from_code(1), Decision::Allow);
        assert_eq!(Decision::from_code(42), Decision::Deny);
    }
}
