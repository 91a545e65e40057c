//! JSON scenario files: a directed balance graph plus a payment sequence.

use std::path::Path;

use anyhow::Context;
use pcn_core::{CreditNetwork, NetworkError, NodeId, Payment};
use serde::{Deserialize, Serialize};

/// One directed balance, `from -> to`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub from: NodeId,
    pub to: NodeId,
    pub balance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub channels: Vec<ChannelSpec>,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        let scenario: Scenario = serde_json::from_str(&contents)
            .with_context(|| format!("parsing scenario {}", path.display()))?;
        Ok(scenario)
    }

    pub fn network(&self) -> Result<CreditNetwork, NetworkError> {
        CreditNetwork::from_directed_edges(
            self.channels.iter().map(|c| (c.from, c.to, c.balance)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = r#"{
        "channels": [
            {"from": 0, "to": 1, "balance": 100.0},
            {"from": 1, "to": 0, "balance": 100.0},
            {"from": 1, "to": 2, "balance": 100.0},
            {"from": 2, "to": 1, "balance": 100.0}
        ],
        "payments": [{"src": 0, "dst": 2, "amount": 50.0}]
    }"#;

    #[test]
    fn test_parse_scenario() {
        let scenario: Scenario = serde_json::from_str(LINE).unwrap();
        assert_eq!(scenario.payments, vec![Payment::new(0, 2, 50.0)]);
        let network = scenario.network().unwrap();
        assert_eq!(network.channel_count(), 2);
        assert_eq!(network.balance(2, 1).unwrap(), 100.0);
    }

    #[test]
    fn test_payments_optional() {
        let scenario: Scenario =
            serde_json::from_str(r#"{"channels":[{"from":3,"to":4,"balance":1.5}]}"#).unwrap();
        assert!(scenario.payments.is_empty());
        assert_eq!(scenario.network().unwrap().balance(4, 3).unwrap(), 0.0);
    }

    #[test]
    fn test_negative_balance_rejected() {
        let scenario: Scenario =
            serde_json::from_str(r#"{"channels":[{"from":3,"to":4,"balance":-1.0}]}"#).unwrap();
        assert!(matches!(
            scenario.network(),
            Err(NetworkError::NegativeBalance { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Scenario::load(Path::new("/nonexistent/scenario.json")).unwrap_err();
        assert!(err.to_string().contains("reading scenario"));
    }
}
