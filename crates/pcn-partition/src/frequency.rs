use std::collections::BTreeMap;

use pcn_core::{NodeId, Payment};
use serde::{Deserialize, Serialize};

/// How often each pair of nodes transacts, counted symmetrically.
///
/// Built once from the payment trace and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentFrequency {
    counts: BTreeMap<NodeId, BTreeMap<NodeId, u64>>,
}

impl PaymentFrequency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every payment once in each direction.
    pub fn from_payments<'a, I>(payments: I) -> Self
    where
        I: IntoIterator<Item = &'a Payment>,
    {
        let mut freq = Self::new();
        for p in payments {
            freq.record(p.src, p.dst);
        }
        freq
    }

    pub fn record(&mut self, a: NodeId, b: NodeId) {
        *self.counts.entry(a).or_default().entry(b).or_insert(0) += 1;
        *self.counts.entry(b).or_default().entry(a).or_insert(0) += 1;
    }

    /// The counterparties of `node` and how often it transacted with each.
    pub fn partners(&self, node: NodeId) -> impl Iterator<Item = (NodeId, u64)> + '_ {
        self.counts
            .get(&node)
            .into_iter()
            .flat_map(|m| m.iter().map(|(&n, &c)| (n, c)))
    }

    pub fn count(&self, a: NodeId, b: NodeId) -> u64 {
        self.counts
            .get(&a)
            .and_then(|m| m.get(&b))
            .copied()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
