use std::collections::BTreeMap;

use pcn_core::{path_edges, Channel, ChannelId, CreditNetwork, NetworkError, NodeId, Path};

/// One payment attempt against the shared network.
///
/// Every commit goes through the attempt, which snapshots each channel the
/// first time it is touched. [`Attempt::rollback`] writes the snapshots
/// back, so a failed payment restores balances bit for bit.
/// [`Attempt::settle`] keeps the changes and returns the commit log.
#[derive(Debug)]
pub struct Attempt<'a> {
    network: &'a mut CreditNetwork,
    saved: BTreeMap<ChannelId, Channel>,
    log: Vec<(Path, f64)>,
}

impl<'a> Attempt<'a> {
    pub fn begin(network: &'a mut CreditNetwork) -> Self {
        Self {
            network,
            saved: BTreeMap::new(),
            log: Vec::new(),
        }
    }

    pub fn network(&self) -> &CreditNetwork {
        self.network
    }

    /// Live bottleneck balance of `path`, including this attempt's commits.
    pub fn capacity(&self, path: &[NodeId]) -> Result<f64, NetworkError> {
        self.network.path_capacity(path)
    }

    pub fn balance(&self, from: NodeId, to: NodeId) -> Result<f64, NetworkError> {
        self.network.balance(from, to)
    }

    /// Move `amount` along `path`. The caller has already checked capacity.
    pub fn commit(&mut self, path: &[NodeId], amount: f64) -> Result<(), NetworkError> {
        for (from, to) in path_edges(path) {
            let id = self
                .network
                .channel_id(from, to)
                .ok_or(NetworkError::NoSuchEdge { from, to })?;
            if !self.saved.contains_key(&id) {
                if let Some(channel) = self.network.channel(id) {
                    self.saved.insert(id, channel.clone());
                }
            }
        }
        self.network.apply(path, amount)?;
        self.log.push((path.to_vec(), amount));
        Ok(())
    }

    /// Commits made so far, in order.
    pub fn commits(&self) -> &[(Path, f64)] {
        &self.log
    }

    /// Sum of committed amounts.
    pub fn committed(&self) -> f64 {
        self.log.iter().map(|(_, amount)| amount).sum()
    }

    /// Undo every commit of this attempt.
    pub fn rollback(self) -> Result<(), NetworkError> {
        for channel in self.saved.values() {
            self.network.restore_channel(channel)?;
        }
        tracing::trace!(commits = self.log.len(), "attempt rolled back");
        Ok(())
    }

    /// Keep every commit and hand back the log.
    pub fn settle(self) -> Vec<(Path, f64)> {
        self.log
    }
}
