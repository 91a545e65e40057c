use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::NetworkError;
use crate::graph::{Adjacency, UndirectedGraph};
use crate::types::{path_edges, DirectedEdge, NodeId};

/// Stable index of a channel inside the network arena.
pub type ChannelId = usize;

/// A bilateral channel between `low < high`.
///
/// `forward_balance` is spendable in the `low -> high` direction,
/// `reverse_balance` in the `high -> low` direction. Their sum is the
/// channel capacity, which no settled transfer changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub low: NodeId,
    pub high: NodeId,
    pub forward_balance: f64,
    pub reverse_balance: f64,
}

impl Channel {
    pub fn capacity(&self) -> f64 {
        self.forward_balance + self.reverse_balance
    }

    /// Balance spendable by `from` towards the other endpoint.
    fn balance_from(&self, from: NodeId) -> f64 {
        if from == self.low {
            self.forward_balance
        } else {
            self.reverse_balance
        }
    }

    fn balance_from_mut(&mut self, from: NodeId) -> &mut f64 {
        if from == self.low {
            &mut self.forward_balance
        } else {
            &mut self.reverse_balance
        }
    }
}

/// The shared balance graph every routing strategy reads and mutates.
///
/// Channels live in an arena indexed by [`ChannelId`]; neighbour lists keep
/// insertion order so searches are reproducible.
#[derive(Debug, Clone, Default)]
pub struct CreditNetwork {
    channels: Vec<Channel>,
    index: HashMap<(NodeId, NodeId), ChannelId>,
    adjacency: BTreeMap<NodeId, Vec<NodeId>>,
}

fn channel_key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

impl CreditNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a network from directed `(from, to, balance)` triples.
    ///
    /// Both directions of a channel normally appear; a direction that is
    /// missing from the input starts with a zero balance.
    pub fn from_directed_edges<I>(edges: I) -> Result<Self, NetworkError>
    where
        I: IntoIterator<Item = (NodeId, NodeId, f64)>,
    {
        let mut network = Self::new();
        for (from, to, balance) in edges {
            if from == to {
                return Err(NetworkError::SelfLoop(from));
            }
            if balance.is_nan() || balance < 0.0 {
                return Err(NetworkError::NegativeBalance { from, to, balance });
            }
            let id = match network.channel_id(from, to) {
                Some(id) => id,
                None => network.add_channel(from, to, 0.0, 0.0)?,
            };
            *network.channels[id].balance_from_mut(from) = balance;
        }
        tracing::debug!(
            nodes = network.node_count(),
            channels = network.channel_count(),
            "credit network built"
        );
        Ok(network)
    }

    /// Open a channel between `a` and `b` with the given directed balances.
    pub fn add_channel(
        &mut self,
        a: NodeId,
        b: NodeId,
        balance_ab: f64,
        balance_ba: f64,
    ) -> Result<ChannelId, NetworkError> {
        if a == b {
            return Err(NetworkError::SelfLoop(a));
        }
        for (from, to, balance) in [(a, b, balance_ab), (b, a, balance_ba)] {
            if balance.is_nan() || balance < 0.0 {
                return Err(NetworkError::NegativeBalance { from, to, balance });
            }
        }
        let key = channel_key(a, b);
        if self.index.contains_key(&key) {
            return Err(NetworkError::DuplicateChannel { a, b });
        }

        let (forward_balance, reverse_balance) = if a < b {
            (balance_ab, balance_ba)
        } else {
            (balance_ba, balance_ab)
        };
        let id = self.channels.len();
        self.channels.push(Channel {
            low: key.0,
            high: key.1,
            forward_balance,
            reverse_balance,
        });
        self.index.insert(key, id);
        self.adjacency.entry(a).or_default().push(b);
        self.adjacency.entry(b).or_default().push(a);
        Ok(id)
    }

    pub fn channel_id(&self, a: NodeId, b: NodeId) -> Option<ChannelId> {
        self.index.get(&channel_key(a, b)).copied()
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(id)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.index.contains_key(&channel_key(from, to))
    }

    /// Current balance spendable from `from` to `to`.
    pub fn balance(&self, from: NodeId, to: NodeId) -> Result<f64, NetworkError> {
        self.channel_id(from, to)
            .map(|id| self.channels[id].balance_from(from))
            .ok_or(NetworkError::NoSuchEdge { from, to })
    }

    /// Fail with `NoSuchNode` unless `node` has at least one channel.
    pub fn ensure_node(&self, node: NodeId) -> Result<(), NetworkError> {
        if self.adjacency.contains_key(&node) {
            Ok(())
        } else {
            Err(NetworkError::NoSuchNode(node))
        }
    }

    /// Minimum directed balance along `path`; infinite for a single-node path.
    pub fn path_capacity(&self, path: &[NodeId]) -> Result<f64, NetworkError> {
        let mut capacity = f64::INFINITY;
        for (from, to) in path_edges(path) {
            capacity = capacity.min(self.balance(from, to)?);
        }
        Ok(capacity)
    }

    /// Move `amount` along `path`: every forward edge is debited and every
    /// reverse edge credited. `apply(path, -amount)` is the exact inverse.
    ///
    /// The network does not check that balances stay non-negative; callers
    /// probe capacity first. Every edge is resolved before any balance is
    /// touched, so an unknown edge leaves the network unchanged.
    pub fn apply(&mut self, path: &[NodeId], amount: f64) -> Result<(), NetworkError> {
        let hops = path_edges(path)
            .map(|(from, to)| {
                self.channel_id(from, to)
                    .map(|id| (id, from))
                    .ok_or(NetworkError::NoSuchEdge { from, to })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (id, from) in hops {
            let channel = &mut self.channels[id];
            let to = if from == channel.low { channel.high } else { channel.low };
            *channel.balance_from_mut(from) -= amount;
            *channel.balance_from_mut(to) += amount;
        }
        Ok(())
    }

    /// Overwrite both balances of the channel `{saved.low, saved.high}` with
    /// a previously taken copy.
    pub fn restore_channel(&mut self, saved: &Channel) -> Result<(), NetworkError> {
        let id = self
            .channel_id(saved.low, saved.high)
            .ok_or(NetworkError::NoSuchEdge {
                from: saved.low,
                to: saved.high,
            })?;
        self.channels[id].forward_balance = saved.forward_balance;
        self.channels[id].reverse_balance = saved.reverse_balance;
        Ok(())
    }

    /// Multiply every directed balance by `factor`.
    pub fn scale_balances(&mut self, factor: f64) {
        for channel in &mut self.channels {
            channel.forward_balance *= factor;
            channel.reverse_balance *= factor;
        }
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.keys().copied()
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Sum of every directed balance in the network.
    pub fn total_balance(&self) -> f64 {
        self.channels.iter().map(Channel::capacity).sum()
    }

    /// Every directed edge with its balance, two entries per channel.
    pub fn directed_balances(&self) -> Vec<(DirectedEdge, f64)> {
        self.channels
            .iter()
            .flat_map(|c| {
                [
                    ((c.low, c.high), c.forward_balance),
                    ((c.high, c.low), c.reverse_balance),
                ]
            })
            .collect()
    }

    /// The undirected projection of the network, one edge per channel.
    pub fn to_undirected(&self) -> UndirectedGraph {
        let mut graph = UndirectedGraph::new();
        for (&node, nbrs) in &self.adjacency {
            graph.add_node(node);
            for &nbr in nbrs {
                graph.add_edge(node, nbr);
            }
        }
        graph
    }
}

impl Adjacency for CreditNetwork {
    fn neighbors(&self, node: NodeId) -> &[NodeId] {
        self.adjacency.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    fn contains_node(&self, node: NodeId) -> bool {
        self.adjacency.contains_key(&node)
    }
}
