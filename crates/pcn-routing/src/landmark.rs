//! Landmark-coordinate greedy forwarding (SpeedyMurmurs).
//!
//! Every landmark roots a spanning tree of the network. A node's coordinate
//! in a tree is the list of child indices leading to it from the root, and
//! the distance between two nodes is the tree distance implied by their
//! common prefix. Payments are split into one share per landmark and each
//! share is forwarded greedily towards the destination's coordinate.
//! Channels that become exhausted or newly usable trigger a local
//! re-embedding instead of a rebuild of every tree.

use std::collections::{HashMap, VecDeque};

use pcn_core::{Adjacency, CreditNetwork, DirectedEdge, NodeId, Path, Payment, BALANCE_EPSILON};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::attempt::Attempt;
use crate::error::RoutingError;
use crate::outcome::{hops, FailureReason, MessageCounts, RouteOutcome};
use crate::strategy::{precheck, RoutingStrategy};

/// Default number of landmarks.
pub const DEFAULT_LANDMARKS: usize = 3;

fn positive(network: &CreditNetwork, from: NodeId, to: NodeId) -> bool {
    network
        .balance(from, to)
        .is_ok_and(|b| b > BALANCE_EPSILON)
}

/// One landmark's spanning tree.
#[derive(Debug, Clone)]
struct Embedding {
    root: NodeId,
    coords: HashMap<NodeId, Vec<u32>>,
    parent: HashMap<NodeId, NodeId>,
    /// Next child index per node. Indices are never handed out twice.
    next_child: HashMap<NodeId, u32>,
}

impl Embedding {
    fn new(root: NodeId, network: &CreditNetwork) -> Self {
        let mut embedding = Self {
            root,
            coords: HashMap::new(),
            parent: HashMap::new(),
            next_child: HashMap::new(),
        };
        embedding.assign(network);
        embedding
    }

    /// Give a coordinate to every reachable node that lacks one.
    ///
    /// The first pass only follows channels with balance in both directions,
    /// the second follows any channel with balance in at least one. Both
    /// passes start from every node that already has a coordinate, shallow
    /// nodes first.
    fn assign(&mut self, network: &CreditNetwork) {
        self.coords.entry(self.root).or_default();
        for bidirectional in [true, false] {
            let mut seeds: Vec<(usize, NodeId)> =
                self.coords.iter().map(|(&n, c)| (c.len(), n)).collect();
            seeds.sort_unstable();
            let mut queue: VecDeque<NodeId> = seeds.into_iter().map(|(_, n)| n).collect();

            while let Some(node) = queue.pop_front() {
                let Some(base) = self.coords.get(&node).cloned() else {
                    continue;
                };
                for &nbr in network.neighbors(node) {
                    if self.coords.contains_key(&nbr) {
                        continue;
                    }
                    let usable = if bidirectional {
                        positive(network, node, nbr) && positive(network, nbr, node)
                    } else {
                        positive(network, node, nbr) || positive(network, nbr, node)
                    };
                    if !usable {
                        continue;
                    }
                    let index = self.next_child.entry(node).or_insert(0);
                    *index += 1;
                    let mut coord = base.clone();
                    coord.push(*index);
                    self.coords.insert(nbr, coord);
                    self.parent.insert(nbr, node);
                    queue.push_back(nbr);
                }
            }
        }
    }

    fn coordinate(&self, node: NodeId) -> Option<&[u32]> {
        self.coords.get(&node).map(Vec::as_slice)
    }

    /// Tree distance `|a| + |b| - 2 * common_prefix`; `None` when either
    /// node has no coordinate.
    fn distance(&self, a: NodeId, b: NodeId) -> Option<usize> {
        let ca = self.coords.get(&a)?;
        let cb = self.coords.get(&b)?;
        let common = ca.iter().zip(cb).take_while(|(x, y)| x == y).count();
        Some(ca.len() + cb.len() - 2 * common)
    }

    /// Whether the link from `node` to its tree parent carries balance both
    /// ways. The root counts as firmly attached.
    fn parent_link_bidirectional(&self, network: &CreditNetwork, node: NodeId) -> bool {
        if node == self.root {
            return true;
        }
        match self.parent.get(&node) {
            Some(&p) => positive(network, node, p) && positive(network, p, node),
            None => false,
        }
    }

    /// React to `from -> to` moving from balance `old` to `new`.
    fn on_balance_change(&mut self, network: &CreditNetwork, from: NodeId, to: NodeId, old: f64, new: f64) {
        let mut reset = None;

        if old <= BALANCE_EPSILON && new > BALANCE_EPSILON {
            let has_from = self.coords.contains_key(&from);
            let has_to = self.coords.contains_key(&to);
            if has_from && !has_to {
                reset = Some(to);
            } else if has_to && !has_from {
                reset = Some(from);
            } else if positive(network, from, to) && positive(network, to, from) {
                let weak_from = !self.parent_link_bidirectional(network, from);
                let weak_to = !self.parent_link_bidirectional(network, to);
                if weak_from && !weak_to {
                    reset = Some(from);
                } else if weak_to && !weak_from {
                    reset = Some(to);
                }
            }
        }

        if old > BALANCE_EPSILON && new <= BALANCE_EPSILON {
            if self.parent.get(&from) == Some(&to) {
                reset = Some(from);
            }
            if self.parent.get(&to) == Some(&from) {
                reset = Some(to);
            }
        }

        if let Some(node) = reset {
            self.reset(network, node);
        }
    }

    /// Clear `node` and every descendant, then re-embed them.
    fn reset(&mut self, network: &CreditNetwork, node: NodeId) {
        if let Some(prefix) = self.coords.get(&node).cloned() {
            let cleared: Vec<NodeId> = self
                .coords
                .iter()
                .filter(|(_, c)| c.starts_with(&prefix))
                .map(|(&n, _)| n)
                .collect();
            for n in &cleared {
                self.coords.remove(n);
                self.parent.remove(n);
            }
            tracing::trace!(root = self.root, node, cleared = cleared.len(), "coordinates reset");
        }
        self.assign(network);
    }
}

/// Split `amount` into `parts` random shares that sum to it.
fn random_split(amount: f64, parts: usize, rng: &mut StdRng) -> Vec<f64> {
    let mut points: Vec<f64> = (1..parts).map(|_| rng.gen_range(0.0..amount)).collect();
    points.sort_by(f64::total_cmp);
    let mut shares = Vec::with_capacity(parts);
    let mut last = 0.0;
    for p in points {
        shares.push(p - last);
        last = p;
    }
    shares.push(amount - last);
    shares
}

/// Landmark routing with on-demand re-embedding.
///
/// Embeddings are computed for the network passed to [`SpeedyMurmurs::new`]
/// and kept in step with it as payments settle, so the same network must be
/// passed to every `route` call.
#[derive(Debug)]
pub struct SpeedyMurmurs {
    landmarks: Vec<NodeId>,
    embeddings: Vec<Embedding>,
    rng: StdRng,
}

impl SpeedyMurmurs {
    pub fn new(network: &CreditNetwork, landmarks: usize, seed: u64) -> Result<Self, RoutingError> {
        if landmarks == 0 {
            return Err(RoutingError::InvalidConfig {
                reason: "speedy_murmurs needs at least one landmark".into(),
            });
        }
        let mut by_degree: Vec<NodeId> = network.nodes().collect();
        by_degree.sort_by(|a, b| network.degree(*b).cmp(&network.degree(*a)).then(a.cmp(b)));
        by_degree.truncate(landmarks);

        let embeddings = by_degree
            .iter()
            .map(|&root| Embedding::new(root, network))
            .collect();
        tracing::debug!(landmarks = ?by_degree, "landmark trees embedded");

        Ok(Self {
            landmarks: by_degree,
            embeddings,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn landmarks(&self) -> &[NodeId] {
        &self.landmarks
    }

    /// Coordinate of `node` in the tree of landmark `index`.
    pub fn coordinate(&self, index: usize, node: NodeId) -> Option<&[u32]> {
        self.embeddings.get(index)?.coordinate(node)
    }

    /// Closest neighbour of `node` that is strictly closer to `dst` in tree
    /// `index` and can carry `share`.
    fn next_hop(
        &self,
        index: usize,
        network: &CreditNetwork,
        node: NodeId,
        dst: NodeId,
        share: f64,
    ) -> Option<NodeId> {
        let embedding = &self.embeddings[index];
        let current = embedding.distance(node, dst)?;
        let mut best: Option<(usize, NodeId)> = None;
        for &nbr in network.neighbors(node) {
            let Some(d) = embedding.distance(nbr, dst) else {
                continue;
            };
            if d >= current || network.balance(node, nbr).map_or(true, |b| b < share) {
                continue;
            }
            if best.map_or(true, |(bd, _)| d < bd) {
                best = Some((d, nbr));
            }
        }
        best.map(|(_, n)| n)
    }
}

impl RoutingStrategy for SpeedyMurmurs {
    fn name(&self) -> &'static str {
        "speedy_murmurs"
    }

    fn route(
        &mut self,
        network: &mut CreditNetwork,
        payment: &Payment,
    ) -> Result<RouteOutcome, RoutingError> {
        if let Some(outcome) = precheck(network, payment)? {
            return Ok(outcome);
        }
        let mut messages = MessageCounts::default();
        let shares = random_split(payment.amount, self.landmarks.len(), &mut self.rng);

        let mut touched: Vec<DirectedEdge> = Vec::new();
        let mut before: HashMap<DirectedEdge, f64> = HashMap::new();
        let mut walked: Vec<Path> = Vec::new();
        let mut attempt = Attempt::begin(network);
        let mut stuck = false;

        'shares: for (index, &share) in shares.iter().enumerate() {
            let mut path = vec![payment.src];
            let mut node = payment.src;
            while node != payment.dst {
                let Some(next) = self.next_hop(index, attempt.network(), node, payment.dst, share)
                else {
                    walked.push(path);
                    stuck = true;
                    break 'shares;
                };
                for edge in [(node, next), (next, node)] {
                    if !before.contains_key(&edge) {
                        before.insert(edge, attempt.balance(edge.0, edge.1)?);
                        touched.push(edge);
                    }
                }
                attempt.commit(&[node, next], share)?;
                path.push(next);
                node = next;
            }
            walked.push(path);
        }

        if stuck {
            attempt.rollback()?;
            messages.probe = walked.iter().map(|p| hops(p)).sum();
            tracing::debug!(
                src = payment.src,
                dst = payment.dst,
                amount = payment.amount,
                "greedy forwarding stuck"
            );
            return Ok(RouteOutcome::failed(
                FailureReason::NoForwardingCandidate,
                messages,
            ));
        }
        attempt.settle();

        for path in &walked {
            messages.probe_path(path);
            messages.commit_path(path);
        }
        for (from, to) in touched {
            let new = network.balance(from, to)?;
            let old = before[&(from, to)];
            for embedding in &mut self.embeddings {
                embedding.on_balance_change(network, from, to, old, new);
            }
        }
        Ok(RouteOutcome::delivered(payment.amount, messages))
    }
}
