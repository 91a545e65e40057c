use std::sync::Arc;

use dashmap::DashMap;
use pcn_core::{search, CreditNetwork, NodeId, Path, Payment};

use crate::attempt::Attempt;
use crate::error::RoutingError;
use crate::outcome::{FailureReason, MessageCounts, RouteOutcome};
use crate::strategy::{precheck, RoutingStrategy};
use crate::waterfill::ALLOCATION_TOLERANCE;

/// Default number of paths cached per (source, destination) pair.
pub const DEFAULT_CACHED_PATHS: usize = 4;

/// Per-pair table of precomputed shortest simple paths.
///
/// Entries are computed on first use from the network topology and never
/// invalidated; balances are always read live. Pairs without any path are
/// not cached.
#[derive(Debug, Default)]
pub struct PathCache {
    table: DashMap<(NodeId, NodeId), Arc<Vec<Path>>>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached paths for `(src, dst)`, computing up to `k` of them on a miss.
    pub fn get_or_compute(
        &self,
        network: &CreditNetwork,
        src: NodeId,
        dst: NodeId,
        k: usize,
    ) -> Arc<Vec<Path>> {
        if let Some(paths) = self.table.get(&(src, dst)) {
            return Arc::clone(paths.value());
        }
        let paths = Arc::new(search::k_shortest_simple_paths(
            network,
            src,
            dst,
            k,
            |_, _| true,
        ));
        if !paths.is_empty() {
            self.table.insert((src, dst), Arc::clone(&paths));
            tracing::trace!(src, dst, paths = paths.len(), "path cache filled");
        }
        paths
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Optimistic routing over cached paths.
///
/// Each path is committed with whatever it can carry, one commit message
/// per hop. A path that cannot carry the whole remainder is also probed and
/// committed again, as the sender only learns the shortfall afterwards.
/// If the cached paths together fall short, every commit is rolled back.
pub(crate) fn route_cached(
    cache: &PathCache,
    network: &mut CreditNetwork,
    payment: &Payment,
    k: usize,
) -> Result<RouteOutcome, RoutingError> {
    let mut messages = MessageCounts::default();
    let paths = cache.get_or_compute(network, payment.src, payment.dst, k);
    if paths.is_empty() {
        return Ok(RouteOutcome::failed(FailureReason::NoPath, messages));
    }

    let mut attempt = Attempt::begin(network);
    let mut delivered = 0.0;
    for path in paths.iter() {
        let remaining = payment.amount - delivered;
        let capacity = attempt.capacity(path)?.max(0.0);
        let sent = capacity.min(remaining);

        messages.commit_path(path);
        if remaining > capacity {
            messages.probe_path(path);
            messages.commit_path(path);
        }
        attempt.commit(path, sent)?;
        delivered += sent;

        if capacity >= remaining {
            break;
        }
    }

    if delivered + ALLOCATION_TOLERANCE < payment.amount {
        attempt.rollback()?;
        tracing::debug!(
            src = payment.src,
            dst = payment.dst,
            delivered,
            amount = payment.amount,
            "cached paths fell short"
        );
        return Ok(RouteOutcome::failed(
            FailureReason::InsufficientCapacity,
            messages,
        ));
    }
    attempt.settle();
    Ok(RouteOutcome::delivered(payment.amount, messages))
}

/// The path-cache scheme on its own, for every payment size.
#[derive(Debug)]
pub struct PathCacheRouter {
    cache: PathCache,
    num_max_cache: usize,
}

impl PathCacheRouter {
    pub fn new(num_max_cache: usize) -> Self {
        Self {
            cache: PathCache::new(),
            num_max_cache,
        }
    }

    pub fn cache(&self) -> &PathCache {
        &self.cache
    }
}

impl Default for PathCacheRouter {
    fn default() -> Self {
        Self::new(DEFAULT_CACHED_PATHS)
    }
}

impl RoutingStrategy for PathCacheRouter {
    fn name(&self) -> &'static str {
        "path_cache"
    }

    fn route(
        &mut self,
        network: &mut CreditNetwork,
        payment: &Payment,
    ) -> Result<RouteOutcome, RoutingError> {
        if let Some(outcome) = precheck(network, payment)? {
            return Ok(outcome);
        }
        route_cached(&self.cache, network, payment, self.num_max_cache)
    }
}
