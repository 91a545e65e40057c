//! PCN Routing — strategies that turn a payment into settled flow on a
//! [`CreditNetwork`](pcn_core::CreditNetwork).
//!
//! This crate provides:
//! - [`RoutingStrategy`] — the common interface every scheme implements.
//! - [`Attempt`] — the commit log that makes a failed payment leave no trace.
//! - [`water_fill`] and [`drain_largest`] — multi-path amount allocators.
//! - Strategies: [`ShortestPath`], [`Lnd`], [`MaxFlow`], [`Spider`],
//!   [`PathCacheRouter`], [`Flash`], [`SpeedyMurmurs`] and [`SegFlow`].
//! - [`StrategyConfig`] — serde-friendly strategy selection and parameters.
//! - [`run_payments`] — the sequential runner producing [`RunStats`].

pub mod attempt;
pub mod config;
pub mod error;
pub mod flash;
pub mod landmark;
pub mod lnd;
pub mod max_flow;
pub mod outcome;
pub mod path_cache;
pub mod runner;
pub mod segflow;
pub mod shortest_path;
pub mod spider;
pub mod strategy;
pub mod waterfill;
pub mod yen;

pub use attempt::Attempt;
pub use config::StrategyConfig;
pub use error::RoutingError;
pub use flash::{percentile_threshold, Flash};
pub use landmark::SpeedyMurmurs;
pub use lnd::Lnd;
pub use max_flow::{augmenting_paths, FlowProbe, MaxFlow};
pub use outcome::{FailureReason, MessageCounts, RouteOutcome, RouteScope, RouteStatus};
pub use path_cache::{PathCache, PathCacheRouter};
pub use runner::{run_payments, RunStats};
pub use segflow::{Hierarchy, SegFlow};
pub use shortest_path::ShortestPath;
pub use spider::Spider;
pub use strategy::RoutingStrategy;
pub use waterfill::{drain_largest, water_fill, ALLOCATION_TOLERANCE};
