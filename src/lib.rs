//! # Swap Router SDK
//!
//! A high-performance Rust library for swap route discovery, quoting and
//! execution over concentrated-liquidity pools. Given two tokens and an
//! input amount, the SDK finds every viable trade path through the pool
//! network, quotes each path against the on-chain quoter, ranks paths by net
//! proceeds after gas, and drives the approval-then-swap workflow while
//! keeping quotes fresh as new blocks arrive.
//!
//! ## Overview
//!
//! The SDK separates the routing core from chain access:
//!
//! - **Discovery**: direct, two-hop and three-hop candidate paths over a
//!   fixed fee-tier set and common base tokens
//! - **Quoting**: concurrent per-path simulation with price impact and gas
//!   estimates; failing paths are dropped, never the cycle
//! - **Ranking**: net-of-gas ordering with gas priced in output-token terms
//! - **Session**: an observable state machine driving approval and execution
//!
//! ## Architecture
//!
//! Chain access goes through the adapter traits in [`adapters`]; the stock
//! implementation binds a Uniswap V3 factory, QuoterV2 and SwapRouter via
//! any ethers middleware. Everything above the traits is chain-agnostic and
//! fully testable in memory.

// Core Types
/// Data model: tokens, pools, paths, quotes, routes, requests
pub mod types;
/// Error taxonomy surfaced to callers
pub mod error;

// Chain Access
/// Collaborator traits and the Uniswap V3 implementation
pub mod adapters;
/// Smart contract ABIs (read-only plus router/approve execution)
pub mod contracts;

// Routing Core
/// Candidate path enumeration
pub mod discovery;
/// Per-path quote simulation and price impact
pub mod quoting;
/// Net-of-gas ranking
pub mod ranking;
/// One quoting cycle end to end
pub mod engine;

// Session & Freshness
/// The swap orchestrator state machine
pub mod session;
/// New-block feed driving automatic re-quotes
pub mod block_watcher;

// Shared State
/// Token metadata resolution and caching
pub mod token_resolver;

// Utilities
/// Q96 spot-price math
pub mod v3_math;
/// Metrics and observability
pub mod metrics;

// Settings & Configuration
/// Configuration management
pub mod settings;

// Re-exports for convenience
pub use adapters::UniswapV3Adapter;
pub use engine::RouteEngine;
pub use error::EngineError;
pub use session::{SessionState, SwapSession, SwapStatus};
pub use settings::Settings;
pub use token_resolver::TokenResolver;
pub use types::{Route, SwapRequest};
