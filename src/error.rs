use ethers::types::Address;

/// Errors surfaced by the routing engine and swap session.
///
/// Per-path failures (a missing pool, a reverted quote simulation) are
/// expected outcomes and never appear here; only an empty aggregate result or
/// a transaction-level failure escalates to the caller.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Token metadata could not be read and no cached or seeded entry exists.
    #[error("token metadata unavailable for {0:?}: {1}")]
    Resolution(Address, String),

    /// The request is malformed (identical tokens, zero amount, bad slippage).
    #[error("invalid swap request: {0}")]
    InvalidRequest(&'static str),

    /// No pool connects the two tokens under any discovery strategy.
    #[error("No routes found")]
    NoRoute,

    /// Candidate paths exist but every quote simulation failed.
    #[error("No valid quotes found")]
    NoValidQuote,

    /// The approval transaction was rejected or reverted.
    #[error("approval failed: {0}")]
    Approval(String),

    /// The swap transaction was rejected or reverted.
    #[error("swap failed: {0}")]
    Swap(String),

    /// RPC transport failure outside the per-path absorption rules.
    #[error("rpc error: {0}")]
    Rpc(String),
}

impl EngineError {
    /// Short human-readable message stored on the session `error` field.
    pub fn session_message(&self) -> String {
        self.to_string()
    }
}
