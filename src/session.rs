//! # Swap Session
//!
//! The orchestrator state machine that drives one swap intent:
//! `idle → loading-routes → quoting → ready → [approving →] swapping →
//! success`, with `error` reachable from any state. State is published on a
//! `watch` channel so subscribers see every transition without polling.
//!
//! Freshness and cancellation rules:
//! - a new chain block re-quotes a `ready` session automatically, never one
//!   with a transaction in flight;
//! - at most one refresh cycle runs at a time, extra triggers are coalesced;
//! - every cycle is stamped with the request generation that started it, and
//!   results arriving after the inputs changed are discarded.

use chrono::Utc;
use ethers::types::H256;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;

use crate::adapters::{PathSwap, SingleSwap, SwapExecutor};
use crate::engine::RouteEngine;
use crate::error::EngineError;
use crate::metrics;
use crate::types::{CandidatePath, Route, SwapRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwapStatus {
    #[default]
    Idle,
    LoadingRoutes,
    Quoting,
    Ready,
    Approving,
    Swapping,
    Success,
    Error,
}

impl std::fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SwapStatus::Idle => "idle",
            SwapStatus::LoadingRoutes => "loading-routes",
            SwapStatus::Quoting => "quoting",
            SwapStatus::Ready => "ready",
            SwapStatus::Approving => "approving",
            SwapStatus::Swapping => "swapping",
            SwapStatus::Success => "success",
            SwapStatus::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// Observable snapshot of a session. Cloned out of the watch channel.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub status: SwapStatus,
    pub routes: Vec<Route>,
    /// Index into `routes`; the top-ranked route unless overridden.
    pub selected: Option<usize>,
    pub error: Option<String>,
    pub transaction_hash: Option<H256>,
}

impl SessionState {
    pub fn selected_route(&self) -> Option<&Route> {
        self.selected.and_then(|i| self.routes.get(i))
    }
}

pub struct SwapSession {
    engine: Arc<RouteEngine>,
    executor: Arc<dyn SwapExecutor>,
    state: watch::Sender<SessionState>,
    request: RwLock<Option<SwapRequest>>,
    /// Bumped whenever the request changes; cycles stamped with an older
    /// generation discard their results.
    generation: AtomicU64,
    refresh_in_flight: AtomicBool,
}

impl SwapSession {
    pub fn new(engine: Arc<RouteEngine>, executor: Arc<dyn SwapExecutor>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            engine,
            executor,
            state,
            request: RwLock::new(None),
            generation: AtomicU64::new(0),
            refresh_in_flight: AtomicBool::new(false),
        }
    }

    /// Subscribes to state transitions; the receiver always starts with the
    /// current snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> SwapStatus {
        self.state.borrow().status
    }

    fn publish(&self, status: SwapStatus, f: impl FnOnce(&mut SessionState)) {
        self.state.send_modify(|s| {
            s.status = status;
            f(s);
        });
        metrics::increment_session_transition(&status.to_string());
    }

    /// Applies a quoting-cycle transition only while it is still current:
    /// same request generation, and no approval or swap in flight.
    fn publish_if_current(&self, gen: u64, status: SwapStatus, f: impl FnOnce(&mut SessionState)) -> bool {
        if self.generation.load(Ordering::SeqCst) != gen {
            debug!("discarding stale cycle result for generation {gen}");
            return false;
        }
        let mut applied = false;
        self.state.send_modify(|s| {
            if matches!(
                s.status,
                SwapStatus::Approving | SwapStatus::Swapping | SwapStatus::Success
            ) {
                return;
            }
            s.status = status;
            f(s);
            applied = true;
        });
        if applied {
            metrics::increment_session_transition(&status.to_string());
        }
        applied
    }

    /// Issues a new swap intent and runs a quoting cycle for it. Any cycle
    /// still in flight for the previous inputs is invalidated.
    pub async fn set_request(&self, request: SwapRequest) {
        let gen = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.request.write().await = Some(request);
        // A new intent supersedes whatever the session was showing.
        self.publish(SwapStatus::LoadingRoutes, |s| {
            s.routes.clear();
            s.selected = None;
            s.error = None;
            s.transaction_hash = None;
        });
        self.run_cycle(gen).await;
    }

    /// Re-quotes the current request. Triggers arriving while a refresh is
    /// already running are coalesced rather than queued.
    pub async fn refresh(&self) {
        if self
            .refresh_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("refresh already in flight, coalescing");
            return;
        }
        let gen = self.generation.load(Ordering::SeqCst);
        if self.request.read().await.is_some() {
            self.run_cycle(gen).await;
        }
        self.refresh_in_flight.store(false, Ordering::SeqCst);
    }

    async fn run_cycle(&self, gen: u64) {
        let Some(request) = self.request.read().await.clone() else {
            return;
        };

        if !self.publish_if_current(gen, SwapStatus::LoadingRoutes, |s| {
            s.error = None;
        }) {
            return;
        }

        let candidates = match self.engine.discover(&request).await {
            Ok(candidates) => candidates,
            Err(e) => {
                self.fail_cycle(gen, e);
                return;
            }
        };

        if !self.publish_if_current(gen, SwapStatus::Quoting, |_| {}) {
            return;
        }

        match self.engine.quote_and_rank(&request, candidates).await {
            Ok(routes) => {
                self.publish_if_current(gen, SwapStatus::Ready, |s| {
                    s.routes = routes;
                    s.selected = Some(0);
                    s.error = None;
                });
            }
            Err(e) => self.fail_cycle(gen, e),
        }
    }

    fn fail_cycle(&self, gen: u64, error: EngineError) {
        warn!("quote cycle failed: {error}");
        self.publish_if_current(gen, SwapStatus::Error, |s| {
            s.routes.clear();
            s.selected = None;
            s.error = Some(error.session_message());
        });
    }

    /// Overrides the automatic top-ranked selection.
    pub fn select_route(&self, index: usize) -> Result<(), EngineError> {
        let mut ok = false;
        self.state.send_modify(|s| {
            if s.status == SwapStatus::Ready && index < s.routes.len() {
                s.selected = Some(index);
                ok = true;
            }
        });
        if ok {
            Ok(())
        } else {
            Err(EngineError::InvalidRequest("no such route to select"))
        }
    }

    /// Ensures the router can spend `amount_in`. Returns `None` when the
    /// existing allowance already covers it and no transaction was sent.
    pub async fn approve(&self) -> Result<Option<H256>, EngineError> {
        let request = self.current_request_for_action().await?;
        let owner = self.executor.owner();
        let spender = self.executor.spender();

        let allowance = self
            .executor
            .allowance(request.token_in, owner, spender)
            .await
            .map_err(|e| EngineError::Approval(e.to_string()))?;
        if allowance >= request.amount_in {
            debug!("allowance {allowance} already covers {}", request.amount_in);
            return Ok(None);
        }

        self.publish(SwapStatus::Approving, |_| {});
        match self
            .executor
            .approve(request.token_in, spender, request.amount_in)
            .await
        {
            Ok(hash) => {
                info!("approval mined: {hash:?}");
                self.publish(SwapStatus::Ready, |_| {});
                Ok(Some(hash))
            }
            Err(e) => {
                let err = EngineError::Approval(e.to_string());
                self.publish(SwapStatus::Error, |s| {
                    s.error = Some(err.session_message());
                });
                Err(err)
            }
        }
    }

    /// Executes the selected route: approval first when the allowance falls
    /// short, then the swap itself. Only callable from `ready`.
    pub async fn swap(&self) -> Result<H256, EngineError> {
        let request = self.current_request_for_action().await?;
        let route = self
            .snapshot()
            .selected_route()
            .cloned()
            .ok_or(EngineError::InvalidRequest("no selected route"))?;

        let owner = self.executor.owner();
        let spender = self.executor.spender();
        let allowance = self
            .executor
            .allowance(request.token_in, owner, spender)
            .await
            .map_err(|e| EngineError::Approval(e.to_string()))?;

        if allowance < request.amount_in {
            self.publish(SwapStatus::Approving, |_| {});
            if let Err(e) = self
                .executor
                .approve(request.token_in, spender, request.amount_in)
                .await
            {
                let err = EngineError::Approval(e.to_string());
                self.publish(SwapStatus::Error, |s| {
                    s.error = Some(err.session_message());
                });
                return Err(err);
            }
        }

        let amount_out_minimum = request.amount_out_minimum(route.amount_out);
        debug_assert!(amount_out_minimum <= route.amount_out);
        let deadline = request.deadline_from(Utc::now().timestamp() as u64);

        self.publish(SwapStatus::Swapping, |_| {});
        let sent = match &route.candidate {
            CandidatePath::SingleHop {
                token_in,
                token_out,
                fee,
            } => {
                self.executor
                    .swap_single(SingleSwap {
                        token_in: *token_in,
                        token_out: *token_out,
                        fee: *fee,
                        recipient: request.recipient,
                        deadline,
                        amount_in: request.amount_in,
                        amount_out_minimum,
                    })
                    .await
            }
            path @ CandidatePath::MultiHop { .. } => {
                self.executor
                    .swap_path(PathSwap {
                        path: path.encode(),
                        recipient: request.recipient,
                        deadline,
                        amount_in: request.amount_in,
                        amount_out_minimum,
                    })
                    .await
            }
        };

        match sent {
            Ok(hash) => {
                info!("swap mined: {hash:?}");
                self.publish(SwapStatus::Success, |s| {
                    s.transaction_hash = Some(hash);
                    s.error = None;
                });
                Ok(hash)
            }
            Err(e) => {
                let err = EngineError::Swap(e.to_string());
                self.publish(SwapStatus::Error, |s| {
                    s.error = Some(err.session_message());
                });
                Err(err)
            }
        }
    }

    /// Unconditionally back to `idle`, clearing routes, errors and the
    /// current request.
    pub async fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.request.write().await = None;
        self.publish(SwapStatus::Idle, |s| {
            s.routes.clear();
            s.selected = None;
            s.error = None;
            s.transaction_hash = None;
        });
    }

    async fn current_request_for_action(&self) -> Result<SwapRequest, EngineError> {
        if self.status() != SwapStatus::Ready {
            return Err(EngineError::InvalidRequest("session is not ready"));
        }
        self.request
            .read()
            .await
            .clone()
            .ok_or(EngineError::InvalidRequest("no active request"))
    }

    /// Listens to the block feed and re-quotes a `ready` session on every new
    /// block. A session with a transaction in flight is left alone.
    pub fn spawn_block_refresh(
        self: &Arc<Self>,
        mut blocks: broadcast::Receiver<u64>,
    ) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match blocks.recv().await {
                    Ok(block) => {
                        if session.status() == SwapStatus::Ready {
                            debug!("block {block}: refreshing ready session");
                            session.refresh().await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("block feed lagged by {skipped}, continuing");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
