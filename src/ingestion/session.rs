//! Single-owner session task: the only place overlay caches are mutated.
//!
//! All inputs (batched reads, live events, pending registrations, registry
//! changes) arrive as commands on one queue and are applied in order. After
//! every command the session reconciles and publishes a complete snapshot
//! through a `watch` channel.

use super::events::{apply_event, register_pending, EventContext, EventOutcome, PendingRegistration};
use crate::domain::{Address, Clock, PositionEvent, TimeMs, TokenPrices, TokenRegistry, U256};
use crate::engine::{
    DisplayOptions, Notification, NotificationLog, OverlayCaches, PositionQuery, PositionSnapshot,
    Reconciler,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const COMMAND_QUEUE_DEPTH: usize = 256;

#[derive(Debug)]
pub enum SessionCommand {
    /// Token set or metadata changed; rebuilds the query when slots differ.
    TokensUpdated(TokenRegistry),
    /// Fresh live prices for known tokens.
    PricesUpdated(Vec<TokenPrices>),
    /// Batched read result, tagged with the epoch it was requested in.
    ReadCompleted { epoch: u64, raw: Vec<U256> },
    Event(PositionEvent),
    RegisterPending(PendingRegistration),
    /// Active account (and optionally chain registry) changed.
    Reset {
        account: Option<Address>,
        registry: Option<TokenRegistry>,
    },
    /// Replies with the current epoch once every earlier command has been applied.
    Sync(oneshot::Sender<u64>),
    Shutdown,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("position session is closed")]
    Closed,
}

/// Everything a reader needs, published atomically after each command.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub epoch: u64,
    pub account: Option<Address>,
    pub registry: Arc<TokenRegistry>,
    pub query: Arc<PositionQuery>,
    pub snapshot: Arc<PositionSnapshot>,
    /// Whether a batched read has been applied in the current epoch.
    pub loaded: bool,
    pub pending_count: usize,
    pub updated_count: usize,
    pub notifications: Arc<Vec<Notification>>,
    pub computed_at: TimeMs,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub account: Option<Address>,
    pub registry: TokenRegistry,
    pub options: DisplayOptions,
    pub notification_retention: usize,
    /// How often to re-reconcile so expired overlays drop out without new input.
    pub expiry_tick: Duration,
}

pub struct PositionSession {
    account: Option<Address>,
    registry: Arc<TokenRegistry>,
    query: Arc<PositionQuery>,
    raw: Option<Vec<U256>>,
    overlays: OverlayCaches,
    notifications: NotificationLog,
    reconciler: Reconciler,
    clock: Arc<dyn Clock>,
    epoch: u64,
    snapshot: Arc<PositionSnapshot>,
    view_tx: watch::Sender<Arc<SessionView>>,
    expiry_tick: Duration,
}

impl PositionSession {
    pub fn new(config: SessionConfig, clock: Arc<dyn Clock>) -> (Self, watch::Receiver<Arc<SessionView>>) {
        let query = Arc::new(PositionQuery::build(&config.registry));
        let registry = Arc::new(config.registry);
        let now = clock.now();
        let initial = Arc::new(SessionView {
            epoch: 0,
            account: config.account,
            registry: registry.clone(),
            query: query.clone(),
            snapshot: Arc::new(PositionSnapshot::default()),
            loaded: false,
            pending_count: 0,
            updated_count: 0,
            notifications: Arc::new(Vec::new()),
            computed_at: now,
        });
        let (view_tx, view_rx) = watch::channel(initial);

        let session = Self {
            account: config.account,
            registry,
            query,
            raw: None,
            overlays: OverlayCaches::new(),
            notifications: NotificationLog::new(config.notification_retention),
            reconciler: Reconciler::new(config.options),
            clock,
            epoch: 0,
            snapshot: Arc::new(PositionSnapshot::default()),
            view_tx,
            expiry_tick: config.expiry_tick,
        };
        (session, view_rx)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn snapshot(&self) -> Arc<PositionSnapshot> {
        self.snapshot.clone()
    }

    /// Apply one command and republish. Returns `false` once the session should stop.
    pub fn handle(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::TokensUpdated(registry) => self.on_tokens(registry),
            SessionCommand::PricesUpdated(prices) => {
                self.registry = Arc::new(self.registry.with_prices(&prices));
            }
            SessionCommand::ReadCompleted { epoch, raw } => {
                if epoch != self.epoch {
                    debug!(
                        read_epoch = epoch,
                        current_epoch = self.epoch,
                        "Discarding position read from a previous epoch"
                    );
                    return true;
                }
                self.raw = Some(raw);
            }
            SessionCommand::Event(event) => self.on_event(event),
            SessionCommand::RegisterPending(registration) => {
                register_pending(registration, &mut self.overlays, self.clock.now());
            }
            SessionCommand::Reset { account, registry } => self.on_reset(account, registry),
            SessionCommand::Sync(reply) => {
                let _ = reply.send(self.epoch);
                return true;
            }
            SessionCommand::Shutdown => {
                info!("Position session shutting down");
                return false;
            }
        }

        self.recompute();
        true
    }

    fn on_tokens(&mut self, registry: TokenRegistry) {
        let query = PositionQuery::build(&registry);
        if query != *self.query {
            self.advance_epoch();
            info!(slots = query.len(), epoch = self.epoch, "Position query rebuilt");
            self.query = Arc::new(query);
            self.raw = None;
        }
        self.registry = Arc::new(registry);
    }

    fn on_reset(&mut self, account: Option<Address>, registry: Option<TokenRegistry>) {
        self.advance_epoch();
        self.account = account;
        self.raw = None;
        self.overlays.clear();
        if let Some(registry) = registry {
            self.query = Arc::new(PositionQuery::build(&registry));
            self.registry = Arc::new(registry);
        }
        self.snapshot = Arc::new(PositionSnapshot::default());
        info!(account = ?self.account, epoch = self.epoch, "Position session reset");
    }

    fn advance_epoch(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }

    fn on_event(&mut self, event: PositionEvent) {
        let ctx = EventContext {
            account: self.account.as_ref(),
            snapshot: &self.snapshot,
            registry: &self.registry,
            now: self.clock.now(),
        };
        let outcome = apply_event(&event, &ctx, &mut self.overlays, &mut self.notifications);
        match &outcome {
            EventOutcome::Malformed(reason) => {
                warn!(event = event.name(), reason = %reason, "Dropping malformed position event")
            }
            other => debug!(event = event.name(), outcome = ?other, "Position event applied"),
        }
    }

    /// Reconcile from current state and publish the view.
    pub fn recompute(&mut self) {
        let now = self.clock.now();
        let snapshot = self.reconciler.reconcile(
            &self.query,
            self.raw.as_deref(),
            &self.registry,
            self.account.as_ref(),
            &self.overlays,
            now,
        );
        self.snapshot = Arc::new(snapshot);

        let view = Arc::new(SessionView {
            epoch: self.epoch,
            account: self.account,
            registry: self.registry.clone(),
            query: self.query.clone(),
            snapshot: self.snapshot.clone(),
            loaded: self.raw.is_some(),
            pending_count: self.overlays.pending.valid_len(now),
            updated_count: self.overlays.updated.valid_len(now),
            notifications: Arc::new(self.notifications.notifications()),
            computed_at: now,
        });
        self.view_tx.send_replace(view);
    }

    /// Process commands until shutdown or until every handle is dropped.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        let mut ticker = tokio::time::interval(self.expiry_tick);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(command) => {
                            if !self.handle(command) {
                                break;
                            }
                        }
                        None => {
                            debug!("All session handles dropped");
                            break;
                        }
                    }
                }
                _ = ticker.tick() => self.recompute(),
            }
        }
    }
}

/// Cloneable front door to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    view: watch::Receiver<Arc<SessionView>>,
}

impl SessionHandle {
    pub async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }

    pub async fn ingest_event(&self, event: PositionEvent) -> Result<(), SessionError> {
        self.send(SessionCommand::Event(event)).await
    }

    pub async fn register_pending(&self, registration: PendingRegistration) -> Result<(), SessionError> {
        self.send(SessionCommand::RegisterPending(registration)).await
    }

    pub async fn reset(&self, account: Option<Address>) -> Result<(), SessionError> {
        self.send(SessionCommand::Reset {
            account,
            registry: None,
        })
        .await
    }

    /// Wait until every command sent before this call has been applied.
    pub async fn sync(&self) -> Result<u64, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Sync(reply)).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Shutdown).await
    }

    /// Latest published view.
    pub fn view(&self) -> Arc<SessionView> {
        self.view.borrow().clone()
    }

    /// Wait for the next published view.
    pub async fn changed(&mut self) -> Result<Arc<SessionView>, SessionError> {
        self.view.changed().await.map_err(|_| SessionError::Closed)?;
        Ok(self.view.borrow_and_update().clone())
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// Start a session task and return its handle.
pub fn spawn_session(config: SessionConfig, clock: Arc<dyn Clock>) -> (SessionHandle, JoinHandle<()>) {
    let (session, view) = PositionSession::new(config, clock);
    let (commands, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let task = tokio::spawn(session.run(rx));
    (SessionHandle { commands, view }, task)
}
