//! Per-conversation state and the session registry.
//!
//! A session carries at most one pending transaction, an optional account
//! and the attestation flag. [`ConversationSession::resolve`] decides how the
//! next message is consumed; the router acts on the returned [`Turn`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::chain::{Account, TransferTx};

/// Session id used when a client does not supply one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// A transfer awaiting confirmation.
///
/// Confirmation is the byte-exact resend of `triggering_message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub triggering_message: String,
    pub transaction: TransferTx,
}

/// How the router consumes a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn<'a> {
    /// Command text with the prefix stripped.
    Command(&'a str),
    /// Confirms the pending transaction.
    Confirm,
    /// Answers the attestation challenge with a nonce.
    Nonce,
    /// Needs intent classification.
    Classify,
}

/// State of one conversation.
#[derive(Debug)]
pub struct ConversationSession {
    id: String,
    account: Option<Account>,
    pending_tx: Option<PendingTransaction>,
    awaiting_nonce: bool,
    turns: u64,
}

impl ConversationSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            account: None,
            pending_tx: None,
            awaiting_nonce: false,
            turns: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of messages resolved in this session.
    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// Decide how `message` is consumed. First match wins:
    /// command, confirmation, nonce answer, classification.
    pub fn resolve<'a>(&mut self, message: &'a str, command_prefix: &str) -> Turn<'a> {
        self.turns += 1;
        if let Some(command) = message.strip_prefix(command_prefix) {
            return Turn::Command(command);
        }
        if self
            .pending_tx
            .as_ref()
            .is_some_and(|pending| pending.triggering_message == message)
        {
            return Turn::Confirm;
        }
        if self.awaiting_nonce {
            return Turn::Nonce;
        }
        Turn::Classify
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    pub fn set_account(&mut self, account: Account) {
        self.account = Some(account);
    }

    /// Number of transactions awaiting confirmation (0 or 1).
    pub fn pending_count(&self) -> usize {
        usize::from(self.pending_tx.is_some())
    }

    /// Store a new pending transaction. A previous unconfirmed one is dropped.
    pub fn set_pending_tx(&mut self, pending: PendingTransaction) {
        if let Some(previous) = self.pending_tx.replace(pending) {
            tracing::debug!(
                session_id = %self.id,
                dropped = %previous.triggering_message,
                "replaced unconfirmed transaction"
            );
        }
    }

    pub fn take_pending_tx(&mut self) -> Option<PendingTransaction> {
        self.pending_tx.take()
    }

    pub fn awaiting_nonce(&self) -> bool {
        self.awaiting_nonce
    }

    /// Mark that the next message answers an attestation challenge.
    pub fn expect_nonce(&mut self) {
        self.awaiting_nonce = true;
    }

    /// Clear the attestation flag, returning its previous value.
    pub fn take_nonce_flag(&mut self) -> bool {
        std::mem::take(&mut self.awaiting_nonce)
    }

    /// Drop the pending transaction and the account. The attestation flag
    /// is left as-is.
    pub fn reset(&mut self) {
        self.pending_tx = None;
        self.account = None;
    }
}

/// Idle time after which a session is dropped, unless configured otherwise.
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 3600);

struct SessionSlot {
    session: Arc<Mutex<ConversationSession>>,
    /// Milliseconds since the manager's epoch at the last lookup.
    last_active_ms: AtomicU64,
}

/// Registry of live sessions.
///
/// Each session sits behind its own mutex: messages of one session are
/// processed one at a time, distinct sessions run concurrently. Sessions
/// not looked up for longer than the idle timeout are dropped by
/// [`SessionManager::prune_idle`].
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionSlot>>,
    idle_timeout: Duration,
    epoch: Instant,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
            epoch: Instant::now(),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Get the session for `session_id`, creating it on first use.
    pub async fn get_or_create_session(&self, session_id: &str) -> Arc<Mutex<ConversationSession>> {
        let now = self.now_ms();
        {
            let sessions = self.sessions.read().await;
            if let Some(slot) = sessions.get(session_id) {
                slot.last_active_ms.store(now, Ordering::Relaxed);
                return Arc::clone(&slot.session);
            }
        }

        let mut sessions = self.sessions.write().await;
        let slot = sessions.entry(session_id.to_string()).or_insert_with(|| {
            tracing::debug!(session_id, "created session");
            SessionSlot {
                session: Arc::new(Mutex::new(ConversationSession::new(session_id))),
                last_active_ms: AtomicU64::new(now),
            }
        });
        slot.last_active_ms.store(now, Ordering::Relaxed);
        Arc::clone(&slot.session)
    }

    pub async fn remove_session(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle for longer than the idle timeout. Sessions still
    /// held by a caller are kept. Returns the number removed.
    pub async fn prune_idle(&self) -> usize {
        let cutoff = u64::try_from(self.idle_timeout.as_millis()).unwrap_or(u64::MAX);
        let now = self.now_ms();
        let expired: Vec<String> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .filter(|(_, slot)| {
                    now.saturating_sub(slot.last_active_ms.load(Ordering::Relaxed)) > cutoff
                        && Arc::strong_count(&slot.session) == 1
                })
                .map(|(id, _)| id.clone())
                .collect()
        };

        let mut removed = 0;
        for session_id in expired {
            if self.remove_session(&session_id).await {
                tracing::info!(session_id = %session_id, "pruned idle session");
                removed += 1;
            }
        }
        removed
    }

    /// Prune idle sessions every `every` until the manager is dropped.
    pub fn spawn_idle_pruner(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(manager) = weak.upgrade() else {
                    break;
                };
                let removed = manager.prune_idle().await;
                if removed > 0 {
                    let remaining = manager.session_count().await;
                    tracing::debug!(removed, remaining, "session prune");
                }
            }
        })
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
