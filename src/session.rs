//! Session state machine: intake → pending → result | failed.
//!
//! ```text
//!   Intake --submit--> Pending --ok--> Result --reset--> Intake
//!      |                  \----err--> Failed --reset--> Intake
//!      \--select_history-----------> Result
//! ```
//!
//! The controller owns the only copy of the state behind a mutex and
//! publishes each change on a `watch` channel, so observers see transitions
//! and never intermediate values. While an analysis is in flight the state is
//! `Pending`, and `submit`, `select_history` and `reset` are all rejected.
//! That keeps a session at one outstanding request.

use std::sync::{Mutex, MutexGuard};

use tokio::sync::watch;

use crate::analysis_client::AnalysisClient;
use crate::history::{HistoryCache, HistoryError};
use crate::models::{AnalysisRequest, HistoryEntry};
use crate::store::KeyValueStore;

/// Shown when an in-flight analysis is abandoned by its caller.
pub const INTERRUPTED_MESSAGE: &str = "The analysis was interrupted before it completed.";

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Composing a new request.
    Intake,
    /// Waiting on the engine for `request`.
    Pending { request: AnalysisRequest },
    /// Showing a result, fresh or recalled from history.
    Result {
        entry: HistoryEntry,
        from_history: bool,
    },
    /// The last analysis failed; `message` is safe to show the user.
    Failed { message: String },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Intake => "intake",
            Self::Pending { .. } => "pending",
            Self::Result { .. } => "result",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn entry(&self) -> Option<&HistoryEntry> {
        match self {
            Self::Result { entry, .. } => Some(entry),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Describe your symptoms before submitting")]
    InvalidRequest,

    #[error("Cannot {event} while the session is {state}")]
    NotAccepting {
        event: &'static str,
        state: &'static str,
    },

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("Internal lock error")]
    LockPoisoned,
}

// ═══════════════════════════════════════════════════════════
// SessionController
// ═══════════════════════════════════════════════════════════

pub struct SessionController<C, S> {
    client: C,
    history: HistoryCache<S>,
    state: Mutex<SessionState>,
    published: watch::Sender<SessionState>,
}

impl<C: AnalysisClient, S: KeyValueStore> SessionController<C, S> {
    pub fn new(client: C, history: HistoryCache<S>) -> Self {
        let (published, _) = watch::channel(SessionState::Intake);
        Self {
            client,
            history,
            state: Mutex::new(SessionState::Intake),
            published,
        }
    }

    /// Start a session, loading history from `store`.
    pub fn start(client: C, store: S) -> Self {
        Self::new(client, HistoryCache::open(store))
    }

    pub fn state(&self) -> Result<SessionState, SessionError> {
        Ok(self.lock_state()?.clone())
    }

    /// Receive every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.published.subscribe()
    }

    /// Recent results, most recent first.
    pub fn history(&self) -> Result<Vec<HistoryEntry>, SessionError> {
        Ok(self.history.entries()?)
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Send `request` to the engine and wait for the outcome.
    ///
    /// Rejected without any network call if the narrative is blank or the
    /// session is not in `Intake`. Engine failures are not errors here: they
    /// land the session in `Failed`, and that state is returned.
    pub async fn submit(&self, request: AnalysisRequest) -> Result<SessionState, SessionError> {
        self.transition("submit", |state| match state {
            SessionState::Intake if !request.has_narrative() => Err(SessionError::InvalidRequest),
            SessionState::Intake => Ok((
                SessionState::Pending {
                    request: request.clone(),
                },
                (),
            )),
            other => Err(not_accepting("submit", other)),
        })?;
        tracing::info!(medications = request.medications.len(), "Analysis submitted");

        let pending = PendingGuard { session: Some(self) };
        let next = match self.client.analyze(&request).await {
            Ok(result) => {
                let entry = HistoryEntry::now(result);
                let entries = self.history.push(entry.clone())?;
                tracing::info!(
                    triage_level = %entry.result.triage_level,
                    history_len = entries.len(),
                    "Analysis complete"
                );
                SessionState::Result {
                    entry,
                    from_history: false,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Analysis failed");
                SessionState::Failed {
                    message: e.user_message().to_string(),
                }
            }
        };
        pending.finish(next.clone())?;
        Ok(next)
    }

    /// Show a stored result without contacting the engine.
    pub fn select_history(&self, index: usize) -> Result<HistoryEntry, SessionError> {
        self.transition("select history", |state| match state {
            SessionState::Intake => {
                let entry = self.history.select(index)?;
                Ok((
                    SessionState::Result {
                        entry: entry.clone(),
                        from_history: true,
                    },
                    entry,
                ))
            }
            other => Err(not_accepting("select history", other)),
        })
    }

    /// Return to `Intake`, discarding the shown result or error.
    /// A no-op in `Intake`; rejected while an analysis is in flight.
    pub fn reset(&self) -> Result<(), SessionError> {
        self.transition("reset", |state| match state {
            SessionState::Pending { .. } => Err(not_accepting("reset", state)),
            _ => Ok((SessionState::Intake, ())),
        })
    }

    // ── Internal ────────────────────────────────────────────

    /// Apply `step` to the current state under the lock. On success the new
    /// state is stored and published; on error nothing changes.
    fn transition<T>(
        &self,
        event: &'static str,
        step: impl FnOnce(&SessionState) -> Result<(SessionState, T), SessionError>,
    ) -> Result<T, SessionError> {
        let mut state = self.lock_state()?;
        let (next, value) = step(&state).inspect_err(|e| {
            tracing::debug!(event, state = state.name(), error = %e, "Transition rejected");
        })?;
        if *state != next {
            tracing::debug!(event, from = state.name(), to = next.name(), "Session transition");
            *state = next.clone();
            self.published.send_replace(next);
        }
        Ok(value)
    }

    fn replace_state(&self, next: SessionState) -> Result<(), SessionError> {
        let mut state = self.lock_state()?;
        tracing::debug!(from = state.name(), to = next.name(), "Session transition");
        *state = next.clone();
        self.published.send_replace(next);
        Ok(())
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, SessionState>, SessionError> {
        self.state.lock().map_err(|_| SessionError::LockPoisoned)
    }
}

fn not_accepting(event: &'static str, state: &SessionState) -> SessionError {
    SessionError::NotAccepting {
        event,
        state: state.name(),
    }
}

// ═══════════════════════════════════════════════════════════
// PendingGuard: leaves Pending even if the caller gives up
// ═══════════════════════════════════════════════════════════

/// Held while an analysis is in flight. If the `submit` future is dropped
/// before the engine answers, the guard moves the session to `Failed` so it
/// is never stuck in `Pending`.
struct PendingGuard<'a, C: AnalysisClient, S: KeyValueStore> {
    session: Option<&'a SessionController<C, S>>,
}

impl<C: AnalysisClient, S: KeyValueStore> PendingGuard<'_, C, S> {
    fn finish(mut self, next: SessionState) -> Result<(), SessionError> {
        match self.session.take() {
            Some(session) => session.replace_state(next),
            None => Ok(()),
        }
    }
}

impl<C: AnalysisClient, S: KeyValueStore> Drop for PendingGuard<'_, C, S> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::warn!("Analysis abandoned while pending");
            let failed = SessionState::Failed {
                message: INTERRUPTED_MESSAGE.to_string(),
            };
            if let Err(e) = session.replace_state(failed) {
                tracing::error!(error = %e, "Cannot leave pending state");
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
