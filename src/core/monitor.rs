use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::credentials::CredentialProvider;
use crate::core::error::UsageError;
use crate::core::fetcher::UsageFetching;
use crate::core::models::credentials::Credentials;
use crate::core::models::usage::UsageResponse;
use crate::core::view::ViewState;

/// What a call to [`UsageMonitor::refresh`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// A refresh was already in flight; nothing happened.
    Skipped,
    Updated,
    Failed(UsageError),
}

/// Owns the credential cache, the fetcher and the latest view state.
///
/// At most one refresh runs at a time; extra triggers are dropped, not queued.
pub struct UsageMonitor<C, F> {
    credentials: C,
    fetcher: F,
    state: Mutex<ViewState>,
    in_flight: AtomicBool,
    /// Bumped after every completed refresh
    updates: watch::Sender<u64>,
}

/// Ends a refresh: clears the loading state and the in-flight flag, also when
/// the refresh future is dropped mid-request by poll teardown.
struct FlightGuard<'a> {
    in_flight: &'a AtomicBool,
    state: &'a Mutex<ViewState>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.is_loading = false;
        }
        self.in_flight.store(false, Ordering::Release);
    }
}

impl<C, F> UsageMonitor<C, F>
where
    C: CredentialProvider,
    F: UsageFetching,
{
    pub fn new(credentials: C, fetcher: F) -> Self {
        Self {
            credentials,
            fetcher,
            state: Mutex::new(ViewState::default()),
            in_flight: AtomicBool::new(false),
            updates: watch::channel(0).0,
        }
    }

    /// Receiver that changes each time a refresh finishes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.updates.subscribe()
    }

    fn lock_state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of the current view state.
    pub fn state(&self) -> ViewState {
        self.lock_state().clone()
    }

    #[cfg(test)]
    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub fn credentials(&self) -> &C {
        &self.credentials
    }

    /// Run one fetch cycle unless one is already running.
    pub async fn refresh(&self) -> RefreshOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("refresh already in flight, skipping");
            return RefreshOutcome::Skipped;
        }
        let _guard = FlightGuard {
            in_flight: &self.in_flight,
            state: &self.state,
        };

        {
            let mut state = self.lock_state();
            state.is_loading = true;
            state.error = None;
        }

        let result = self.fetch_cycle().await;

        // State lock is released before `_guard` takes it again on drop.
        let outcome = {
            let mut state = self.lock_state();
            state.is_loading = false;
            match result {
                Ok(response) => {
                    state.response = Some(response);
                    state.last_updated = Some(Utc::now());
                    debug!("usage refreshed");
                    RefreshOutcome::Updated
                }
                Err(error) => {
                    warn!(%error, "usage refresh failed");
                    state.error = Some(error.clone());
                    RefreshOutcome::Failed(error)
                }
            }
        };
        self.updates.send_modify(|generation| *generation += 1);
        outcome
    }

    async fn load_credentials(&self) -> Result<Credentials, UsageError> {
        let creds = self.credentials.get_credentials().await?;
        if !creds.claude_ai_oauth.is_expired(Utc::now()) {
            return Ok(creds);
        }

        // The owning CLI may have refreshed the token since it was cached.
        debug!("cached token past expiresAt, re-reading credential store");
        self.credentials.clear_cache();
        let creds = self.credentials.get_credentials().await?;
        if creds.claude_ai_oauth.is_expired(Utc::now()) {
            info!("stored token is past expiresAt; sending it anyway");
        }
        Ok(creds)
    }

    async fn fetch_cycle(&self) -> Result<UsageResponse, UsageError> {
        let creds = self.load_credentials().await?;
        self.lock_state().subscription_type = Some(creds.subscription_label());

        match self.fetcher.fetch_usage(creds.access_token()).await {
            Ok(response) => Ok(response),
            Err(UsageError::Http(401)) => {
                self.credentials.clear_cache();
                Err(UsageError::Http(401))
            }
            Err(e) => Err(e),
        }
    }
}

impl<C, F> UsageMonitor<C, F>
where
    C: CredentialProvider + 'static,
    F: UsageFetching + 'static,
{
    /// Spawn the poll task: refresh now, then every `interval` until stopped.
    pub fn start(self: &Arc<Self>, interval: Duration) -> PollHandle {
        let token = CancellationToken::new();
        let monitor = Arc::clone(self);
        let cancel = token.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = monitor.refresh() => {}
                }
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            debug!("poll task stopped");
        });

        PollHandle {
            token,
            task: Some(task),
        }
    }
}

/// Handle to a running poll task. Dropping it stops the task.
pub struct PollHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Cancel the task and wait for it to finish.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
