//! Save pipeline engine.
//!
//! The engine is an actor: one task owns all pipeline state and is driven
//! by a command channel plus timers. Debounced changes, manual saves,
//! retries and follow-up cycles all funnel into a single save path guarded
//! by one in-flight slot, so at most one write is ever outstanding and at
//! most one superseding payload is ever queued behind it. The network write
//! itself runs in a spawned task that reports completion back over the
//! command channel; it is never cancelled, later payloads supersede it
//! logically through the signature comparison.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, error, info, warn};

use sitecanvas_client::{PersistenceClient, SavePayload, SaveRequest, SaveResponse};
use sitecanvas_common::{Error, Result};

use crate::retry::RetryPolicy;
use crate::signature::payload_signature;
use crate::state::{SavePhase, SyncStatus};

/// Configuration for the sync engine.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SyncConfig {
    /// Trailing debounce applied to document changes.
    pub debounce_delay: Duration,
    /// Retry policy for failed write attempts.
    pub retry: RetryPolicy,
    /// Delay before a queued payload starts its own save cycle.
    pub followup_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_delay: Duration::from_millis(2000),
            retry: RetryPolicy::default(),
            followup_delay: Duration::from_millis(100),
        }
    }
}

/// Outcome of a save attempt as seen by its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The write reached the remote store.
    Saved,
    /// The payload matched the last saved signature; no write was issued.
    Unchanged,
    /// A write was already in flight; the payload was queued behind it.
    Deferred,
}

/// Success callback, invoked with the payload that was written.
pub type SaveSuccessFn = Arc<dyn Fn(&SavePayload) + Send + Sync>;
/// Terminal-failure callback, invoked once retries are exhausted.
pub type SaveErrorFn = Arc<dyn Fn(&Error) + Send + Sync>;

enum Command {
    Changed(SavePayload),
    SaveNow(SavePayload, oneshot::Sender<Result<SaveOutcome>>),
    Flush(SavePayload),
    WriteCompleted(Result<SaveResponse>),
    Shutdown,
}

/// Handle for feeding the engine. Cheap to clone.
#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::Sender<Command>,
    status: SyncStatus,
}

impl SyncHandle {
    /// Notify the engine of a document change.
    ///
    /// (Re)schedules the trailing debounce: only the last payload within an
    /// idle window is ever written.
    pub async fn document_changed(&self, payload: SavePayload) -> Result<()> {
        self.send(Command::Changed(payload)).await
    }

    /// Save immediately, cancelling any pending debounce.
    ///
    /// Resolves with this attempt's outcome. A failed attempt resolves with
    /// its error while retries continue in the background.
    pub async fn save_now(&self, payload: SavePayload) -> Result<SaveOutcome> {
        let (respond, response) = oneshot::channel();
        self.send(Command::SaveNow(payload, respond)).await?;
        response
            .await
            .map_err(|_| Error::Channel("sync engine dropped the save response".to_string()))?
    }

    /// Best-effort flush for page-hidden/unload.
    ///
    /// Cancels the debounce; when nothing is in flight and the payload
    /// differs from the last saved signature, one unacknowledged write is
    /// issued. Its outcome is not observed and delivery is not guaranteed.
    pub async fn flush(&self, payload: SavePayload) -> Result<()> {
        self.send(Command::Flush(payload)).await
    }

    /// Stop the engine.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    /// Engine status handle.
    pub fn status(&self) -> &SyncStatus {
        &self.status
    }

    /// Whether a write is currently in flight.
    pub fn is_saving(&self) -> bool {
        self.status.is_saving()
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::Channel("sync engine is not running".to_string()))
    }
}

struct Flight {
    payload: SavePayload,
    signature: String,
    attempt: u32,
    respond: Option<oneshot::Sender<Result<SaveOutcome>>>,
}

/// The save pipeline actor.
pub struct SyncEngine<C: PersistenceClient + ?Sized> {
    client: Arc<C>,
    config: SyncConfig,
    status: SyncStatus,
    commands: Option<mpsc::Receiver<Command>>,
    /// Clone handed to write tasks for completion reports.
    feedback: mpsc::Sender<Command>,
    on_success: Option<SaveSuccessFn>,
    on_error: Option<SaveErrorFn>,

    /// Canonical serialization of the last successfully written payload.
    last_saved_signature: Option<String>,
    /// Depth-1 queue of the payload superseding the in-flight write.
    pending: Option<SavePayload>,
    flight: Option<Flight>,
    debounce: Option<(Instant, SavePayload)>,
    retry: Option<(Instant, SavePayload, u32)>,
    followup: Option<(Instant, SavePayload)>,
}

impl<C: PersistenceClient + ?Sized + 'static> SyncEngine<C> {
    const COMMAND_CAPACITY: usize = 100;

    /// Create an engine and its handle. Spawn [`SyncEngine::run`] to start
    /// processing.
    pub fn new(client: Arc<C>, config: SyncConfig) -> (SyncHandle, Self) {
        let (feedback, commands) = mpsc::channel(Self::COMMAND_CAPACITY);
        let status = SyncStatus::new();

        let handle = SyncHandle {
            commands: feedback.clone(),
            status: status.clone(),
        };

        let engine = Self {
            client,
            config,
            status,
            commands: Some(commands),
            feedback,
            on_success: None,
            on_error: None,
            last_saved_signature: None,
            pending: None,
            flight: None,
            debounce: None,
            retry: None,
            followup: None,
        };

        (handle, engine)
    }

    /// Register the success callback.
    pub fn on_save_success(mut self, callback: SaveSuccessFn) -> Self {
        self.on_success = Some(callback);
        self
    }

    /// Register the terminal-failure callback.
    pub fn on_save_error(mut self, callback: SaveErrorFn) -> Self {
        self.on_error = Some(callback);
        self
    }

    /// Run the engine until shutdown.
    ///
    /// This should be spawned in a tokio task.
    pub async fn run(mut self) {
        let mut commands = self.commands.take().expect("Engine can only be run once");

        info!("Sync engine started");

        loop {
            let debounce_at = self.debounce.as_ref().map(|(at, _)| *at);
            let retry_at = self.retry.as_ref().map(|(at, _, _)| *at);
            let followup_at = self.followup.as_ref().map(|(at, _)| *at);

            tokio::select! {
                maybe_command = commands.recv() => {
                    match maybe_command {
                        Some(Command::Shutdown) | None => break,
                        Some(command) => self.handle_command(command),
                    }
                }

                _ = sleep_until(debounce_at.unwrap_or_else(Instant::now)), if debounce_at.is_some() => {
                    if let Some((_, payload)) = self.debounce.take() {
                        debug!("Debounce elapsed, starting save");
                        self.begin_save(payload, 1, None);
                    }
                }

                _ = sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => {
                    if let Some((_, payload, attempt)) = self.retry.take() {
                        debug!("Retry timer elapsed, attempt {}", attempt);
                        self.begin_save(payload, attempt, None);
                    }
                }

                _ = sleep_until(followup_at.unwrap_or_else(Instant::now)), if followup_at.is_some() => {
                    if let Some((_, payload)) = self.followup.take() {
                        debug!("Starting follow-up save for queued payload");
                        self.begin_save(payload, 1, None);
                    }
                }
            }
        }

        info!("Sync engine stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Changed(payload) => {
                // Trailing debounce: any change before the timer fires
                // restarts it, so only the final state within an idle
                // window gets scheduled.
                let deadline = Instant::now() + self.config.debounce_delay;
                self.debounce = Some((deadline, payload));
                if self.flight.is_none() {
                    self.status.set_phase(SavePhase::Debouncing);
                }
            }
            Command::SaveNow(payload, respond) => {
                self.debounce = None;
                self.begin_save(payload, 1, Some(respond));
            }
            Command::Flush(payload) => self.flush(payload),
            Command::WriteCompleted(result) => self.finish_save(result),
            Command::Shutdown => {}
        }
    }

    /// Run the save algorithm for `payload` at `attempt`.
    fn begin_save(
        &mut self,
        payload: SavePayload,
        attempt: u32,
        respond: Option<oneshot::Sender<Result<SaveOutcome>>>,
    ) {
        if attempt == 1 {
            // A fresh cycle supersedes any scheduled retry or follow-up:
            // their payloads are older than this one.
            if self.retry.take().is_some() {
                debug!("Superseding scheduled retry with a fresh save");
            }
            self.followup = None;
        }

        if self.flight.is_some() {
            if attempt == 1 {
                // Depth-1 queue, last write wins.
                debug!("Write in flight, queueing superseding payload");
                self.pending = Some(payload);
                if let Some(respond) = respond {
                    let _ = respond.send(Ok(SaveOutcome::Deferred));
                }
            } else {
                debug!("Dropping retry attempt {}: another write holds the slot", attempt);
            }
            return;
        }

        let signature = match payload_signature(&payload) {
            Ok(signature) => signature,
            Err(e) => {
                error!("Failed to serialize save payload: {}", e);
                if let Some(respond) = respond {
                    let _ = respond.send(Err(e));
                }
                return;
            }
        };

        if self.last_saved_signature.as_deref() == Some(signature.as_str()) {
            // Successful no-op: the remote already has this payload.
            debug!("Payload signature unchanged, skipping write");
            self.status.set_phase(SavePhase::Idle);
            self.notify_success(&payload);
            if let Some(respond) = respond {
                let _ = respond.send(Ok(SaveOutcome::Unchanged));
            }
            if let Some(pending) = self.pending.take() {
                self.followup = Some((Instant::now(), pending));
            }
            return;
        }

        self.status.set_phase(SavePhase::Saving);
        self.flight = Some(Flight {
            payload: payload.clone(),
            signature,
            attempt,
            respond,
        });

        let client = self.client.clone();
        let feedback = self.feedback.clone();
        let request = SaveRequest::from_payload(&payload);
        tokio::spawn(async move {
            let result = client.save_site(&request).await;
            let _ = feedback.send(Command::WriteCompleted(result)).await;
        });
    }

    fn finish_save(&mut self, result: Result<SaveResponse>) {
        let Some(flight) = self.flight.take() else {
            warn!("Write completion without an in-flight save");
            return;
        };
        let Flight {
            payload,
            signature,
            attempt,
            respond,
        } = flight;

        let failure = match result {
            Ok(response) if response.success => None,
            Ok(response) => Some(Error::RejectedSave(
                response
                    .error
                    .unwrap_or_else(|| "endpoint reported failure".to_string()),
            )),
            Err(e) => Some(e),
        };

        let Some(cause) = failure else {
            debug!("Save succeeded on attempt {}", attempt);
            self.last_saved_signature = Some(signature);
            self.status.record_success();
            self.status.set_phase(SavePhase::Idle);
            self.notify_success(&payload);
            if let Some(respond) = respond {
                let _ = respond.send(Ok(SaveOutcome::Saved));
            }
            if let Some(pending) = self.pending.take() {
                // The queued payload starts a brand-new cycle shortly.
                self.followup = Some((Instant::now() + self.config.followup_delay, pending));
            }
            return;
        };

        if cause.is_retryable() && self.config.retry.should_retry(attempt) {
            let delay = self.config.retry.delay_after_attempt(attempt);
            warn!(
                "Save attempt {} failed: {}. Retrying in {:?}",
                attempt, cause, delay
            );
            self.retry = Some((Instant::now() + delay, payload, attempt + 1));
            self.status.set_phase(SavePhase::RetryScheduled);
            if let Some(respond) = respond {
                let _ = respond.send(Err(cause));
            }
        } else {
            let terminal = Error::RetriesExhausted {
                attempts: attempt,
                last_error: cause.to_string(),
            };
            error!("Save failed terminally: {}", terminal);
            self.status.record_failure(&terminal);
            self.status.set_phase(SavePhase::Failed);
            if self.pending.take().is_some() {
                warn!("Dropping queued payload after terminal failure; the next change rebuilds it");
            }
            self.notify_error(&terminal);
            if let Some(respond) = respond {
                let _ = respond.send(Err(terminal));
            }
        }
    }

    /// Best-effort flush for page teardown.
    fn flush(&mut self, payload: SavePayload) {
        self.debounce = None;

        if self.flight.is_some() {
            debug!("Flush skipped: write already in flight");
            return;
        }

        let signature = match payload_signature(&payload) {
            Ok(signature) => signature,
            Err(e) => {
                error!("Failed to serialize flush payload: {}", e);
                return;
            }
        };
        if self.last_saved_signature.as_deref() == Some(signature.as_str()) {
            debug!("Flush skipped: nothing to write");
            return;
        }

        info!("Flushing unsaved changes on page teardown");
        let client = self.client.clone();
        let request = SaveRequest::from_payload(&payload);
        // Detached on purpose: the write may outlive the session and its
        // outcome is discarded.
        tokio::spawn(async move {
            if let Err(e) = client.save_site(&request).await {
                debug!("Flush write failed: {}", e);
            }
        });
    }

    fn notify_success(&self, payload: &SavePayload) {
        if let Some(on_success) = &self.on_success {
            on_success(payload);
        }
    }

    fn notify_error(&self, error: &Error) {
        if let Some(on_error) = &self.on_error {
            on_error(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitecanvas_client::{MemoryClient, SiteProfile};
    use sitecanvas_common::SiteId;
    use sitecanvas_document::ContentDocument;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn test_config() -> SyncConfig {
        SyncConfig {
            debounce_delay: Duration::from_millis(40),
            retry: RetryPolicy::new(3).with_base_delay(Duration::from_millis(30)),
            followup_delay: Duration::from_millis(10),
        }
    }

    fn site_id() -> SiteId {
        SiteId::new("acme").unwrap()
    }

    fn payload(business_name: &str) -> SavePayload {
        let mut content = ContentDocument::new();
        content.business_name = business_name.to_string();
        SavePayload::new(
            SiteProfile {
                site_id: site_id(),
                site_name: "Acme Plumbing".to_string(),
                template: "trades".to_string(),
            },
            content,
        )
    }

    fn spawn_engine(client: Arc<MemoryClient>, config: SyncConfig) -> SyncHandle {
        let (handle, engine) = SyncEngine::new(client, config);
        tokio::spawn(engine.run());
        handle
    }

    #[tokio::test]
    async fn test_changes_within_window_coalesce_into_one_write() {
        let client = Arc::new(MemoryClient::new());
        let config = SyncConfig {
            debounce_delay: Duration::from_millis(150),
            ..test_config()
        };
        let handle = spawn_engine(client.clone(), config);

        handle.document_changed(payload("one")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.document_changed(payload("two")).await.unwrap();

        // The restarted trailing window has not elapsed yet.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(client.save_attempts(), 0);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(client.save_attempts(), 1);
        let saved = client.last_saved(&site_id()).unwrap();
        assert_eq!(saved.content.business_name, "two");
    }

    #[tokio::test]
    async fn test_identical_change_repeated_still_one_write() {
        let client = Arc::new(MemoryClient::new());
        let handle = spawn_engine(client.clone(), test_config());

        handle.document_changed(payload("same")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.document_changed(payload("same")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(client.save_attempts(), 1);
    }

    #[tokio::test]
    async fn test_save_now_with_equal_payload_skips_write() {
        let client = Arc::new(MemoryClient::new());
        let successes = Arc::new(AtomicU32::new(0));
        let successes_clone = successes.clone();

        let (handle, engine) = SyncEngine::new(client.clone(), test_config());
        let engine = engine.on_save_success(Arc::new(move |_payload| {
            successes_clone.fetch_add(1, Ordering::SeqCst);
        }));
        tokio::spawn(engine.run());

        let outcome = handle.save_now(payload("same")).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Saved);

        let outcome = handle.save_now(payload("same")).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Unchanged);

        // Exactly one network write, but both saves resolved successfully.
        assert_eq!(client.save_attempts(), 1);
        assert_eq!(successes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_persistent_failure_makes_exactly_three_spaced_attempts() {
        let client = Arc::new(MemoryClient::new());
        client.fail_next(10);

        let failures = Arc::new(Mutex::new(Vec::new()));
        let failures_clone = failures.clone();
        let config = SyncConfig {
            debounce_delay: Duration::from_millis(50),
            retry: RetryPolicy::new(3).with_base_delay(Duration::from_millis(100)),
            followup_delay: Duration::from_millis(10),
        };

        let (handle, engine) = SyncEngine::new(client.clone(), config);
        let engine = engine.on_save_error(Arc::new(move |error| {
            failures_clone.lock().unwrap().push(error.to_string());
        }));
        tokio::spawn(engine.run());

        handle.document_changed(payload("doomed")).await.unwrap();

        // Attempt 1 fires at ~50ms (debounce), attempt 2 at ~150ms
        // (base × 1), attempt 3 at ~350ms (base × 2).
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(client.save_attempts(), 1);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(client.save_attempts(), 2);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(client.save_attempts(), 3);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(client.save_attempts(), 3);
        assert_eq!(handle.status().phase(), SavePhase::Failed);
        let failures = failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("Retries exhausted after 3 attempts"));
    }

    #[tokio::test]
    async fn test_manual_save_failure_reports_and_retries_in_background() {
        let client = Arc::new(MemoryClient::new());
        client.fail_next(1);
        let handle = spawn_engine(client.clone(), test_config());

        let result = handle.save_now(payload("flaky")).await;
        assert!(matches!(result, Err(Error::Transport(_))));
        assert_eq!(handle.status().phase(), SavePhase::RetryScheduled);

        // The background retry succeeds against the recovered endpoint.
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(client.save_attempts(), 2);
        assert_eq!(
            client.last_saved(&site_id()).unwrap().content.business_name,
            "flaky"
        );
        assert_eq!(handle.status().phase(), SavePhase::Idle);
    }

    #[tokio::test]
    async fn test_rejection_is_retried_like_transport_failure() {
        let client = Arc::new(MemoryClient::new());
        client.reject_next(1);
        let handle = spawn_engine(client.clone(), test_config());

        let result = handle.save_now(payload("rejected")).await;
        assert!(matches!(result, Err(Error::RejectedSave(_))));

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(client.save_attempts(), 2);
        assert!(client.last_saved(&site_id()).is_some());
    }

    #[tokio::test]
    async fn test_change_during_flight_yields_one_followup_with_latest_payload() {
        let client = Arc::new(MemoryClient::new().with_latency(Duration::from_millis(60)));
        let handle = spawn_engine(client.clone(), test_config());

        let first = tokio::spawn({
            let handle = handle.clone();
            let payload = payload("first");
            async move { handle.save_now(payload).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(handle.is_saving());

        // Two changes land while the write is in flight; the debounce fires
        // mid-flight and queues only the latest.
        handle.document_changed(payload("second")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        handle.document_changed(payload("third")).await.unwrap();

        assert_eq!(first.await.unwrap().unwrap(), SaveOutcome::Saved);
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(client.save_attempts(), 2);
        let saved = client.last_saved(&site_id()).unwrap();
        assert_eq!(saved.content.business_name, "third");
        assert!(!handle.is_saving());
    }

    #[tokio::test]
    async fn test_save_now_while_in_flight_defers() {
        let client = Arc::new(MemoryClient::new().with_latency(Duration::from_millis(80)));
        let handle = spawn_engine(client.clone(), test_config());

        let first = tokio::spawn({
            let handle = handle.clone();
            let payload = payload("first");
            async move { handle.save_now(payload).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let outcome = handle.save_now(payload("second")).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Deferred);

        assert_eq!(first.await.unwrap().unwrap(), SaveOutcome::Saved);
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(client.save_attempts(), 2);
        assert_eq!(
            client.last_saved(&site_id()).unwrap().content.business_name,
            "second"
        );
    }

    #[tokio::test]
    async fn test_fresh_save_supersedes_scheduled_retry() {
        let client = Arc::new(MemoryClient::new());
        client.fail_next(1);
        let config = SyncConfig {
            debounce_delay: Duration::from_millis(30),
            retry: RetryPolicy::new(3).with_base_delay(Duration::from_millis(100)),
            followup_delay: Duration::from_millis(10),
        };
        let handle = spawn_engine(client.clone(), config);

        assert!(handle.save_now(payload("v1")).await.is_err());
        // A newer manual save takes over before the retry timer fires.
        let outcome = handle.save_now(payload("v2")).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Saved);
        assert_eq!(client.save_attempts(), 2);

        // The superseded retry never sends the stale payload.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(client.save_attempts(), 2);
        assert_eq!(
            client.last_saved(&site_id()).unwrap().content.business_name,
            "v2"
        );
    }

    #[tokio::test]
    async fn test_flush_cancels_debounce_and_writes_once() {
        let client = Arc::new(MemoryClient::new());
        let handle = spawn_engine(client.clone(), test_config());

        handle.document_changed(payload("draft")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.flush(payload("draft")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(client.save_attempts(), 1);

        // The cancelled debounce never produces a second write.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(client.save_attempts(), 1);
    }

    #[tokio::test]
    async fn test_flush_skips_already_saved_payload() {
        let client = Arc::new(MemoryClient::new());
        let handle = spawn_engine(client.clone(), test_config());

        let outcome = handle.save_now(payload("clean")).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Saved);

        handle.flush(payload("clean")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(client.save_attempts(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_processing() {
        let client = Arc::new(MemoryClient::new());
        let handle = spawn_engine(client.clone(), test_config());

        handle.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(handle.document_changed(payload("late")).await.is_err());
    }
}
