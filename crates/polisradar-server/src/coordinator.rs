//! Refresh scheduling and snapshot distribution.
//!
//! The coordinator owns the polling loop: a tick fires on a fixed interval
//! or on demand, at most one refresh runs at a time, and requests arriving
//! while one is in flight are absorbed by that refresh's result instead of
//! starting another. Successful cycles atomically replace the published
//! [`Snapshot`]; failed cycles keep the previous one and mark the
//! coordinator unavailable without ever stopping the schedule.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc, watch};
use tracing::{debug, info, warn};

use polisradar_core::Snapshot;

use crate::aggregator::Aggregator;

/// Refresh lifecycle phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshPhase {
    /// Waiting for the next tick.
    #[default]
    Idle,
    /// A refresh is in flight.
    Fetching,
}

/// Observable coordinator state.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorState {
    /// Current lifecycle phase.
    pub phase: RefreshPhase,
    /// Whether the last completed refresh succeeded.
    pub available: bool,
    /// Completion time of the last successful refresh.
    pub last_success: Option<DateTime<Utc>>,
    /// Start time of the last refresh attempt.
    pub last_attempt: Option<DateTime<Utc>>,
    /// Reason the last refresh failed, kept for diagnostics.
    pub last_error: Option<String>,
    /// Completed refresh count, failures included.
    pub refreshes: u64,
}

impl CoordinatorState {
    /// Creates a fresh state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful refresh.
    pub fn record_success(&mut self) {
        self.phase = RefreshPhase::Idle;
        self.available = true;
        self.last_success = Some(Utc::now());
        self.last_error = None;
        self.refreshes += 1;
    }

    /// Records a failed refresh, retaining the reason.
    pub fn record_failure(&mut self, reason: impl Into<String>) {
        self.phase = RefreshPhase::Idle;
        self.available = false;
        self.last_error = Some(reason.into());
        self.refreshes += 1;
    }
}

/// Shared coordinator state.
pub type SharedCoordinatorState = Arc<RwLock<CoordinatorState>>;

/// Commands that can be sent to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorCommand {
    /// Trigger an immediate refresh.
    RefreshNow,
    /// Stop the coordinator.
    Stop,
}

/// The coordinator drives the refresh schedule and publishes snapshots.
pub struct RefreshCoordinator {
    interval: Duration,
    state: SharedCoordinatorState,
    command_tx: mpsc::Sender<CoordinatorCommand>,
    command_rx: Option<mpsc::Receiver<CoordinatorCommand>>,
    snapshot_tx: watch::Sender<Option<Snapshot>>,
}

impl RefreshCoordinator {
    /// Creates a coordinator with the given tick interval.
    pub fn new(interval: Duration) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (snapshot_tx, _) = watch::channel(None);
        Self {
            interval,
            state: Arc::new(RwLock::new(CoordinatorState::new())),
            command_tx,
            command_rx: Some(command_rx),
            snapshot_tx,
        }
    }

    /// Returns a handle for requesting refreshes and observing snapshots.
    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle {
            command_tx: self.command_tx.clone(),
            state: self.state.clone(),
            snapshot_rx: self.snapshot_tx.subscribe(),
        }
    }

    /// Returns the shared state.
    pub fn state(&self) -> SharedCoordinatorState {
        self.state.clone()
    }

    /// Runs the coordinator loop until stopped.
    ///
    /// An initial refresh fires immediately; after that the loop wakes on
    /// the interval or on a [`CoordinatorCommand::RefreshNow`].
    pub async fn run(mut self, aggregator: Aggregator) {
        let mut command_rx = self.command_rx.take().expect("run called twice");

        info!(
            interval_secs = self.interval.as_secs(),
            areas = aggregator.areas().len(),
            "refresh coordinator started"
        );

        self.do_refresh(&aggregator).await;
        if self.coalesce_pending(&mut command_rx) {
            info!("refresh coordinator stopping");
            return;
        }

        loop {
            let stop = tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    self.do_refresh(&aggregator).await;
                    self.coalesce_pending(&mut command_rx)
                }
                cmd = command_rx.recv() => match cmd {
                    Some(CoordinatorCommand::RefreshNow) => {
                        debug!("on-demand refresh requested");
                        self.do_refresh(&aggregator).await;
                        self.coalesce_pending(&mut command_rx)
                    }
                    Some(CoordinatorCommand::Stop) | None => true,
                }
            };

            if stop {
                info!("refresh coordinator stopping");
                break;
            }
        }
    }

    /// Drops refresh requests that queued up while the last refresh was in
    /// flight; they are satisfied by its result. Returns true when a stop
    /// was queued.
    fn coalesce_pending(&self, command_rx: &mut mpsc::Receiver<CoordinatorCommand>) -> bool {
        let mut coalesced = 0;
        loop {
            match command_rx.try_recv() {
                Ok(CoordinatorCommand::RefreshNow) => coalesced += 1,
                Ok(CoordinatorCommand::Stop) => return true,
                Err(_) => break,
            }
        }
        if coalesced > 0 {
            debug!(coalesced, "coalesced refresh requests into completed refresh");
        }
        false
    }

    async fn do_refresh(&self, aggregator: &Aggregator) {
        {
            let mut state = self.state.write().await;
            state.phase = RefreshPhase::Fetching;
            state.last_attempt = Some(Utc::now());
        }

        debug!("refresh started");
        match aggregator.refresh().await {
            Ok(snapshot) => {
                let areas = snapshot.len();
                self.state.write().await.record_success();
                self.snapshot_tx.send_replace(Some(snapshot));
                info!(areas, "refresh succeeded");
            }
            Err(e) => {
                warn!(error = %e, "refresh failed, keeping previous snapshot");
                self.state.write().await.record_failure(e.to_string());
            }
        }
    }
}

/// Handle for requesting refreshes and observing coordinator output.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    command_tx: mpsc::Sender<CoordinatorCommand>,
    state: SharedCoordinatorState,
    snapshot_rx: watch::Receiver<Option<Snapshot>>,
}

impl CoordinatorHandle {
    /// Requests an immediate refresh.
    ///
    /// If a refresh is already in flight the request is coalesced into it.
    ///
    /// # Errors
    ///
    /// Returns an error when the coordinator has stopped.
    pub async fn refresh_now(
        &self,
    ) -> Result<(), mpsc::error::SendError<CoordinatorCommand>> {
        self.command_tx.send(CoordinatorCommand::RefreshNow).await
    }

    /// Stops the coordinator.
    ///
    /// # Errors
    ///
    /// Returns an error when the coordinator has already stopped.
    pub async fn stop(&self) -> Result<(), mpsc::error::SendError<CoordinatorCommand>> {
        self.command_tx.send(CoordinatorCommand::Stop).await
    }

    /// Returns a copy of the current state.
    pub async fn state(&self) -> CoordinatorState {
        self.state.read().await.clone()
    }

    /// Returns whether the last completed refresh succeeded.
    pub async fn available(&self) -> bool {
        self.state.read().await.available
    }

    /// Returns the latest published snapshot, if any cycle has succeeded.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.snapshot_rx.borrow().clone()
    }

    /// Returns a receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Option<Snapshot>> {
        self.snapshot_rx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use polisradar_core::{DetailFields, RawEvent};
    use polisradar_feed::{BoxFuture, DetailSource, EventSource, FeedError, FeedResult};

    use crate::config::RadarConfig;

    /// Event source that counts fetches and can fail from a given call on,
    /// with an optional artificial delay.
    struct ScriptedEvents {
        calls: Arc<AtomicUsize>,
        fail_from_call: Option<usize>,
        delay: Duration,
    }

    impl ScriptedEvents {
        fn new(calls: Arc<AtomicUsize>) -> Self {
            Self {
                calls,
                fail_from_call: None,
                delay: Duration::ZERO,
            }
        }

        fn failing_from(mut self, call: usize) -> Self {
            self.fail_from_call = Some(call);
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    impl EventSource for ScriptedEvents {
        fn fetch_events<'a>(
            &'a self,
            _area: Option<&'a str>,
        ) -> BoxFuture<'a, FeedResult<Vec<RawEvent>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Box::pin(async move {
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                if self.fail_from_call.is_some_and(|from| call >= from) {
                    return Err(FeedError::status("events endpoint returned HTTP 503"));
                }
                let offset = chrono::FixedOffset::east_opt(3600).expect("valid offset");
                let datetime = Utc::now()
                    .with_timezone(&offset)
                    .format("%Y-%m-%d %H:%M:%S %:z")
                    .to_string();
                Ok(vec![
                    RawEvent::new(call as i64)
                        .with_name(format!("Händelse {call}"))
                        .with_datetime(datetime),
                ])
            })
        }
    }

    struct NoDetails;

    impl DetailSource for NoDetails {
        fn fetch_details<'a>(
            &'a self,
            _event_id: i64,
            _url: &'a str,
        ) -> BoxFuture<'a, FeedResult<DetailFields>> {
            Box::pin(async { Err(FeedError::scrape("no recognizable detail markers")) })
        }
    }

    fn aggregator(events: ScriptedEvents) -> Aggregator {
        Aggregator::new(
            RadarConfig::default(),
            Arc::new(events),
            Arc::new(NoDetails),
        )
    }

    #[test]
    fn state_transitions() {
        let mut state = CoordinatorState::new();
        assert!(!state.available);

        state.record_success();
        assert!(state.available);
        assert!(state.last_success.is_some());
        assert!(state.last_error.is_none());
        assert_eq!(state.refreshes, 1);

        state.record_failure("events endpoint returned HTTP 503");
        assert!(!state.available);
        assert!(state.last_error.is_some());
        // Last success is retained across failures.
        assert!(state.last_success.is_some());
        assert_eq!(state.refreshes, 2);
    }

    #[tokio::test]
    async fn initial_refresh_publishes_a_snapshot() {
        let calls = Arc::new(AtomicUsize::new(0));
        let coordinator = RefreshCoordinator::new(Duration::from_secs(3600));
        let handle = coordinator.handle();

        let task = tokio::spawn(coordinator.run(aggregator(ScriptedEvents::new(calls.clone()))));

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(handle.available().await);
        let snapshot = handle.snapshot().expect("snapshot published");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn on_demand_refresh_fires() {
        let calls = Arc::new(AtomicUsize::new(0));
        let coordinator = RefreshCoordinator::new(Duration::from_secs(3600));
        let handle = coordinator.handle();

        let task = tokio::spawn(coordinator.run(aggregator(ScriptedEvents::new(calls.clone()))));

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.refresh_now().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(handle.state().await.refreshes, 2);

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn mid_refresh_requests_are_coalesced() {
        let calls = Arc::new(AtomicUsize::new(0));
        let events =
            ScriptedEvents::new(calls.clone()).with_delay(Duration::from_millis(200));
        let coordinator = RefreshCoordinator::new(Duration::from_secs(3600));
        let handle = coordinator.handle();

        let task = tokio::spawn(coordinator.run(aggregator(events)));

        // The initial refresh is sleeping; queue several requests into it.
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.refresh_now().await.unwrap();
        handle.refresh_now().await.unwrap();
        handle.refresh_now().await.unwrap();

        tokio::time::sleep(Duration::from_millis(600)).await;

        // Every request arrived mid-refresh and is absorbed by the
        // in-flight cycle's result; no second refresh starts.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.state().await.refreshes, 1);

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn failure_keeps_previous_snapshot_and_marks_unavailable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let events = ScriptedEvents::new(calls.clone()).failing_from(2);
        let coordinator = RefreshCoordinator::new(Duration::from_secs(3600));
        let handle = coordinator.handle();

        let task = tokio::spawn(coordinator.run(aggregator(events)));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.available().await);
        let first = handle.snapshot().expect("snapshot published");

        handle.refresh_now().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let state = handle.state().await;
        assert!(!state.available);
        assert!(state.last_error.as_deref().unwrap_or("").contains("503"));

        // The previously published snapshot is still observable.
        let retained = handle.snapshot().expect("snapshot retained");
        assert_eq!(retained, first);

        // The schedule keeps going: another on-demand refresh still runs.
        handle.refresh_now().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(handle.state().await.refreshes, 3);

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn stop_terminates_the_loop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let coordinator = RefreshCoordinator::new(Duration::from_millis(50));
        let handle = coordinator.handle();

        let task = tokio::spawn(coordinator.run(aggregator(ScriptedEvents::new(calls.clone()))));

        tokio::time::sleep(Duration::from_millis(80)).await;
        handle.stop().await.unwrap();
        task.await.unwrap();

        // Once stopped, further commands fail.
        assert!(handle.refresh_now().await.is_err());
    }
}
