//! The acquisition pipeline: permission → position → reverse geocode.
//!
//! Each call to [`LocationAcquisitionFlow::request_location`] is one attempt,
//! tagged with a sequence number when it starts. Only the latest attempt may
//! write state; writes from superseded attempts, or from any attempt after
//! [`LocationAcquisitionFlow::teardown`], are dropped.

use super::state::{compose_display, AcquisitionError, AcquisitionState};
use crate::location::{GeocodeProvider, PermissionProvider, PositionProvider};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct LocationAcquisitionFlow {
    permission: Arc<dyn PermissionProvider>,
    position: Arc<dyn PositionProvider>,
    geocoder: Arc<dyn GeocodeProvider>,
    state: watch::Sender<AcquisitionState>,
    latest: AtomicU64,
    torn_down: AtomicBool,
}

impl LocationAcquisitionFlow {
    pub fn new(
        permission: Arc<dyn PermissionProvider>,
        position: Arc<dyn PositionProvider>,
        geocoder: Arc<dyn GeocodeProvider>,
    ) -> Self {
        let (state, _) = watch::channel(AcquisitionState::default());
        Self {
            permission,
            position,
            geocoder,
            state,
            latest: AtomicU64::new(0),
            torn_down: AtomicBool::new(false),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AcquisitionState {
        self.state.borrow().clone()
    }

    /// Change stream for rendering collaborators.
    pub fn subscribe(&self) -> watch::Receiver<AcquisitionState> {
        self.state.subscribe()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Stop accepting requests and drop all pending write-backs.
    ///
    /// The flag flips under the channel's write lock, so no write-back that
    /// checked it earlier can land afterwards. Subscribers are not notified.
    pub fn teardown(&self) {
        let mut first = false;
        self.state.send_if_modified(|_| {
            first = !self.torn_down.swap(true, Ordering::AcqRel);
            false
        });
        if first {
            tracing::debug!("acquisition flow torn down");
        }
    }

    /// Run one attempt to completion. Returns the attempt number, or None if
    /// the flow has been torn down.
    pub async fn request_location(&self) -> Option<u64> {
        let attempt = self.begin_attempt()?;
        self.run_attempt(attempt).await;
        Some(attempt)
    }

    /// Start an attempt on the runtime without waiting for it. The Loading
    /// state is published before this returns.
    pub fn spawn_request(self: &Arc<Self>) -> Option<(u64, JoinHandle<()>)> {
        let attempt = self.begin_attempt()?;
        let flow = Arc::clone(self);
        let handle = tokio::spawn(async move { flow.run_attempt(attempt).await });
        Some((attempt, handle))
    }

    fn begin_attempt(&self) -> Option<u64> {
        if self.is_torn_down() {
            return None;
        }
        let attempt = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::info!(attempt, "location attempt started");
        self.apply(attempt, |s| s.begin(attempt));
        Some(attempt)
    }

    async fn run_attempt(&self, attempt: u64) {
        match self.acquire(attempt).await {
            Ok(location) => {
                tracing::info!(attempt, location = %location, "location detected");
                self.apply(attempt, |s| s.succeed(location));
            }
            Err(err) => {
                tracing::warn!(attempt, kind = ?err.kind(), error = %err, "location attempt failed");
                self.apply(attempt, |s| s.fail(&err));
            }
        }
    }

    async fn acquire(&self, attempt: u64) -> Result<String, AcquisitionError> {
        let status = self
            .permission
            .request_foreground_access()
            .await
            .map_err(AcquisitionError::AcquisitionFailure)?;
        if !status.is_granted() {
            return Err(AcquisitionError::PermissionDenied);
        }

        let coords = self
            .position
            .current_position()
            .await
            .map_err(AcquisitionError::AcquisitionFailure)?;
        tracing::debug!(attempt, %coords, "position acquired");
        self.apply(attempt, |s| s.set_coordinates(coords));

        let candidates = self
            .geocoder
            .reverse_geocode(coords)
            .await
            .map_err(|e| AcquisitionError::GeocodeFailure(Some(e)))?;
        let first = candidates.first().ok_or(AcquisitionError::GeocodeFailure(None))?;
        Ok(compose_display(first))
    }

    /// Apply `update` if `attempt` is still the latest and the flow is alive.
    /// The check runs under the channel's write lock.
    fn apply(&self, attempt: u64, update: impl FnOnce(&mut AcquisitionState)) -> bool {
        let applied = self.state.send_if_modified(|state| {
            if self.torn_down.load(Ordering::Acquire) || self.latest.load(Ordering::Acquire) != attempt {
                return false;
            }
            update(state);
            true
        });
        if !applied {
            tracing::debug!(attempt, "discarding stale state update");
        }
        applied
    }
}
