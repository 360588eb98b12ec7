use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::channel::oneshot;
use log::{debug, error};

use crate::{
    AuthorizationSource, AuthorizationState, AuthorizationStatus, PermissionError,
    PermissionResult, current_state,
};

/// A caller waiting for the outcome of a permission request.
pub struct PendingRequest {
    callback: Box<dyn FnOnce(AuthorizationState) + Send>,
}

impl PendingRequest {
    /// Wraps a completion callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(AuthorizationState) + Send + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Consumes the request, handing `state` to its callback.
    pub fn resolve(self, state: AuthorizationState) {
        (self.callback)(state);
    }
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest").finish_non_exhaustive()
    }
}

#[derive(Default)]
struct CoordinatorState {
    pending: VecDeque<PendingRequest>,
    prompt_in_flight: bool,
}

impl CoordinatorState {
    fn drain(&mut self) -> VecDeque<PendingRequest> {
        self.prompt_in_flight = false;
        std::mem::take(&mut self.pending)
    }
}

/// Queues permission requests and resolves them together.
///
/// The first request made while the user has not decided shows the OS
/// prompt; later requests join the queue until
/// [`on_authorization_changed`](Self::on_authorization_changed) delivers a
/// decision. Requests made once a decision exists resolve immediately.
///
/// Callbacks run on the calling thread after the internal lock is released,
/// so they may call back into the coordinator.
#[derive(Default)]
pub struct PermissionRequestCoordinator {
    state: Mutex<CoordinatorState>,
}

impl fmt::Debug for PermissionRequestCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("PermissionRequestCoordinator")
            .field("pending", &state.pending.len())
            .field("prompt_in_flight", &state.prompt_in_flight)
            .finish()
    }
}

impl PermissionRequestCoordinator {
    /// Creates an idle coordinator with no pending requests.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests permission, calling `completion` once the state is known.
    ///
    /// If the user has not decided yet, the OS prompt is shown unless one is
    /// already outstanding, and `completion` waits for the decision.
    /// Otherwise every pending callback, including `completion`, is resolved
    /// with the current state before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnexpectedStatus`] if the source reports an
    /// unknown status code. `completion` is dropped without being called, no
    /// prompt is shown, and requests already pending stay queued.
    pub fn request<S, F>(&self, source: &S, completion: F) -> PermissionResult<()>
    where
        S: AuthorizationSource + ?Sized,
        F: FnOnce(AuthorizationState) + Send + 'static,
    {
        let outcome = {
            let mut state = self.lock();
            let current = current_state(source)?;
            state.pending.push_back(PendingRequest::new(completion));

            match current {
                AuthorizationState::NotDetermined if state.prompt_in_flight => {
                    debug!(
                        "authorization prompt already shown, {} request(s) waiting",
                        state.pending.len()
                    );
                    Outcome::Wait
                }
                AuthorizationState::NotDetermined => {
                    state.prompt_in_flight = true;
                    Outcome::Prompt
                }
                current => Outcome::Resolve(current, state.drain()),
            }
        };

        // Outside the lock: the source may answer synchronously.
        match outcome {
            Outcome::Wait => {}
            Outcome::Prompt => {
                debug!("requesting always authorization");
                source.request_always_authorization();
            }
            Outcome::Resolve(current, pending) => resolve_all(pending, current),
        }
        Ok(())
    }

    /// Requests permission and waits for the resulting state.
    ///
    /// The request is registered (and any prompt shown) when this is called,
    /// not when the future is first polled.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnexpectedStatus`] if the source reports an
    /// unknown status code, and [`PermissionError::Abandoned`] if the
    /// coordinator is dropped before a decision arrives.
    pub fn request_async<S>(
        &self,
        source: &S,
    ) -> impl Future<Output = PermissionResult<AuthorizationState>> + Send + use<S>
    where
        S: AuthorizationSource + ?Sized,
    {
        let (sender, receiver) = oneshot::channel();
        let registered = self.request(source, move |state| {
            let _ = sender.send(state);
        });
        async move {
            registered?;
            receiver.await.map_err(|_| PermissionError::Abandoned)
        }
    }

    /// Handles a status change reported by the platform.
    ///
    /// A decision (always, denied, restricted) resolves and clears every
    /// pending request. `NotDetermined` carries no decision and is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnexpectedStatus`] for a status this
    /// coordinator never asks for. Pending requests stay queued.
    pub fn on_authorization_changed(&self, status: AuthorizationStatus) -> PermissionResult<()> {
        let decided = match status {
            AuthorizationStatus::AuthorizedAlways => AuthorizationState::Available,
            AuthorizationStatus::Denied => AuthorizationState::Denied,
            AuthorizationStatus::Restricted => AuthorizationState::Restricted,
            AuthorizationStatus::NotDetermined => return Ok(()),
            AuthorizationStatus::AuthorizedWhenInUse => {
                error!("unexpected authorization status change: {status:?}");
                return Err(PermissionError::UnexpectedStatus {
                    code: status.into(),
                });
            }
        };

        let pending = self.lock().drain();
        debug!(
            "authorization decided as {decided:?}, resolving {} request(s)",
            pending.len()
        );
        resolve_all(pending, decided);
        Ok(())
    }

    /// Number of requests waiting for a decision.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Whether an OS prompt has been shown and not yet answered.
    #[must_use]
    pub fn is_prompt_in_flight(&self) -> bool {
        self.lock().prompt_in_flight
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        // Queue contents stay valid even if a holder panicked.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

enum Outcome {
    Wait,
    Prompt,
    Resolve(AuthorizationState, VecDeque<PendingRequest>),
}

fn resolve_all(pending: VecDeque<PendingRequest>, state: AuthorizationState) {
    for request in pending {
        request.resolve(state);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Source {
        enabled: bool,
        code: Mutex<i64>,
        prompts: AtomicUsize,
    }

    impl Source {
        fn new(status: AuthorizationStatus) -> Self {
            Self {
                enabled: true,
                code: Mutex::new(status.into()),
                prompts: AtomicUsize::new(0),
            }
        }

        fn set(&self, status: AuthorizationStatus) {
            self.set_code(status.into());
        }

        fn set_code(&self, code: i64) {
            *self.code.lock().unwrap() = code;
        }
    }

    impl AuthorizationSource for Source {
        fn is_service_enabled(&self) -> bool {
            self.enabled
        }

        fn authorization_status(&self) -> PermissionResult<AuthorizationStatus> {
            AuthorizationStatus::try_from(*self.code.lock().unwrap())
        }

        fn request_always_authorization(&self) {
            self.prompts.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn recorder() -> (
        Arc<Mutex<Vec<AuthorizationState>>>,
        impl Fn() -> Box<dyn FnOnce(AuthorizationState) + Send>,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let make = move || {
            let sink = sink.clone();
            Box::new(move |state| sink.lock().unwrap().push(state))
                as Box<dyn FnOnce(AuthorizationState) + Send>
        };
        (seen, make)
    }

    #[test]
    fn denied_resolves_immediately() {
        let source = Source::new(AuthorizationStatus::Denied);
        let coordinator = PermissionRequestCoordinator::new();
        let (seen, make) = recorder();

        coordinator.request(&source, make()).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![AuthorizationState::Denied]);
        assert_eq!(coordinator.pending_len(), 0);
        assert_eq!(source.prompts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn undetermined_requests_share_one_prompt() {
        let source = Source::new(AuthorizationStatus::NotDetermined);
        let coordinator = PermissionRequestCoordinator::new();
        let (seen, make) = recorder();

        for _ in 0..5 {
            coordinator.request(&source, make()).unwrap();
        }

        assert_eq!(source.prompts.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.pending_len(), 5);
        assert!(coordinator.is_prompt_in_flight());
        assert!(seen.lock().unwrap().is_empty());

        source.set(AuthorizationStatus::AuthorizedAlways);
        coordinator
            .on_authorization_changed(AuthorizationStatus::AuthorizedAlways)
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![AuthorizationState::Available; 5]);
        assert_eq!(coordinator.pending_len(), 0);
        assert!(!coordinator.is_prompt_in_flight());
    }

    #[test]
    fn not_determined_change_is_ignored() {
        let source = Source::new(AuthorizationStatus::NotDetermined);
        let coordinator = PermissionRequestCoordinator::new();
        let (seen, make) = recorder();

        coordinator.request(&source, make()).unwrap();
        coordinator
            .on_authorization_changed(AuthorizationStatus::NotDetermined)
            .unwrap();

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(coordinator.pending_len(), 1);
        assert!(coordinator.is_prompt_in_flight());
    }

    #[test]
    fn when_in_use_change_is_unexpected() {
        let source = Source::new(AuthorizationStatus::NotDetermined);
        let coordinator = PermissionRequestCoordinator::new();
        let (seen, make) = recorder();

        coordinator.request(&source, make()).unwrap();
        let result =
            coordinator.on_authorization_changed(AuthorizationStatus::AuthorizedWhenInUse);

        assert_eq!(result, Err(PermissionError::UnexpectedStatus { code: 4 }));
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(coordinator.pending_len(), 1);
    }

    #[test]
    fn new_prompt_after_previous_cycle_completes() {
        let source = Source::new(AuthorizationStatus::NotDetermined);
        let coordinator = PermissionRequestCoordinator::new();
        let (_seen, make) = recorder();

        coordinator.request(&source, make()).unwrap();
        coordinator
            .on_authorization_changed(AuthorizationStatus::Denied)
            .unwrap();
        coordinator.request(&source, make()).unwrap();

        assert_eq!(source.prompts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn callbacks_may_reenter() {
        let source = Arc::new(Source::new(AuthorizationStatus::Restricted));
        let coordinator = Arc::new(PermissionRequestCoordinator::new());
        let (seen, make) = recorder();

        let inner = coordinator.clone();
        let inner_source = source.clone();
        let inner_callback = make();
        coordinator
            .request(&*source, move |_| {
                inner.request(&*inner_source, inner_callback).unwrap();
            })
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![AuthorizationState::Restricted]);
    }

    #[test]
    fn callbacks_resolve_in_call_order() {
        let source = Source::new(AuthorizationStatus::NotDetermined);
        let coordinator = PermissionRequestCoordinator::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for index in 0..3 {
            let order = order.clone();
            coordinator
                .request(&source, move |_| order.lock().unwrap().push(index))
                .unwrap();
        }
        coordinator
            .on_authorization_changed(AuthorizationStatus::Denied)
            .unwrap();

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn unknown_status_fails_without_touching_the_queue() {
        let source = Source::new(AuthorizationStatus::NotDetermined);
        let coordinator = PermissionRequestCoordinator::new();
        let (seen, make) = recorder();

        coordinator.request(&source, make()).unwrap();
        source.set_code(42);
        let result = coordinator.request(&source, make());

        assert_eq!(result, Err(PermissionError::UnexpectedStatus { code: 42 }));
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(coordinator.pending_len(), 1);
        assert!(coordinator.is_prompt_in_flight());
        assert_eq!(source.prompts.load(Ordering::SeqCst), 1);

        coordinator
            .on_authorization_changed(AuthorizationStatus::Denied)
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![AuthorizationState::Denied]);
    }

    #[test]
    fn unknown_status_never_prompts() {
        let source = Source::new(AuthorizationStatus::NotDetermined);
        source.set_code(-1);
        let coordinator = PermissionRequestCoordinator::new();
        let (seen, make) = recorder();

        let result = coordinator.request(&source, make());

        assert_eq!(result, Err(PermissionError::UnexpectedStatus { code: -1 }));
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(coordinator.pending_len(), 0);
        assert!(!coordinator.is_prompt_in_flight());
        assert_eq!(source.prompts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn async_request_reports_unknown_status() {
        let source = Source::new(AuthorizationStatus::NotDetermined);
        source.set_code(7);
        let coordinator = PermissionRequestCoordinator::new();

        let pending = coordinator.request_async(&source);

        assert_eq!(
            pending.await,
            Err(PermissionError::UnexpectedStatus { code: 7 })
        );
        assert_eq!(coordinator.pending_len(), 0);
    }

    #[tokio::test]
    async fn async_requests_resolve_together() {
        let source = Source::new(AuthorizationStatus::NotDetermined);
        let coordinator = PermissionRequestCoordinator::new();

        let first = coordinator.request_async(&source);
        let second = coordinator.request_async(&source);
        coordinator
            .on_authorization_changed(AuthorizationStatus::AuthorizedAlways)
            .unwrap();

        assert_eq!(first.await, Ok(AuthorizationState::Available));
        assert_eq!(second.await, Ok(AuthorizationState::Available));
        assert_eq!(source.prompts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropping_the_coordinator_abandons_requests() {
        let source = Source::new(AuthorizationStatus::NotDetermined);
        let coordinator = PermissionRequestCoordinator::new();

        let pending = coordinator.request_async(&source);
        drop(coordinator);

        assert_eq!(pending.await, Err(PermissionError::Abandoned));
    }
}
