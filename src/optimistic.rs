use std::{cell::RefCell, future::Future, rc::Rc, time::Instant};

use derive_ex::derive_ex;
use futures::channel::mpsc::unbounded;
use serde::{Deserialize, Serialize};
use slabmap::SlabMap;

use crate::{
    reconciler, Authority, CapacityError, Config, ConfigError, Delta, Notice, NoticeKind,
    Notices, Overlay, PendingTracker, Phase, RunError, Settled, Token,
};


/// Confirmed state plus the speculative mutations layered on top of it.
///
/// Cloning an `Optimistic` yields another handle to the same state.
///
/// All operations are synchronous except [`run`](Self::run), which awaits the remote operation
/// without holding any borrow. Deltas are applied while the state is borrowed, so a delta must not
/// call back into the `Optimistic` it belongs to.
#[derive_ex(Clone, bound())]
pub struct Optimistic<T: 'static>(Rc<OptimisticNode<T>>);

impl<T: 'static> Optimistic<T> {
    /// Creates an `Optimistic` with the default [`Config`].
    pub fn new(value: T) -> Self {
        Self::from_parts(value, Config::default())
    }

    /// Creates an `Optimistic` with the given [`Config`].
    pub fn with_config(value: T, config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(value, config))
    }
    fn from_parts(value: T, config: Config) -> Self {
        Self(Rc::new(OptimisticNode {
            data: RefCell::new(OptimisticData {
                authority: Authority::new(value),
                pending: PendingTracker::new(),
            }),
            observers: RefCell::new(SlabMap::new()),
            config,
        }))
    }

    pub fn config(&self) -> &Config {
        &self.0.config
    }

    /// Returns the confirmed value with all pending mutations applied in issuance order.
    pub fn view(&self) -> T
    where
        T: Clone,
    {
        let d = self.0.data.borrow();
        d.overlay().value()
    }

    /// Calls `f` with the optimistic view.
    pub fn with_view<U>(&self, f: impl FnOnce(&T) -> U) -> U
    where
        T: Clone,
    {
        f(&self.view())
    }

    /// Returns the last confirmed value.
    pub fn authoritative(&self) -> T
    where
        T: Clone,
    {
        self.with_authoritative(|value| value.clone())
    }

    /// Calls `f` with the last confirmed value.
    pub fn with_authoritative<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        f(self.0.data.borrow().authority.get())
    }

    /// Number of confirmations applied so far.
    pub fn revision(&self) -> u64 {
        self.0.data.borrow().authority.revision()
    }

    /// Issues a speculative mutation and returns its token.
    ///
    /// `Config::max_pending` is not checked. Use [`try_begin`](Self::try_begin) to honor it.
    pub fn begin(&self, delta: impl Delta<T>) -> Token {
        let token = self.0.data.borrow_mut().begin(Rc::new(delta));
        self.0.notify(&[Notice {
            token,
            kind: NoticeKind::Begun,
        }]);
        token
    }

    /// Issues a speculative mutation unless `Config::max_pending` mutations are already pending.
    pub fn try_begin(&self, delta: impl Delta<T>) -> Result<Token, CapacityError> {
        if let Some(limit) = self.0.config.max_pending {
            if self.pending_len() >= limit {
                tracing::debug!(limit, "mutation rejected");
                return Err(CapacityError { limit });
            }
        }
        Ok(self.begin(delta))
    }

    /// Discards the pending mutation identified by `token`.
    ///
    /// Returns `false` if `token` is no longer pending. Calling this more than once is harmless.
    pub fn end(&self, token: Token) -> bool {
        let settled = reconciler::revert(&mut self.0.data.borrow_mut().pending, token);
        self.0.notify_settled(settled);
        settled.is_some()
    }

    /// Writes the server-confirmed `canonical` value and retires the pending mutation.
    pub fn confirm(&self, token: Token, canonical: T) -> Option<Settled> {
        self.settle::<()>(token, Ok(canonical))
    }

    /// Resolves `token` with the outcome of its operation: `Ok` confirms, `Err` reverts.
    pub fn settle<E>(&self, token: Token, result: Result<T, E>) -> Option<Settled> {
        let settled = {
            let d = &mut *self.0.data.borrow_mut();
            reconciler::settle(
                &mut d.authority,
                &mut d.pending,
                token,
                result,
                self.0.config.late_confirmation,
            )
        };
        self.0.notify_settled(settled);
        settled
    }

    /// Returns the lifecycle phase of `token`, or `None` if this `Optimistic` never issued it.
    pub fn phase(&self, token: Token) -> Option<Phase> {
        self.0.data.borrow().pending.phase(token)
    }
    pub fn is_pending(&self, token: Token) -> bool {
        self.0.data.borrow().pending.contains(token)
    }
    pub fn pending_len(&self) -> usize {
        self.0.data.borrow().pending.len()
    }
    pub fn pending_tokens(&self) -> Vec<Token> {
        self.0.data.borrow().pending.tokens()
    }

    /// Reverts every mutation that has been pending longer than `Config::timeout_ms`.
    pub fn expire(&self) -> Vec<Token> {
        self.expire_at(Instant::now())
    }

    /// Same as [`expire`](Self::expire), measuring age relative to `now`.
    pub fn expire_at(&self, now: Instant) -> Vec<Token> {
        let Some(timeout) = self.0.config.timeout() else {
            return Vec::new();
        };
        let Some(deadline) = now.checked_sub(timeout) else {
            return Vec::new();
        };
        let mut notices = Vec::new();
        let tokens = {
            let mut d = self.0.data.borrow_mut();
            let tokens = d.pending.expired(deadline);
            for &token in &tokens {
                if reconciler::revert(&mut d.pending, token).is_some() {
                    tracing::debug!(%token, "expired");
                    notices.push(Notice {
                        token,
                        kind: NoticeKind::Expired,
                    });
                }
            }
            tokens
        };
        self.0.notify(&notices);
        tokens
    }

    /// Issues `delta`, awaits `operation` and settles the mutation with its outcome.
    ///
    /// The outcome is returned so that the caller can report failures or retry.
    /// If the returned future is dropped before `operation` completes, the mutation is reverted.
    ///
    /// If the mutation was reverted while `operation` was in flight (by [`end`](Self::end) or
    /// [`expire`](Self::expire)) and `Config::late_confirmation` is `ignore`, a successful value
    /// is not applied and [`RunError::Discarded`] is returned.
    pub async fn run<E>(
        &self,
        delta: impl Delta<T>,
        operation: impl Future<Output = Result<T, E>>,
    ) -> Result<T, RunError<E>>
    where
        T: Clone,
    {
        let token = self.try_begin(delta).map_err(RunError::Capacity)?;
        let guard = RevertOnDrop {
            owner: self,
            token: Some(token),
        };
        let result = operation.await;
        guard.disarm();
        match result {
            Ok(canonical) => match self.confirm(token, canonical.clone()) {
                Some(_) => Ok(canonical),
                None => Err(RunError::Discarded(token)),
            },
            Err(e) => {
                self.end(token);
                Err(RunError::Failed(e))
            }
        }
    }

    /// Registers `f` to be called after every change.
    ///
    /// `f` is called after the state has been updated and released, so it may read or modify it.
    pub fn subscribe(&self, f: impl Fn(&Notice) + 'static) -> Subscription {
        let key = self.0.observers.borrow_mut().insert(Rc::new(f));
        let node = Rc::downgrade(&self.0);
        Subscription(Some(Box::new(move || {
            if let Some(node) = node.upgrade() {
                node.observers.borrow_mut().remove(key);
            }
        })))
    }

    /// Returns a stream of changes made after this call.
    pub fn notices(&self) -> Notices {
        let (sender, receiver) = unbounded();
        let subscription = self.subscribe(move |notice| {
            let _ = sender.unbounded_send(*notice);
        });
        Notices::new(receiver, subscription)
    }

    pub fn snapshot(&self) -> Snapshot<T>
    where
        T: Clone,
    {
        let d = self.0.data.borrow();
        Snapshot {
            authoritative: d.authority.get().clone(),
            view: d.overlay().value(),
            pending: d.pending.tokens(),
            revision: d.authority.revision(),
        }
    }
}
impl<T: Clone + std::fmt::Debug> std::fmt::Debug for Optimistic<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.data.try_borrow() {
            Ok(d) => std::fmt::Debug::fmt(&d.overlay().value(), f),
            Err(_) => write!(f, "<borrowed>"),
        }
    }
}

/// Serializes the confirmed value only. Pending mutations are not persisted.
impl<T> Serialize for Optimistic<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        match self.0.data.try_borrow() {
            Ok(d) => T::serialize(d.authority.get(), serializer),
            Err(_) => Err(serde::ser::Error::custom("borrowed")),
        }
    }
}
impl<'de, T> Deserialize<'de> for Optimistic<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Optimistic<T>, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Optimistic::new)
    }
}

/// Keeps an observer registered. Dropping it unregisters the observer.
#[must_use]
pub struct Subscription(Option<Box<dyn FnOnce()>>);

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.0.take() {
            unsubscribe();
        }
    }
}
impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Subscription")
    }
}

/// Point-in-time copy of an [`Optimistic`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot<T> {
    pub authoritative: T,
    pub view: T,
    pub pending: Vec<Token>,
    pub revision: u64,
}

struct OptimisticNode<T: 'static> {
    data: RefCell<OptimisticData<T>>,
    observers: RefCell<SlabMap<Rc<dyn Fn(&Notice)>>>,
    config: Config,
}
impl<T: 'static> OptimisticNode<T> {
    fn notify(&self, notices: &[Notice]) {
        if notices.is_empty() {
            return;
        }
        let observers: Vec<_> = self.observers.borrow().values().cloned().collect();
        for notice in notices {
            for observer in &observers {
                observer(notice);
            }
        }
    }
    fn notify_settled(&self, settled: Option<Settled>) {
        let Some(settled) = settled else {
            return;
        };
        let kind = match settled.phase {
            Phase::Confirmed => NoticeKind::Confirmed,
            Phase::Reverted => NoticeKind::Reverted,
            Phase::Issued => return,
        };
        self.notify(&[Notice {
            token: settled.token,
            kind,
        }]);
    }
}

struct OptimisticData<T: 'static> {
    authority: Authority<T>,
    pending: PendingTracker<T>,
}
impl<T: 'static> OptimisticData<T> {
    fn overlay(&self) -> Overlay<'_, T> {
        Overlay::new(&self.authority, &self.pending)
    }
    fn begin(&mut self, delta: Rc<dyn Delta<T>>) -> Token {
        let token = self.pending.begin_rc(delta, Instant::now());
        tracing::debug!(%token, pending = self.pending.len(), "begun");
        token
    }
}

struct RevertOnDrop<'a, T: 'static> {
    owner: &'a Optimistic<T>,
    token: Option<Token>,
}
impl<T: 'static> RevertOnDrop<'_, T> {
    fn disarm(mut self) {
        self.token = None;
    }
}
impl<T: 'static> Drop for RevertOnDrop<'_, T> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            tracing::debug!(%token, "operation abandoned");
            self.owner.end(token);
        }
    }
}
