use std::{collections::VecDeque, rc::Rc, time::Instant};

use derive_ex::{derive_ex, Ex};
use parse_display::Display;
use serde::{Deserialize, Serialize};

use crate::{Delta, Phase};

#[cfg(test)]
mod tests;

/// Identifies a pending mutation.
///
/// Tokens are ordered by issuance and are never reused by the tracker that issued them.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Display, Serialize, Deserialize,
)]
#[display("#{0}")]
#[serde(transparent)]
pub struct Token(u64);

impl Token {
    pub fn to_u64(self) -> u64 {
        self.0
    }
}

/// A speculative change that has been issued but not yet resolved.
#[derive_ex(Clone, bound())]
pub struct PendingMutation<T: 'static> {
    token: Token,
    delta: Rc<dyn Delta<T>>,
    issued_at: Instant,
}

impl<T: 'static> PendingMutation<T> {
    pub fn token(&self) -> Token {
        self.token
    }
    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }
    pub fn delta(&self) -> &dyn Delta<T> {
        &*self.delta
    }
    pub fn apply(&self, state: &T) -> T {
        self.delta.apply(state)
    }
}
impl<T: 'static> std::fmt::Debug for PendingMutation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingMutation")
            .field("token", &self.token)
            .field("issued_at", &self.issued_at)
            .finish_non_exhaustive()
    }
}

/// Records in-flight mutations in issuance order.
///
/// The tracker also remembers how every retired token ended, so a token is settled at most once
/// and a token it never issued is recognized as unknown.
#[derive(Ex)]
#[derive_ex(Default, bound())]
#[default(Self::new())]
pub struct PendingTracker<T: 'static> {
    phases: Vec<Phase>,
    items: VecDeque<PendingMutation<T>>,
}

impl<T: 'static> PendingTracker<T> {
    pub fn new() -> Self {
        Self {
            phases: Vec::new(),
            items: VecDeque::new(),
        }
    }

    /// Appends a new pending mutation issued now.
    pub fn begin(&mut self, delta: impl Delta<T>) -> Token {
        self.begin_at(delta, Instant::now())
    }

    /// Appends a new pending mutation with an explicit issue time.
    pub fn begin_at(&mut self, delta: impl Delta<T>, issued_at: Instant) -> Token {
        self.begin_rc(Rc::new(delta), issued_at)
    }
    pub(crate) fn begin_rc(&mut self, delta: Rc<dyn Delta<T>>, issued_at: Instant) -> Token {
        let token = Token(self.phases.len() as u64);
        self.phases.push(Phase::Issued);
        self.items.push_back(PendingMutation {
            token,
            delta,
            issued_at,
        });
        token
    }

    /// Removes the mutation identified by `token` and records it as reverted.
    ///
    /// Returns `None` if `token` is unknown or was already removed.
    pub fn end(&mut self, token: Token) -> Option<PendingMutation<T>> {
        self.retire(token, Phase::Reverted)
    }

    /// Removes the mutation identified by `token` and records `phase` as its outcome.
    pub(crate) fn retire(&mut self, token: Token, phase: Phase) -> Option<PendingMutation<T>> {
        let index = self.index_of(token)?;
        self.phases[Self::slot(token)?] = phase;
        self.items.remove(index)
    }

    /// Marks a reverted token as confirmed by a response that arrived after it was retired.
    ///
    /// Returns `false` unless `token` is currently recorded as reverted.
    pub(crate) fn confirm_retired(&mut self, token: Token) -> bool {
        let Some(phase) = Self::slot(token).and_then(|i| self.phases.get_mut(i)) else {
            return false;
        };
        if *phase != Phase::Reverted {
            return false;
        }
        *phase = Phase::Confirmed;
        true
    }

    /// Returns where `token` is in its lifecycle, or `None` if this tracker never issued it.
    pub fn phase(&self, token: Token) -> Option<Phase> {
        Self::slot(token).and_then(|i| self.phases.get(i)).copied()
    }

    pub fn contains(&self, token: Token) -> bool {
        self.phase(token) == Some(Phase::Issued)
    }
    fn index_of(&self, token: Token) -> Option<usize> {
        if !self.contains(token) {
            return None;
        }
        self.items
            .binary_search_by_key(&token, |m| m.token)
            .ok()
    }
    fn slot(token: Token) -> Option<usize> {
        usize::try_from(token.0).ok()
    }

    /// Returns pending mutations in issuance order.
    pub fn list(&self) -> impl DoubleEndedIterator<Item = &PendingMutation<T>> + '_ {
        self.items.iter()
    }

    /// Returns pending deltas in issuance order.
    pub fn deltas(&self) -> impl DoubleEndedIterator<Item = &dyn Delta<T>> + '_ {
        self.items.iter().map(|m| m.delta())
    }
    pub fn tokens(&self) -> Vec<Token> {
        self.items.iter().map(|m| m.token).collect()
    }

    /// Returns the tokens of mutations issued at or before `deadline`.
    pub fn expired(&self, deadline: Instant) -> Vec<Token> {
        self.items
            .iter()
            .filter(|m| m.issued_at <= deadline)
            .map(|m| m.token)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
impl<T: 'static> std::fmt::Debug for PendingTracker<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.items.iter().map(|m| m.token)).finish()
    }
}
