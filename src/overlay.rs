use crate::{Authority, Delta, PendingTracker};


/// Applies `deltas` to `state` in order, returning `dn(...d2(d1(state)))`.
///
/// Returns a clone of `state` if `deltas` is empty.
pub fn fold<'a, T, D>(state: &T, deltas: impl IntoIterator<Item = &'a D>) -> T
where
    T: Clone,
    D: Delta<T> + ?Sized + 'a,
{
    let mut deltas = deltas.into_iter();
    let Some(first) = deltas.next() else {
        return state.clone();
    };
    deltas.fold(first.apply(state), |acc, d| d.apply(&acc))
}

/// The speculative view of an [`Authority`] with pending mutations applied on top.
///
/// The value is recomputed on every call to [`value`](Self::value).
pub struct Overlay<'a, T: 'static> {
    authority: &'a Authority<T>,
    pending: &'a PendingTracker<T>,
}

impl<'a, T: 'static> Overlay<'a, T> {
    pub fn new(authority: &'a Authority<T>, pending: &'a PendingTracker<T>) -> Self {
        Self { authority, pending }
    }

    pub fn value(&self) -> T
    where
        T: Clone,
    {
        fold(self.authority.get(), self.pending.deltas())
    }

    /// Returns `true` if the view differs from the authority by at least one pending mutation.
    pub fn is_speculative(&self) -> bool {
        !self.pending.is_empty()
    }
}
