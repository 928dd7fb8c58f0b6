use std::marker::PhantomData;


/// A speculative change to a value of type `T`.
///
/// `apply` must be pure: the overlay is recomputed from scratch on every observation,
/// so the same delta is applied many times to (possibly different) base values.
///
/// Any `Fn(&T) -> T + 'static` is a `Delta<T>`.
pub trait Delta<T>: 'static {
    fn apply(&self, state: &T) -> T;
}
impl<T, F> Delta<T> for F
where
    F: Fn(&T) -> T + 'static,
{
    fn apply(&self, state: &T) -> T {
        self(state)
    }
}

/// Creates a delta that applies `action` to the state with `reducer`.
///
/// This is the reducer form of an optimistic update, where the pending entry records
/// *what the user did* and a single function describes how actions change the state.
pub fn reduce<T, A>(action: A, reducer: fn(&T, &A) -> T) -> Reduce<T, A>
where
    T: 'static,
    A: 'static,
{
    Reduce {
        action,
        reducer,
        _phantom: PhantomData,
    }
}

/// Delta returned by [`reduce`].
pub struct Reduce<T, A> {
    action: A,
    reducer: fn(&T, &A) -> T,
    _phantom: PhantomData<fn(&T) -> T>,
}
impl<T, A> Reduce<T, A> {
    pub fn action(&self) -> &A {
        &self.action
    }
}
impl<T: 'static, A: 'static> Delta<T> for Reduce<T, A> {
    fn apply(&self, state: &T) -> T {
        (self.reducer)(state, &self.action)
    }
}
