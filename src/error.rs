use parse_display::Display;

use crate::Token;

/// Returned by [`Optimistic::try_begin`](crate::Optimistic::try_begin) when `max_pending` mutations are already in flight.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("too many pending mutations (limit {limit})")]
pub struct CapacityError {
    pub limit: usize,
}

impl std::error::Error for CapacityError {}

/// Error of [`Optimistic::run`](crate::Optimistic::run).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum RunError<E> {
    /// The mutation was not issued.
    #[display("{0}")]
    Capacity(CapacityError),
    /// The operation failed and the mutation was reverted.
    #[display("operation failed: {0}")]
    Failed(E),
    /// The operation succeeded after the mutation had been reverted, and its value was not applied
    /// because late confirmations are ignored.
    #[display("response for {0} arrived after it was reverted")]
    Discarded(Token),
}

impl<E> RunError<E> {
    pub fn into_failed(self) -> Option<E> {
        match self {
            RunError::Failed(e) => Some(e),
            RunError::Capacity(_) | RunError::Discarded(_) => None,
        }
    }
}

impl<E> std::error::Error for RunError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Capacity(e) => Some(e),
            RunError::Failed(e) => Some(e),
            RunError::Discarded(_) => None,
        }
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ConfigError {
    #[display("`timeout_ms` must be greater than 0")]
    ZeroTimeout,
    #[display("`max_pending` must be greater than 0")]
    ZeroCapacity,
}

impl std::error::Error for ConfigError {}
