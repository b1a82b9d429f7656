/// Query state definitions for the protocol query client
///
/// A single OAI-PMH request moves through these states:
/// `Idle → Requesting → {Returning | Retrying → Requesting | Failed}`.
use std::fmt;

/// Represents where an in-flight OAI-PMH request currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryState {
    /// Request built but not yet sent
    Idle,

    /// Fetch primitive invoked, waiting for its result
    Requesting,

    /// Last attempt failed with a retryable classification; waiting to retry
    Retrying,

    // ===== Terminal States =====
    /// Response body handed to the caller
    Returning,

    /// Request abandoned with a fatal protocol error
    Failed,
}

impl QueryState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Returning | Self::Failed)
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: QueryState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Requesting)
                | (Self::Requesting, Self::Returning)
                | (Self::Requesting, Self::Retrying)
                | (Self::Requesting, Self::Failed)
                | (Self::Retrying, Self::Requesting)
                | (Self::Retrying, Self::Failed)
        )
    }

    /// Moves to `next`, tracing the transition
    ///
    /// The query client drives every transition itself, so an illegal one is
    /// a programming error rather than a runtime condition.
    pub fn advance(self, next: QueryState, url: &str) -> QueryState {
        debug_assert!(
            self.can_transition_to(next),
            "illegal query transition {} -> {}",
            self,
            next
        );
        tracing::trace!("Query {} : {} -> {}", url, self, next);
        next
    }

    /// Short lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requesting => "requesting",
            Self::Retrying => "retrying",
            Self::Returning => "returning",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
