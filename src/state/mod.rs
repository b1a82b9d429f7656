//! State module for tracking in-flight protocol requests
//!
//! # Components
//!
//! - `QueryState`: Where a single OAI-PMH request is in its lifecycle
//! - `RetryState`: Retry budget bookkeeping for a request that has failed retryably

mod query_state;
mod retry_state;

// Re-export main types
pub use query_state::QueryState;
pub use retry_state::RetryState;
