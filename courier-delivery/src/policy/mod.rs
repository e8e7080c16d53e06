//! Policy abstractions for delivery operations.
//!
//! Policies are pure: they take the facts about a message and return a
//! decision, with no I/O, so they can be tested without a dispatcher.

pub mod retry;

pub use retry::{GiveUpReason, RetryDecision, RetryPolicy};
