//! Delivery side of the courier queue
//!
//! This crate provides:
//! - The [`Transport`] seam a message is handed to for delivery
//! - The [`RetryPolicy`] that decides when a message is abandoned
//! - The [`Dispatcher`], which owns the in-memory work queue, the periodic
//!   reconciliation sweep and the single consumer task driving attempts
//! - [`DeliveryQueryService`] for status and audit queries

mod config;
mod dispatcher;
mod error;
pub mod policy;
mod service;
mod transport;

pub use config::DispatcherConfig;
pub use dispatcher::Dispatcher;
pub use error::DeliveryError;
pub use policy::{GiveUpReason, RetryDecision, RetryPolicy};
pub use service::{DeliveryQueryService, MessageStatus};
pub use transport::{LogTransport, Transport, TransportError};
