//! Background processing for peersup.
//!
//! This crate hosts the interval-driven scheduler that enforces the
//! reschedule workflow's time-based transitions:
//!
//! - **Deadline sweep**: settles pending reschedule requests whose response
//!   deadline has passed (auto-cancel + refund, or plain expiry)
//! - **Refund settlement**: settles recorded refunds with the payment
//!   provider
//! - **Cleanup**: prunes old terminal requests
//!
//! It also provides the webhook-backed [`WebhookPush`] transport for the
//! core notification service.

pub mod executor;
pub mod push;
pub mod scheduler;

pub use executor::WorkflowExecutor;
pub use push::WebhookPush;
pub use scheduler::{JobExecutor, SchedulerConfig, run_scheduler};
