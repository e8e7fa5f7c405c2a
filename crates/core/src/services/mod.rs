//! Business logic services.

#![allow(missing_docs)]

pub mod deadline;
pub mod notification;
pub mod payments;
pub mod push;
pub mod refund;
pub mod reschedule;
pub mod session;
pub mod user;

pub use deadline::{
    RESPONSE_LEAD_HOURS, TimeUntilDeadline, URGENT_THRESHOLD_MINUTES, response_deadline_for,
    time_until_deadline,
};
pub use notification::NotificationService;
pub use payments::{NoOpGateway, PaymentGateway};
pub use push::{NoOpPush, PushDelivery, PushPayload};
pub use refund::{MAX_SETTLEMENT_ATTEMPTS, RefundService};
pub use reschedule::{ProposeRescheduleInput, RescheduleService};
pub use session::{CreateSessionInput, SessionService};
pub use user::{CreateUserInput, UserService};
