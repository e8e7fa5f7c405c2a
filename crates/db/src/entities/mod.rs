//! Database entities.

pub mod notification;
pub mod refund;
pub mod reschedule_request;
pub mod session;
pub mod user;

pub use notification::Entity as Notification;
pub use refund::Entity as Refund;
pub use reschedule_request::Entity as RescheduleRequest;
pub use session::Entity as Session;
pub use user::Entity as User;
