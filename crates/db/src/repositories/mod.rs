//! Database repositories.

mod notification;
mod refund;
mod reschedule_request;
mod session;
mod user;

pub use notification::NotificationRepository;
pub use refund::RefundRepository;
pub use reschedule_request::RescheduleRequestRepository;
pub use session::SessionRepository;
pub use user::UserRepository;
