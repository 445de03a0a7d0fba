pub mod cache;
pub mod email;
pub mod sms;

pub use cache::CacheService;
pub use email::EmailService;
pub use sms::TwilioSmsGateway;
