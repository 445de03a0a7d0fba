// Notification building blocks: channel gateway contracts, the message
// template renderer, and the persistence seams used by the due-date
// notifier batch job.

pub mod gateway;
pub mod store;
pub mod template;

pub use gateway::{GatewayError, MailGateway, SmsGateway};
pub use store::{CustomerStore, DeliveryLog, TemplateStore};
