pub mod api;
pub mod form;
pub mod twilio;

pub use form::TwilioForm;
