pub mod mailer;
pub mod notification_service;
pub mod sale_service;
pub mod sweep_service;
