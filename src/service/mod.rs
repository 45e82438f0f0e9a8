pub mod auth;
pub mod certificate;
pub mod course;
pub mod crypto;
pub mod dashboard;
pub mod email_queue;
pub mod enrollment;
pub mod incompany;
pub mod interest;
pub mod log;
pub mod mail;
pub mod pdf;
pub mod portal;
pub mod templates;
pub mod user;
