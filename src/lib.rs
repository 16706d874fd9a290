pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod habits;
pub mod mailer;
pub mod state;
