// src/services/mod.rs
pub mod auth_service;
pub mod booking_service;
pub mod credential_store;
pub mod mailer;
pub mod password_service;
pub mod room_service;
pub mod token_service;
pub mod user_service;
