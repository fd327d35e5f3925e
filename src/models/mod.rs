// src/models/mod.rs
pub mod auth;
pub mod booking;
pub mod room;
pub mod user;
