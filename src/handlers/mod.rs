// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod battery;
pub mod health;
pub mod process;
pub mod question;
