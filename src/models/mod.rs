// src/models/mod.rs

pub mod battery;
pub mod process_step;
pub mod question;
pub mod role;
pub mod scope;
pub mod session;
pub mod user;
