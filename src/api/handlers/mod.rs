//! REST handlers, grouped by concern.

pub mod admin;
pub mod health;
pub mod tokens;
