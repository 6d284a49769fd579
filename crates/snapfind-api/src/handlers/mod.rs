//! HTTP handlers.

pub mod health;
pub mod match_face;
