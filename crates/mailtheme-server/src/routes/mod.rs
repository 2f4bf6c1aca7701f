//! HTTP routes

pub mod api;
pub mod preview;
