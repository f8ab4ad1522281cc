//! HTTP handlers

pub mod health;
pub mod attendance;
pub mod locations;
pub mod offices;
