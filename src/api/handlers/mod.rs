//! API handlers for the Folioforge accounts service.

pub mod auth;
pub mod health;
pub mod root;
