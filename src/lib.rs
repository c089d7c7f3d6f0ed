pub mod app;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod tenant;

#[cfg(test)]
pub mod testing;

pub use app::{router, AppState};
