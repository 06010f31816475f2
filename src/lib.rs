pub mod api;
pub mod config;
pub mod error;
pub mod game;
pub mod metrics;
pub mod rate_limit;
pub mod services;
