pub mod ai;
pub mod audit;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod github;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod prompts;
pub mod rate_limit;
pub mod state;
pub mod throttle;
pub mod validation;
