pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod http;
pub mod router;
pub mod services;
pub mod types;
