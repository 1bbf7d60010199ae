pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod ratelimit;
pub mod routes;
pub mod store;
