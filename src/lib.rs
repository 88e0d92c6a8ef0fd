//! Free-text movie recommendations backed by zero-shot classification and TMDB.
pub mod app;
pub mod classifier;
pub mod config;
pub mod enrich;
pub mod error;
pub mod interpret;
pub mod models;
pub mod platform;
pub mod query;
pub mod recommend;
pub mod seen;
pub mod taxonomy;
pub mod tmdb;
