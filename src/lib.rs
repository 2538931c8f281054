pub mod app;
pub mod cache;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod jikan;
pub mod season;
pub mod transform;
