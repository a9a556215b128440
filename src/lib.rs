pub mod app;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod domain;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod output;
pub mod overlap;
pub mod studies;
pub mod tui;
pub mod view;
