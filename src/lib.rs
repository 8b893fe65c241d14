pub mod app;
pub mod config;
pub mod diet;
pub mod state;
