// Library exports for testing
pub mod api;
pub mod archive;
pub mod cli;
pub mod config;
pub mod selection;
pub mod service;
pub mod status;
