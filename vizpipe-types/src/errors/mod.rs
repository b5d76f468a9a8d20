pub mod config;
pub mod internal;
