// Utility functions module

pub mod config;
pub mod database;
pub mod schema;
