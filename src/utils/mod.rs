pub mod config;
pub mod errors;
pub mod jwt;
pub mod logger;
