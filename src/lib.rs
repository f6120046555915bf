//! Client core for the StageBloom internship platform: typed REST client,
//! application wizard and interview negotiation workflow.

pub mod api;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use api::ApiClient;
pub use utils::{config::Config, errors::AppError};
