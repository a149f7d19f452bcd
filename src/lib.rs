#![doc = "The `taskguard` library crate."]
#![doc = ""]
#![doc = "Domain models, the record store, authentication, the task guards,"]
#![doc = "routing configuration and error handling for the TaskGuard API."]
#![doc = "The binary (`main.rs`) wires these into an `HttpServer`."]

pub mod auth;
pub mod config;
pub mod error;
pub mod guards;
pub mod logging;
pub mod models;
pub mod routes;
pub mod store;

pub use crate::error::AppError;
pub use crate::store::RecordStore;
