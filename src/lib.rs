pub mod broker;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gateway;
pub mod identity;

pub use error::{Error, Result};
