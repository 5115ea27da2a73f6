pub mod canvas;
pub mod classifier;
pub mod config;
pub mod error;
pub mod models;
pub mod notifications;
pub mod pad;

pub use error::{Result, ScrawlError};
