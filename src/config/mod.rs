//! Configuration module for scrawl
//!
//! Loads config from `$XDG_CONFIG_HOME/scrawl/config.toml` or `~/.config/scrawl/config.toml`.
//! Falls back to embedded defaults if file doesn't exist.
//! Partial configs are merged with defaults using serde's default attributes.
//!
//! # Example
//!
//! ```no_run
//! use scrawl::config::Config;
//!
//! let config = Config::load().expect("Failed to load config");
//! println!("Model: {}", config.model.name);
//! println!("Input size: {}", config.classifier.input_size);
//! ```

pub mod schema;

pub use schema::Config;
