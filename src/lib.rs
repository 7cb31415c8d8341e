//! Drying estimates for outdoor climbing rock.
//!
//! The [`logic`] module holds the pure calculators plus the pool-based batch
//! paths; [`datasources`] defines where routes, weather and canopy cover come
//! from.

pub mod config;
pub mod datasources;
pub mod error;
pub mod logic;
pub mod models;

pub use config::Config;
pub use error::{CragError, Result};
