pub mod bbox;
pub mod calculator;
pub mod combinator;
pub mod config;
pub mod error;
pub mod readers;
pub mod stats;
pub mod tiles;
pub mod writers;

pub use error::{Error, Result};
