//! Applies configured handlers to documents

pub mod executor;

pub use executor::HandlerExecutor;
