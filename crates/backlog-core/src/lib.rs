pub mod config;
pub mod editor;
pub mod error;
pub mod io;
pub mod orchestrator;
pub mod paths;
pub mod prompts;
pub mod repair;
pub mod reviewer;
pub mod store;
pub mod types;

#[cfg(test)]
mod testing;

pub use error::{BacklogError, ErrorKind, Result};
