pub mod config;
pub mod engine;
pub mod error;
pub mod negotiator;
pub mod status;
pub mod streams;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use negotiator::*;
pub use status::*;
pub use streams::*;
