#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod protocol;
pub mod scheduler;

pub use error::Error;
