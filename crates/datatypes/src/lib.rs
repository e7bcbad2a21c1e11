pub mod chain;
pub mod error;
pub mod types;

pub use chain::{ChainConfig, ChainVariant};
pub use error::{Error, ErrorKind, Result};
