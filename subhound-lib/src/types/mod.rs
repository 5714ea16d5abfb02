#![allow(unreachable_pub)]

mod error;
mod record;

pub use error::ErrorKind;
pub use record::{Finding, Record};

/// The subhound `Result` type
pub type Result<T> = std::result::Result<T, crate::ErrorKind>;
