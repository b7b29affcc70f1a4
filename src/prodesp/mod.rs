pub mod client;
pub mod error;
pub mod types;

pub use client::{ProdespClient, StudentLookup};
pub use error::ProdespError;
pub use types::{LookupQuery, LookupResult, classify};
