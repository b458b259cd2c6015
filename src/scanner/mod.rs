mod client;
mod error;

pub use client::{ScannerClient, ScannerPage};
pub use error::Error;
