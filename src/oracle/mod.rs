mod client;
mod error;

pub use client::{HttpPriceOracle, PriceOracle};
pub use error::Error;
