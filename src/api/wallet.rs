//! Custom extractor enforcing the wallet-path invariant once: every wallet
//! path normalizes the address to lowercase and rejects anything that is
//! not a 40-hex-digit string prefixed with `0x`, shared by every
//! wallet-scoped route instead of re-validating in each handler.

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

use crate::domain::Address;

use super::error::ApiError;
use super::state::AppState;

pub struct WalletAddress(pub Address);

impl FromRequestParts<AppState> for WalletAddress {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Path(raw): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::BadRequest("missing wallet path segment".into()))?;
        let address = Address::parse(&raw)
            .map_err(|e| ApiError::BadRequest(format!("invalid wallet address: {e}")))?;
        Ok(WalletAddress(address))
    }
}
