use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Address;

/// Written by the mint-authorization collaborator (out of core scope); read
/// here for the leaderboard aggregate view.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NftRecord {
    pub wallet_address: Address,
    pub token_id: String,
    pub score: i64,
    pub rank: i64,
    pub image_url: Option<String>,
    pub minted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
