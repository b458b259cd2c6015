use serde::{Deserialize, Serialize};

/// A human-visible grouping of one or more contracts (e.g. a DEX brand).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Platform {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub logo_url: Option<String>,
    pub website_url: Option<String>,
}
