use std::time::Duration;

use serde::Deserialize;

use super::Error;

/// One page of a scanner "transactions addressed to this contract" query.
/// Pagination is opaque to us; `next_token` is echoed back verbatim on the
/// next call and persisted in `contract_scan_cursors`.
#[derive(Clone, Debug, Deserialize)]
pub struct ScannerPage {
    #[serde(rename = "hashes")]
    pub tx_hashes: Vec<String>,
    #[serde(rename = "nextToken")]
    pub next_token: Option<String>,
}

pub struct ScannerClient {
    base_url: String,
    http: reqwest::Client,
}

impl ScannerClient {
    pub fn new(base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .expect("reqwest client builder with static config never fails");
        Self { base_url, http }
    }

    /// Fetches one page of transaction hashes addressed to `contract_address`,
    /// continuing from `cursor` when present.
    pub async fn list_transactions(
        &self,
        contract_address: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<ScannerPage, Error> {
        let mut query = vec![
            ("address".to_string(), contract_address.to_string()),
            ("limit".to_string(), page_size.to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("next".to_string(), cursor.to_string()));
        }
        let resp = self
            .http
            .get(format!("{}/v1/transactions", self.base_url))
            .query(&query)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::Status(resp.status().as_u16()));
        }
        resp.json::<ScannerPage>()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}
