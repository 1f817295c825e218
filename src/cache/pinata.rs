//! Pinata pinning-service client.
//!
//! Stores cache payloads (and published artifacts) as pinned JSON on IPFS.
//! Pin metadata carries the fingerprint and creation time so entries can be
//! rediscovered through the pin list without the local index.
//!
//! See: <https://docs.pinata.cloud/api-reference>

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use super::backend::{CacheBackend, CachePayload, ContentId, PinRecord};
use crate::fingerprint::Fingerprint;
use crate::types::Dataset;
use crate::{Result, SolverError};

/// Default Pinata API base URL
pub const DEFAULT_API_URL: &str = "https://api.pinata.cloud";

/// Gateways tried in order when downloading pinned content.
pub const DEFAULT_GATEWAYS: &[&str] = &["https://gateway.pinata.cloud", "https://ipfs.io"];

/// `keyvalues.type` marking cache entries owned by this system.
const CACHE_ENTRY_TYPE: &str = "rfd_cache";

/// `keyvalues.type` marking published solution artifacts.
const SOLUTION_TYPE: &str = "rfd_solution";

/// Largest `pageLimit` the pin list accepts.
pub const PIN_LIST_PAGE_LIMIT: u32 = 1000;

/// Pinata credentials.
#[derive(Clone, PartialEq, Eq)]
pub enum PinataAuth {
    /// `pinata_api_key` + `pinata_secret_api_key` headers.
    ApiKey { key: String, secret: String },
    /// `Authorization: Bearer <jwt>`.
    Jwt(String),
}

impl fmt::Debug for PinataAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinataAuth::ApiKey { .. } => f.write_str("PinataAuth::ApiKey(<redacted>)"),
            PinataAuth::Jwt(_) => f.write_str("PinataAuth::Jwt(<redacted>)"),
        }
    }
}

/// Client for the Pinata API and IPFS gateways.
#[derive(Clone)]
pub struct PinataClient {
    auth: PinataAuth,
    http: Client,
    api_url: String,
    gateways: Vec<String>,
    page_limit: u32,
}

impl PinataClient {
    /// Create a client against the public Pinata API.
    pub fn new(auth: PinataAuth, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SolverError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            auth,
            http,
            api_url: DEFAULT_API_URL.to_string(),
            gateways: DEFAULT_GATEWAYS.iter().map(|g| g.to_string()).collect(),
            page_limit: PIN_LIST_PAGE_LIMIT,
        })
    }

    /// Override the API base URL (for testing with wiremock).
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Override the download gateways, tried in order.
    pub fn gateways<I, S>(mut self, gateways: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.gateways = gateways.into_iter().map(Into::into).collect();
        self
    }

    /// Override the pin list page size, clamped to `1..=1000`.
    pub fn page_limit(mut self, limit: u32) -> Self {
        self.page_limit = limit.clamp(1, PIN_LIST_PAGE_LIMIT);
        self
    }

    /// Pin a JSON document, returning its CID.
    pub async fn pin_json(
        &self,
        content: &impl Serialize,
        name: &str,
        keyvalues: Map<String, Value>,
    ) -> Result<ContentId> {
        let url = format!("{}/pinning/pinJSONToIPFS", self.api_url);
        let body = json!({
            "pinataContent": content,
            "pinataMetadata": {
                "name": name,
                "keyvalues": keyvalues,
            },
        });

        let response = self.authorize(self.http.post(&url)).json(&body).send().await?;
        let response = handle_response_errors(response, name).await?;
        let pinned: PinResponse = response.json().await?;
        debug!(cid = %pinned.ipfs_hash, name, "pinned JSON");
        Ok(ContentId::new(pinned.ipfs_hash))
    }

    /// Download a pinned JSON document through the gateways.
    ///
    /// Each gateway is tried in order; the last failure is returned if none
    /// succeeds.
    pub async fn fetch_json<T: serde::de::DeserializeOwned>(&self, cid: &ContentId) -> Result<T> {
        let mut last_err = SolverError::Configuration("no IPFS gateways configured".into());
        for gateway in &self.gateways {
            let url = format!("{}/ipfs/{}", gateway.trim_end_matches('/'), cid);
            match self.fetch_from(&url, cid).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!(gateway = %gateway, cid = %cid, error = %e, "gateway fetch failed");
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    async fn fetch_from<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        cid: &ContentId,
    ) -> Result<T> {
        let response = self.http.get(url).send().await?;
        let response = handle_response_errors(response, cid.as_str()).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// List pinned items whose metadata matches every `keyvalues` pair.
    ///
    /// Follows `pageOffset` until a short page comes back, so every match is
    /// returned. A failure on any page fails the whole listing.
    pub async fn pin_list(&self, keyvalues: &[(&str, &str)]) -> Result<Vec<PinListRow>> {
        let url = format!("{}/data/pinList", self.api_url);
        let filter: Map<String, Value> = keyvalues
            .iter()
            .map(|(k, v)| (k.to_string(), json!({ "value": v, "op": "eq" })))
            .collect();
        let filter = Value::Object(filter).to_string();

        let mut rows = Vec::new();
        let mut offset: u32 = 0;
        loop {
            let query = [
                ("status", "pinned".to_string()),
                ("pageLimit", self.page_limit.to_string()),
                ("pageOffset", offset.to_string()),
                ("metadata[keyvalues]", filter.clone()),
            ];
            let response = self
                .authorize(self.http.get(&url))
                .query(&query)
                .send()
                .await?;
            let response = handle_response_errors(response, "pinList").await?;
            let page: PinListResponse = response.json().await?;

            let fetched = page.rows.len();
            rows.extend(page.rows);
            if fetched < self.page_limit as usize {
                break;
            }
            offset += self.page_limit;
        }
        debug!(count = rows.len(), "listed pins");
        Ok(rows)
    }

    /// Remove a pin.
    pub async fn unpin(&self, cid: &ContentId) -> Result<()> {
        let url = format!("{}/pinning/unpin/{}", self.api_url, cid);
        let response = self.authorize(self.http.delete(&url)).send().await?;
        handle_response_errors(response, cid.as_str()).await?;
        debug!(cid = %cid, "unpinned");
        Ok(())
    }

    /// Verify the credentials against the API.
    pub async fn test_authentication(&self) -> Result<()> {
        let url = format!("{}/data/testAuthentication", self.api_url);
        let response = self.authorize(self.http.get(&url)).send().await?;
        handle_response_errors(response, "testAuthentication").await?;
        Ok(())
    }

    /// Publish a solved dataset as `<rfd_id>_solution.json`.
    pub async fn pin_artifact(&self, dataset: &Dataset) -> Result<ContentId> {
        let name = crate::artifact::solution_file_name(&dataset.rfd_id);
        let mut keyvalues = Map::new();
        keyvalues.insert("type".into(), json!(SOLUTION_TYPE));
        keyvalues.insert("rfd_id".into(), json!(dataset.rfd_id));
        keyvalues.insert("cache_key".into(), json!(dataset.metadata.fingerprint.to_hex()));
        self.pin_json(dataset, &name, keyvalues).await
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            PinataAuth::ApiKey { key, secret } => request
                .header("pinata_api_key", key)
                .header("pinata_secret_api_key", secret),
            PinataAuth::Jwt(token) => request.bearer_auth(token),
        }
    }
}

#[async_trait]
impl CacheBackend for PinataClient {
    fn name(&self) -> &str {
        "pinata"
    }

    async fn pin(&self, payload: &CachePayload) -> Result<ContentId> {
        let key = payload.cache_key.to_hex();
        let name = format!("rfd_cache_{key}");
        let mut keyvalues = Map::new();
        keyvalues.insert("type".into(), json!(CACHE_ENTRY_TYPE));
        keyvalues.insert("cache_key".into(), json!(key));
        keyvalues.insert("created_at".into(), json!(payload.timestamp.to_string()));
        self.pin_json(payload, &name, keyvalues).await
    }

    async fn fetch(&self, cid: &ContentId) -> Result<CachePayload> {
        self.fetch_json(cid).await
    }

    async fn list(&self) -> Result<Vec<PinRecord>> {
        let rows = self.pin_list(&[("type", CACHE_ENTRY_TYPE)]).await?;
        Ok(rows.into_iter().filter_map(PinListRow::into_record).collect())
    }

    async fn lookup(&self, key: &Fingerprint) -> Result<Option<PinRecord>> {
        let hex = key.to_hex();
        let rows = self
            .pin_list(&[("type", CACHE_ENTRY_TYPE), ("cache_key", &hex)])
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(PinListRow::into_record)
            .filter(|record| record.key == *key)
            .max_by_key(|record| record.created_at))
    }

    async fn unpin(&self, cid: &ContentId) -> Result<()> {
        PinataClient::unpin(self, cid).await
    }

    async fn check(&self) -> Result<()> {
        self.test_authentication().await
    }
}

/// Map a non-success response to an error, consuming the body for context.
async fn handle_response_errors(
    response: reqwest::Response,
    target: &str,
) -> Result<reqwest::Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        401 | 403 => Err(SolverError::AuthenticationFailed),
        404 => Err(SolverError::NotFound(target.to_string())),
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(SolverError::RateLimited { retry_after })
        }
        code => {
            let body = response.text().await.unwrap_or_default();
            Err(SolverError::Api {
                status: code,
                message: format!("Pinata error: {}", body.trim()),
            })
        }
    }
}

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

#[derive(Deserialize)]
struct PinListResponse {
    #[serde(default)]
    rows: Vec<PinListRow>,
}

/// One row of `GET /data/pinList`.
#[derive(Debug, Clone, Deserialize)]
pub struct PinListRow {
    pub ipfs_pin_hash: String,
    #[serde(default)]
    pub date_pinned: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: PinMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PinMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub keyvalues: Option<Map<String, Value>>,
}

impl PinListRow {
    /// Convert to a cache record; rows without a parseable `cache_key` are
    /// not cache entries. `created_at` falls back to the pin date.
    fn into_record(self) -> Option<PinRecord> {
        let keyvalues = self.metadata.keyvalues?;
        let key = keyvalues
            .get("cache_key")
            .and_then(Value::as_str)
            .and_then(|s| Fingerprint::from_hex(s).ok())?;
        let created_at = keyvalues
            .get("created_at")
            .and_then(|v| match v {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            })
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or(self.date_pinned)?;
        Some(PinRecord {
            key,
            cid: ContentId::new(self.ipfs_pin_hash),
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(keyvalues: Value, date_pinned: Option<&str>) -> PinListRow {
        serde_json::from_value(json!({
            "ipfs_pin_hash": "QmTest",
            "date_pinned": date_pinned,
            "metadata": { "name": "rfd_cache_x", "keyvalues": keyvalues },
        }))
        .unwrap()
    }

    #[test]
    fn row_with_string_timestamp() {
        let key = Fingerprint::from_bytes([7; 16]);
        let record = row(
            json!({ "type": "rfd_cache", "cache_key": key.to_hex(), "created_at": "1700000000" }),
            None,
        )
        .into_record()
        .unwrap();
        assert_eq!(record.key, key);
        assert_eq!(record.cid.as_str(), "QmTest");
        assert_eq!(record.created_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn row_falls_back_to_pin_date() {
        let key = Fingerprint::from_bytes([7; 16]);
        let record = row(
            json!({ "cache_key": key.to_hex() }),
            Some("2024-01-01T00:00:00Z"),
        )
        .into_record()
        .unwrap();
        assert_eq!(record.created_at.timestamp(), 1_704_067_200);
    }

    #[test]
    fn row_without_cache_key_is_skipped() {
        assert!(row(json!({ "type": "rfd_solution" }), None).into_record().is_none());
    }

    #[test]
    fn auth_debug_is_redacted() {
        let auth = PinataAuth::Jwt("secret-token".into());
        assert!(!format!("{auth:?}").contains("secret-token"));
    }
}
