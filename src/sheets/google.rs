use super::{prepare_write, trim_rows, A1Range, Row, SheetGateway, WriteSummary};
use crate::parser::coerce;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::time::Duration;
use tracing::{debug, info};

const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// The fields of a service account key file this client needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    updated_range: Option<String>,
    updated_rows: Option<usize>,
    updated_columns: Option<usize>,
}

/// Google Sheets v4 values API authenticated as a service account.
pub struct GoogleSheets {
    client: Client,
    spreadsheet_id: String,
    key: ServiceAccountKey,
    token: RefCell<Option<AccessToken>>,
}

impl GoogleSheets {
    pub fn new(spreadsheet_id: impl Into<String>, key: ServiceAccountKey) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            spreadsheet_id: spreadsheet_id.into(),
            key,
            token: RefCell::new(None),
        })
    }

    /// Builds a client from the raw JSON of a service account key.
    pub fn from_credentials_json(spreadsheet_id: impl Into<String>, credentials: &str) -> Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(credentials)
            .context("Failed to parse service account credentials")?;
        Self::new(spreadsheet_id, key)
    }

    fn access_token(&self) -> Result<String> {
        let now = Utc::now();
        if let Some(token) = self.token.borrow().as_ref() {
            if token.expires_at - ChronoDuration::seconds(TOKEN_REFRESH_MARGIN_SECS) > now {
                return Ok(token.value.clone());
            }
        }

        let token = self.request_token(now)?;
        let value = token.value.clone();
        *self.token.borrow_mut() = Some(token);
        Ok(value)
    }

    fn request_token(&self, now: DateTime<Utc>) -> Result<AccessToken> {
        debug!("Requesting access token for {}", self.key.client_email);

        let claims = Claims {
            iss: &self.key.client_email,
            scope: SCOPE,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + TOKEN_LIFETIME_SECS,
        };
        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .context("Service account private key is not a valid RSA PEM")?;
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .context("Failed to sign token assertion")?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .context("Failed to request access token")?;
        let token: TokenResponse = ensure_success(response, "token request")?
            .json()
            .context("Failed to parse token response")?;

        let lifetime = token.expires_in.unwrap_or(TOKEN_LIFETIME_SECS);
        Ok(AccessToken {
            value: token.access_token,
            expires_at: now + ChronoDuration::seconds(lifetime),
        })
    }

    fn values_url(&self, range: &A1Range) -> String {
        format!(
            "{}/{}/values/{}",
            SHEETS_API_URL,
            self.spreadsheet_id,
            urlencoding::encode(&range.to_string())
        )
    }
}

fn ensure_success(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    bail!("Sheets {} failed with HTTP {}: {}", what, status, body.trim())
}

impl SheetGateway for GoogleSheets {
    fn name(&self) -> &str {
        &self.spreadsheet_id
    }

    fn read_range(&self, range: &A1Range) -> Result<Vec<Row>> {
        let token = self.access_token()?;
        let response = self
            .client
            .get(self.values_url(range))
            .query(&[("majorDimension", "ROWS")])
            .bearer_auth(token)
            .send()
            .with_context(|| format!("Failed to read range {}", range))?;
        let values: ValueRange = ensure_success(response, "read")?
            .json()
            .with_context(|| format!("Failed to parse values of {}", range))?;

        let rows = values
            .values
            .iter()
            .map(|row| row.iter().map(coerce).collect())
            .collect();
        Ok(trim_rows(rows))
    }

    fn write_range(&self, range: &A1Range, rows: &[Row]) -> Result<WriteSummary> {
        let payload = prepare_write(range, rows)?;
        let token = self.access_token()?;
        let body = json!({
            "range": range.to_string(),
            "majorDimension": "ROWS",
            "values": payload,
        });

        let response = self
            .client
            .put(self.values_url(range))
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(token)
            .json(&body)
            .send()
            .with_context(|| format!("Failed to write range {}", range))?;
        let update: UpdateValuesResponse = ensure_success(response, "write")?
            .json()
            .context("Failed to parse update response")?;

        info!(
            "Update result: {} rows, {} columns",
            update.updated_rows.unwrap_or(0),
            update.updated_columns.unwrap_or(0)
        );

        Ok(WriteSummary {
            updated_range: update.updated_range.unwrap_or_else(|| range.to_string()),
            updated_rows: rows.len(),
            updated_columns: update.updated_columns.unwrap_or(0),
        })
    }
}
