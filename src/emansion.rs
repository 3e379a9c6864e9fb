use crate::links;
use crate::models::{AdInfo, BuildingId};
use crate::parser;
use crate::pipeline::ListingProvider;
use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde_json::Value;
use std::thread;
use std::time::Duration;
use tracing::debug;

pub const BASE_URL: &str = "https://www.e-mansion.co.jp";
const SEARCH_PATH: &str = "/bbs/estate/ajaxSearch/";
const BUILDING_PATH: &str = "/bbs/yre/building";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Delay before every request to the listing site.
pub const REQUEST_DELAY: Duration = Duration::from_secs(1);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Blocking client for the e-mansion search and ad info endpoints.
pub struct EMansionClient {
    client: Client,
    base_url: String,
    delay: Duration,
    l_campaign: &'static str,
}

impl EMansionClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            delay: REQUEST_DELAY,
            l_campaign: links::ALLIANCE_CAMPAIGN,
        })
    }

    /// Scheme and host the search and building paths are appended to.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Tracking query appended to synthesised L links.
    pub fn with_l_campaign(mut self, campaign: &'static str) -> Self {
        self.l_campaign = campaign;
        self
    }

    fn get(&self, url: &str) -> Result<Response> {
        thread::sleep(self.delay);
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Request failed: {}", url))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else if status == StatusCode::FORBIDDEN {
            bail!("403 Forbidden, the site may be blocking requests: {}", url)
        } else {
            bail!("HTTP {} for {}", status, url)
        }
    }

    /// Searches for a property and returns the first building in the results.
    pub fn search(&self, property_name: &str) -> Result<Option<BuildingId>> {
        let url = format!("{}{}?q={}", self.base_url, SEARCH_PATH, urlencoding::encode(property_name));
        let document: Value = self
            .get(&url)?
            .json()
            .context("Search response is not valid JSON")?;
        Ok(parser::parse_search_json(&document))
    }

    /// Fetches and parses the ad info document of a building.
    pub fn ad_info(&self, building_id: &BuildingId) -> Result<AdInfo> {
        let url = format!("{}{}/{}/ajaxJson/", self.base_url, BUILDING_PATH, building_id);
        let document: Value = self
            .get(&url)?
            .json()
            .context("Ad info response is not valid JSON")?;

        if let Some(object) = document.as_object() {
            debug!("Ad info keys: {:?}", object.keys().collect::<Vec<_>>());
        }

        let raw = parser::parse_ad_json(&document)
            .with_context(|| format!("Unexpected ad info for building {}", building_id))?;
        Ok(raw.into_ad_info(self.l_campaign))
    }
}

impl ListingProvider for EMansionClient {
    fn name(&self) -> &str {
        "e-mansion.co.jp"
    }

    fn resolve_building(&self, property_name: &str) -> Result<Option<BuildingId>> {
        let property_name = property_name.trim();
        if property_name.is_empty() {
            return Ok(None);
        }
        self.search(property_name)
    }

    fn fetch_ad_info(&self, building_id: &BuildingId) -> Result<AdInfo> {
        self.ad_info(building_id)
    }
}
