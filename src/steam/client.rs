//! HTTP client for the Steam storefront appdetails endpoint.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::warn;

use super::types::{AppDetailsResponse, AppSnapshot, RegionPrice};
use crate::config::SteamConfig;
use crate::error::{BotError, Result};

/// Fetches one app's storefront snapshot for a region.
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    /// `Ok(None)` means the store does not know the app, or hides it in
    /// the requested region.
    async fn fetch_app(&self, app_id: i64, region: &str) -> Result<Option<AppSnapshot>>;
}

#[derive(Clone)]
pub struct SteamClient {
    client: Client,
    base_url: String,
}

impl SteamClient {
    pub fn new(config: &SteamConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.store_api_url.clone(),
        })
    }

    /// Fetch one app's price in several regions concurrently.
    ///
    /// Regions that fail or don't list the app are dropped; the result
    /// keeps the input region order.
    pub async fn multi_region_prices(
        &self,
        app_id: i64,
        regions: &[String],
    ) -> Vec<RegionPrice> {
        let mut set = JoinSet::new();
        for region in regions {
            let fetcher = self.clone();
            let region = region.clone();
            set.spawn(async move {
                let result = fetcher.fetch_app(app_id, &region).await;
                (region, result)
            });
        }

        let mut by_region: HashMap<String, RegionPrice> = HashMap::new();
        while let Some(joined) = set.join_next().await {
            let Ok((region, result)) = joined else { continue };
            match result {
                Ok(Some(snap)) => {
                    if snap.is_free {
                        by_region.insert(
                            region.clone(),
                            RegionPrice {
                                region,
                                price: 0.0,
                                original_price: 0.0,
                                discount: 0,
                                currency: "FREE".into(),
                                is_free: true,
                            },
                        );
                    } else if let Some(p) = snap.price {
                        by_region.insert(
                            region.clone(),
                            RegionPrice {
                                region,
                                price: p.final_price,
                                original_price: p.original_price,
                                discount: p.discount_percent,
                                currency: p.currency,
                                is_free: false,
                            },
                        );
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(app_id, region = %region, error = %e, "region price fetch failed");
                }
            }
        }

        regions
            .iter()
            .filter_map(|r| by_region.remove(r))
            .collect()
    }
}

#[async_trait]
impl PriceFetcher for SteamClient {
    async fn fetch_app(&self, app_id: i64, region: &str) -> Result<Option<AppSnapshot>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("appids", app_id.to_string()), ("cc", region.to_string())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BotError::Upstream(format!("appdetails timed out for app {app_id}"))
                } else {
                    BotError::Http(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(BotError::Upstream(format!(
                "appdetails returned {} for app {app_id}",
                response.status()
            )));
        }

        let mut body: AppDetailsResponse = response.json().await?;
        let entry = match body.remove(&app_id.to_string()) {
            Some(entry) if entry.success => entry,
            _ => return Ok(None),
        };

        Ok(entry.data.map(|data| AppSnapshot::from_data(data, app_id)))
    }
}
