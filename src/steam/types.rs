//! Steam store API wire types and the snapshots derived from them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── appdetails wire format ───────────────────────────────────────

/// Response envelope: `{"<app_id>": {"success": bool, "data": {...}}}`.
pub type AppDetailsResponse = HashMap<String, AppDetailsEntry>;

#[derive(Debug, Deserialize)]
pub struct AppDetailsEntry {
    pub success: bool,
    pub data: Option<AppData>,
}

#[derive(Debug, Deserialize)]
pub struct AppData {
    pub name: Option<String>,
    #[serde(default)]
    pub is_free: bool,
    pub header_image: Option<String>,
    pub price_overview: Option<PriceOverview>,
}

/// Prices on the wire are in minor units (cents).
#[derive(Debug, Deserialize)]
pub struct PriceOverview {
    #[serde(rename = "final")]
    pub final_cents: i64,
    #[serde(rename = "initial")]
    pub initial_cents: i64,
    #[serde(default)]
    pub discount_percent: i64,
    #[serde(default)]
    pub currency: String,
}

// ── derived snapshots ────────────────────────────────────────────

/// Price details for a paid app, converted to major units.
#[derive(Debug, Clone, Serialize)]
pub struct PriceInfo {
    pub final_price: f64,
    pub original_price: f64,
    pub discount_percent: i64,
    pub currency: String,
}

/// What one appdetails fetch tells us about an app.
#[derive(Debug, Clone, Serialize)]
pub struct AppSnapshot {
    pub name: String,
    pub is_free: bool,
    pub header_image: Option<String>,
    /// Present only for paid apps with a listed price.
    pub price: Option<PriceInfo>,
}

impl AppSnapshot {
    pub fn from_data(data: AppData, app_id: i64) -> Self {
        Self {
            name: data.name.unwrap_or_else(|| format!("App {app_id}")),
            is_free: data.is_free,
            header_image: data.header_image,
            price: data.price_overview.map(|p| PriceInfo {
                final_price: p.final_cents as f64 / 100.0,
                original_price: p.initial_cents as f64 / 100.0,
                discount_percent: p.discount_percent,
                currency: p.currency,
            }),
        }
    }
}

/// One region's price in a multi-region comparison.
#[derive(Debug, Clone, Serialize)]
pub struct RegionPrice {
    pub region: String,
    pub price: f64,
    pub original_price: f64,
    pub discount: i64,
    pub currency: String,
    pub is_free: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_paid_app_and_converts_cents() {
        let body = r#"{
            "620": {
                "success": true,
                "data": {
                    "name": "Portal 2",
                    "is_free": false,
                    "header_image": "https://cdn.example/620.jpg",
                    "price_overview": {
                        "final": 9900,
                        "initial": 19800,
                        "discount_percent": 50,
                        "currency": "TWD"
                    }
                }
            }
        }"#;
        let mut resp: AppDetailsResponse = serde_json::from_str(body).unwrap();
        let entry = resp.remove("620").unwrap();
        assert!(entry.success);

        let snap = AppSnapshot::from_data(entry.data.unwrap(), 620);
        assert_eq!(snap.name, "Portal 2");
        assert!(!snap.is_free);
        let price = snap.price.unwrap();
        assert_eq!(price.final_price, 99.0);
        assert_eq!(price.original_price, 198.0);
        assert_eq!(price.discount_percent, 50);
        assert_eq!(price.currency, "TWD");
    }

    #[test]
    fn parses_free_app_without_price_overview() {
        let body = r#"{
            "570": {
                "success": true,
                "data": { "name": "Dota 2", "is_free": true }
            }
        }"#;
        let mut resp: AppDetailsResponse = serde_json::from_str(body).unwrap();
        let entry = resp.remove("570").unwrap();

        let snap = AppSnapshot::from_data(entry.data.unwrap(), 570);
        assert!(snap.is_free);
        assert!(snap.price.is_none());
        assert!(snap.header_image.is_none());
    }

    #[test]
    fn unknown_app_reports_failure() {
        let body = r#"{ "999999": { "success": false } }"#;
        let resp: AppDetailsResponse = serde_json::from_str(body).unwrap();
        assert!(!resp.get("999999").unwrap().success);
        assert!(resp.get("999999").unwrap().data.is_none());
    }
}
