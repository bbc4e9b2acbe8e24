//! Observation input and the events derived from it.

use chrono::{DateTime, Utc};

use crate::steam::AppSnapshot;

/// One fresh price fetch for an app in one region.
#[derive(Debug, Clone)]
pub struct Observation {
    pub app_id: i64,
    pub name: String,
    pub region: String,
    /// Final price in major units; zero when the app is free.
    pub price: f64,
    pub discount: i64,
    pub currency: String,
    pub is_free: bool,
    pub observed_at: DateTime<Utc>,
}

impl Observation {
    /// Build from a storefront snapshot.
    ///
    /// Returns `None` for a paid app with no listed price (unreleased or
    /// delisted) — there is nothing to record for those.
    pub fn from_snapshot(
        app_id: i64,
        region: &str,
        snap: &AppSnapshot,
        observed_at: DateTime<Utc>,
    ) -> Option<Self> {
        if snap.is_free {
            return Some(Self {
                app_id,
                name: snap.name.clone(),
                region: region.to_string(),
                price: 0.0,
                discount: 0,
                currency: "FREE".into(),
                is_free: true,
                observed_at,
            });
        }

        let price = snap.price.as_ref()?;
        Some(Self {
            app_id,
            name: snap.name.clone(),
            region: region.to_string(),
            price: price.final_price,
            discount: price.discount_percent,
            currency: price.currency.clone(),
            is_free: false,
            observed_at,
        })
    }
}

/// Notable facts the engine can derive from a single observation.
#[derive(Debug, Clone, PartialEq)]
pub enum PriceEvent {
    /// First observation for an (app, region) pair seeded the low-water mark.
    BaselineEstablished {
        app_id: i64,
        region: String,
        price: f64,
        currency: String,
    },
    /// The observation beat the stored historical low.
    NewLow {
        app_id: i64,
        name: String,
        region: String,
        price: f64,
        previous_low: f64,
        drop_percent: f64,
        discount: i64,
        currency: String,
    },
    /// The app flipped from paid to free.
    BecameFree { app_id: i64, name: String },
}
