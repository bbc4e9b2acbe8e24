//! Scripted fetcher and recording sink for monitor tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{BotError, Result};
use crate::notify::{NotifyEvent, NotifySink};
use crate::steam::{AppSnapshot, PriceFetcher, PriceInfo};

/// One scripted fetch result. Scripts are consumed front to back; the last
/// step repeats once a script runs out.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Price(f64),
    Free,
    Missing,
    Fail,
}

pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<i64, Vec<Step>>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
        }
    }

    pub fn script(&self, app_id: i64, steps: Vec<Step>) {
        self.scripts.lock().insert(app_id, steps);
    }

    fn next_step(&self, app_id: i64) -> Step {
        let mut scripts = self.scripts.lock();
        match scripts.get_mut(&app_id) {
            Some(steps) if steps.len() > 1 => steps.remove(0),
            Some(steps) => *steps.first().unwrap_or(&Step::Missing),
            None => Step::Missing,
        }
    }
}

#[async_trait]
impl PriceFetcher for ScriptedFetcher {
    async fn fetch_app(&self, app_id: i64, _region: &str) -> Result<Option<AppSnapshot>> {
        match self.next_step(app_id) {
            Step::Price(price) => Ok(Some(AppSnapshot {
                name: format!("App {app_id}"),
                is_free: false,
                header_image: None,
                price: Some(PriceInfo {
                    final_price: price,
                    original_price: price,
                    discount_percent: 0,
                    currency: "TWD".into(),
                }),
            })),
            Step::Free => Ok(Some(AppSnapshot {
                name: format!("App {app_id}"),
                is_free: true,
                header_image: None,
                price: None,
            })),
            Step::Missing => Ok(None),
            Step::Fail => Err(BotError::Upstream("scripted failure".into())),
        }
    }
}

pub struct RecordingSink {
    enabled: bool,
    fail_deliveries: AtomicBool,
    delivered: Mutex<Vec<(i64, String)>>,
}

impl RecordingSink {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            fail_deliveries: AtomicBool::new(false),
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::enabled()
        }
    }

    pub fn fail_next_deliveries(&self, fail: bool) {
        self.fail_deliveries.store(fail, Ordering::SeqCst);
    }

    /// (channel_id, event kind) pairs in delivery order.
    pub fn deliveries(&self) -> Vec<(i64, String)> {
        self.delivered.lock().clone()
    }
}

#[async_trait]
impl NotifySink for RecordingSink {
    fn enabled(&self) -> bool {
        self.enabled
    }

    async fn deliver(&self, channel_id: i64, event: &NotifyEvent) -> Result<()> {
        if self.fail_deliveries.load(Ordering::SeqCst) {
            return Err(BotError::Notify("scripted delivery failure".into()));
        }
        let kind = match event {
            NotifyEvent::NewLow { .. } => "new_low",
            NotifyEvent::FreeGame { .. } => "free_game",
            NotifyEvent::PromotionDue { .. } => "promotion",
        };
        self.delivered.lock().push((channel_id, kind.to_string()));
        Ok(())
    }
}
