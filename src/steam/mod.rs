pub mod client;
pub mod types;

pub use client::{PriceFetcher, SteamClient};
pub use types::{AppSnapshot, PriceInfo, RegionPrice};
