pub mod price_cycle;
pub mod promo_cycle;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use price_cycle::{run_price_cycle, run_price_loop, CycleOutcome};
pub use promo_cycle::{run_promotion_check, run_promotion_loop};
pub use stats::CycleStats;
