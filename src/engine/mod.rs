pub mod observation;
pub mod price;

pub use observation::{Observation, PriceEvent};
pub use price::PriceEngine;
