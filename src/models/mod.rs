pub mod stock;

pub use stock::{MarketSnapshot, RecommendationRating, Stock};
