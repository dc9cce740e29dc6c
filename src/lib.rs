// Expose the modules
pub mod config;
pub mod depth;
pub mod engine;
pub mod matching_engine;
pub mod orderbook;
pub mod types;

// Re-export key types for easier usage
pub use config::{DEFAULT_PRUNE_HOUR, EngineConfig};
pub use depth::{DepthSnapshot, DepthTracker, LevelDepth};
pub use engine::SharedMatchingEngine;
pub use matching_engine::{MatchingEngine, MatchingError, MatchingResult};
pub use orderbook::{OrderBook, OrderBookError, OrderHandle, PriceLevel};
pub use types::{
    Order, OrderChange, OrderId, OrderType, Price, Quantity, Side, Trade, TradeInfo, TypeError,
};
