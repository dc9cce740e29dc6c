//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module maintains the aggregated depth view of the book: one row per
// live price level with the number of resting orders and their summed
// remainders. The rows are updated incrementally by exactly three actions
// (add, remove, match) and answer fill-or-kill feasibility in O(levels)
// without walking any level queue.
//
// | Component      | Description                                               |
// |----------------|-----------------------------------------------------------|
// | LevelDepth     | Count and total open quantity at one price                |
// | DepthTracker   | Per-side sorted rows, incremental maintenance, FOK check  |
// | DepthSnapshot  | Immutable point-in-time view, best-first per side         |
//--------------------------------------------------------------------------------------------------

use std::collections::{BTreeMap, btree_map::Entry};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Price, Quantity, Side};

/// Aggregated figures for one live price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDepth {
    /// The price for this row.
    pub price: Price,
    /// Number of live orders at this price.
    pub count: u64,
    /// Sum of the remaining quantities of those orders.
    pub quantity: Quantity,
}

/// An immutable snapshot of aggregated depth, best-first on both sides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthSnapshot {
    /// Bid rows ordered by price descending (best bids first).
    pub bids: Vec<LevelDepth>,
    /// Ask rows ordered by price ascending (best asks first).
    pub asks: Vec<LevelDepth>,
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,
}

impl DepthSnapshot {
    /// Returns the best bid price, if any bids rest.
    #[inline]
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|row| row.price)
    }

    /// Returns the best ask price, if any asks rest.
    #[inline]
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|row| row.price)
    }
}

/// Tracks aggregated depth per side, maintained in lockstep with the book.
///
/// Invariant: a row is present iff its count is positive, and every row
/// equals the figures recomputable from the corresponding level queue.
#[derive(Debug, Default)]
pub struct DepthTracker {
    /// Bid rows keyed by price; best bid is the last key.
    bids: BTreeMap<Price, LevelDepth>,
    /// Ask rows keyed by price; best ask is the first key.
    asks: BTreeMap<Price, LevelDepth>,
}

impl DepthTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    fn rows_mut(&mut self, side: Side) -> Option<&mut BTreeMap<Price, LevelDepth>> {
        match side {
            Side::Buy => Some(&mut self.bids),
            Side::Sell => Some(&mut self.asks),
            Side::Unknown => None,
        }
    }

    fn rows(&self, side: Side) -> Option<&BTreeMap<Price, LevelDepth>> {
        match side {
            Side::Buy => Some(&self.bids),
            Side::Sell => Some(&self.asks),
            Side::Unknown => None,
        }
    }

    /// Records an order joining the book: count += 1, quantity += q.
    pub fn on_order_added(&mut self, side: Side, price: Price, quantity: Quantity) {
        let Some(rows) = self.rows_mut(side) else { return };
        match rows.entry(price) {
            Entry::Vacant(entry) => {
                entry.insert(LevelDepth { price, count: 1, quantity });
            }
            Entry::Occupied(mut entry) => {
                let row = entry.get_mut();
                row.count += 1;
                row.quantity += quantity;
            }
        }
    }

    /// Records an order leaving the book with `quantity` still open:
    /// count -= 1, quantity -= q, row dropped when the count reaches zero.
    pub fn on_order_removed(&mut self, side: Side, price: Price, quantity: Quantity) {
        let Some(rows) = self.rows_mut(side) else { return };
        if let Entry::Occupied(mut entry) = rows.entry(price) {
            let row = entry.get_mut();
            row.count = row.count.saturating_sub(1);
            row.quantity = row.quantity.saturating_sub(quantity);
            if row.count == 0 {
                entry.remove();
            }
        }
    }

    /// Records a fill of `quantity` against a resting order. A partial fill
    /// only shrinks the open quantity; a full fill also retires the order
    /// and follows the removal path.
    pub fn on_order_matched(
        &mut self,
        side: Side,
        price: Price,
        quantity: Quantity,
        fully_filled: bool,
    ) {
        if fully_filled {
            self.on_order_removed(side, price, quantity);
            return;
        }
        let Some(rows) = self.rows_mut(side) else { return };
        if let Some(row) = rows.get_mut(&price) {
            row.quantity = row.quantity.saturating_sub(quantity);
        }
    }

    /// Answers fill-or-kill feasibility for an incoming order, walking the
    /// opposite side's rows best-first and accumulating marketable quantity.
    ///
    /// For a buy at limit `price`, ask rows are consumed in ascending order
    /// while their price stays at or below the limit; symmetric for a sell.
    /// Returns true as soon as the accumulated quantity covers the request.
    pub fn can_fully_fill(&self, side: Side, price: Price, quantity: Quantity) -> bool {
        let mut open = quantity;
        match side {
            Side::Buy => {
                for (row_price, row) in self.asks.iter() {
                    if *row_price > price {
                        break;
                    }
                    if row.quantity >= open {
                        return true;
                    }
                    open -= row.quantity;
                }
            }
            Side::Sell => {
                for (row_price, row) in self.bids.iter().rev() {
                    if *row_price < price {
                        break;
                    }
                    if row.quantity >= open {
                        return true;
                    }
                    open -= row.quantity;
                }
            }
            Side::Unknown => {}
        }
        false
    }

    /// Returns the row at the given side and price, if any order rests there.
    pub fn level(&self, side: Side, price: Price) -> Option<LevelDepth> {
        self.rows(side).and_then(|rows| rows.get(&price)).copied()
    }

    /// Returns the number of live rows on the given side.
    pub fn level_count(&self, side: Side) -> usize {
        self.rows(side).map_or(0, BTreeMap::len)
    }

    /// Takes a best-first snapshot with at most `limit` rows per side.
    pub fn snapshot(&self, limit: usize) -> DepthSnapshot {
        DepthSnapshot {
            bids: self.bids.values().rev().take(limit).copied().collect(),
            asks: self.asks.values().take(limit).copied().collect(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tracker() {
        let tracker = DepthTracker::new();
        assert_eq!(tracker.level_count(Side::Buy), 0);
        assert_eq!(tracker.level_count(Side::Sell), 0);
        assert_eq!(tracker.level(Side::Buy, 100), None);

        let snapshot = tracker.snapshot(10);
        assert!(snapshot.bids.is_empty());
        assert!(snapshot.asks.is_empty());
        assert_eq!(snapshot.best_bid(), None);
        assert_eq!(snapshot.best_ask(), None);
    }

    #[test]
    fn test_add_aggregates_same_price() {
        let mut tracker = DepthTracker::new();
        tracker.on_order_added(Side::Buy, 100, 10);
        tracker.on_order_added(Side::Buy, 100, 5);

        let row = tracker.level(Side::Buy, 100).unwrap();
        assert_eq!(row.count, 2);
        assert_eq!(row.quantity, 15);
        assert_eq!(tracker.level_count(Side::Buy), 1);
    }

    #[test]
    fn test_remove_drops_row_at_zero_count() {
        let mut tracker = DepthTracker::new();
        tracker.on_order_added(Side::Sell, 101, 8);
        tracker.on_order_added(Side::Sell, 101, 2);

        tracker.on_order_removed(Side::Sell, 101, 8);
        let row = tracker.level(Side::Sell, 101).unwrap();
        assert_eq!(row.count, 1);
        assert_eq!(row.quantity, 2);

        tracker.on_order_removed(Side::Sell, 101, 2);
        assert_eq!(tracker.level(Side::Sell, 101), None);
    }

    #[test]
    fn test_partial_match_keeps_count() {
        let mut tracker = DepthTracker::new();
        tracker.on_order_added(Side::Buy, 100, 10);
        tracker.on_order_matched(Side::Buy, 100, 4, false);

        let row = tracker.level(Side::Buy, 100).unwrap();
        assert_eq!(row.count, 1);
        assert_eq!(row.quantity, 6);
    }

    #[test]
    fn test_full_match_retires_order() {
        let mut tracker = DepthTracker::new();
        tracker.on_order_added(Side::Buy, 100, 10);
        tracker.on_order_added(Side::Buy, 100, 3);
        tracker.on_order_matched(Side::Buy, 100, 10, true);

        let row = tracker.level(Side::Buy, 100).unwrap();
        assert_eq!(row.count, 1);
        assert_eq!(row.quantity, 3);
    }

    #[test]
    fn test_can_fully_fill_respects_limit_price() {
        let mut tracker = DepthTracker::new();
        tracker.on_order_added(Side::Sell, 100, 3);
        tracker.on_order_added(Side::Sell, 101, 5);
        tracker.on_order_added(Side::Sell, 110, 50);

        // 8 units rest at or below 101; the 50 at 110 are not marketable.
        assert!(tracker.can_fully_fill(Side::Buy, 101, 8));
        assert!(!tracker.can_fully_fill(Side::Buy, 101, 9));
        assert!(tracker.can_fully_fill(Side::Buy, 110, 58));
        assert!(!tracker.can_fully_fill(Side::Buy, 99, 1));
    }

    #[test]
    fn test_can_fully_fill_sell_walks_bids_down() {
        let mut tracker = DepthTracker::new();
        tracker.on_order_added(Side::Buy, 102, 4);
        tracker.on_order_added(Side::Buy, 100, 6);
        tracker.on_order_added(Side::Buy, 95, 100);

        assert!(tracker.can_fully_fill(Side::Sell, 100, 10));
        assert!(!tracker.can_fully_fill(Side::Sell, 100, 11));
        assert!(tracker.can_fully_fill(Side::Sell, 95, 110));
        assert!(!tracker.can_fully_fill(Side::Sell, 103, 1));
    }

    #[test]
    fn test_can_fully_fill_empty_side() {
        let tracker = DepthTracker::new();
        assert!(!tracker.can_fully_fill(Side::Buy, 100, 1));
        assert!(!tracker.can_fully_fill(Side::Sell, 100, 1));
    }

    #[test]
    fn test_snapshot_ordering_and_limit() {
        let mut tracker = DepthTracker::new();
        for (price, quantity) in [(100, 1), (99, 2), (101, 3)] {
            tracker.on_order_added(Side::Buy, price, quantity);
        }
        for (price, quantity) in [(105, 4), (103, 5), (107, 6)] {
            tracker.on_order_added(Side::Sell, price, quantity);
        }

        let snapshot = tracker.snapshot(2);
        let bid_prices: Vec<Price> = snapshot.bids.iter().map(|row| row.price).collect();
        let ask_prices: Vec<Price> = snapshot.asks.iter().map(|row| row.price).collect();
        assert_eq!(bid_prices, vec![101, 100]);
        assert_eq!(ask_prices, vec![103, 105]);
        assert_eq!(snapshot.best_bid(), Some(101));
        assert_eq!(snapshot.best_ask(), Some(103));
    }
}
