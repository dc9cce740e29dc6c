//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the matching core: order admission, the price-time
// priority match loop and the order-type policies.
//
// | Component       | Description                                               |
// |-----------------|-----------------------------------------------------------|
// | MatchingEngine  | Owns the book and the depth tracker, mutates them in      |
// |                 | lockstep through add / cancel / modify                    |
// | MatchingError   | Admission and modify validation failures                  |
//
// Admission gates, in order: duplicate id (silent), unknown side/type and
// zero quantity (rejected), Market repricing to the worst opposite level
// (drop when the opposite side is empty), FillAndKill marketability,
// FillOrKill full-fill feasibility. Admitted orders join the tail of their
// level and the match loop runs to uncross the book.
//--------------------------------------------------------------------------------------------------

use thiserror::Error;

use crate::depth::{DepthSnapshot, DepthTracker};
use crate::orderbook::{OrderBook, OrderBookError, OrderHandle};
use crate::types::{Order, OrderChange, OrderId, OrderType, Price, Quantity, Side, Trade, TradeInfo};

/// Errors that can occur during order admission or modification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchingError {
    /// The order (or change) failed validation; the book is unchanged.
    #[error("invalid order: {0}")]
    InvalidOrder(&'static str),

    /// A resting-store mutation failed.
    #[error(transparent)]
    Book(#[from] OrderBookError),
}

/// Type alias for Result with MatchingError.
pub type MatchingResult<T> = Result<T, MatchingError>;

/// The matching core for one instrument.
///
/// Single-threaded by itself; [`crate::engine::SharedMatchingEngine`] wraps
/// it in the book mutex for concurrent use.
#[derive(Debug, Default)]
pub struct MatchingEngine {
    /// Resting orders: side indexes plus the id directory.
    book: OrderBook,
    /// Aggregated per-price depth, maintained in lockstep with the book.
    depth: DepthTracker,
}

impl MatchingEngine {
    /// Creates an engine with an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits an order and returns the trades produced by this call.
    ///
    /// A duplicate id is silently ignored (idempotent reject for gateway
    /// retries). Market orders are repriced to the worst price on the
    /// opposite side and converted to GoodTillCancel, or dropped when that
    /// side is empty. FillAndKill orders are dropped unless the opposite
    /// side is marketable; FillOrKill orders are dropped unless fully
    /// fillable.
    ///
    /// # Errors
    /// Returns `InvalidOrder` for an unknown side, an unknown order type or
    /// a zero quantity; the book is unchanged.
    pub fn add_order(&mut self, mut order: Order) -> MatchingResult<Vec<Trade>> {
        if self.book.contains(order.id()) {
            return Ok(Vec::new());
        }
        if order.side() == Side::Unknown {
            return Err(MatchingError::InvalidOrder("order side is unknown"));
        }
        if order.order_type() == OrderType::Unknown {
            return Err(MatchingError::InvalidOrder("order type is unknown"));
        }
        if order.remaining_quantity() == 0 {
            return Err(MatchingError::InvalidOrder("order quantity must be positive"));
        }

        if order.order_type() == OrderType::Market {
            // Priced at the worst opposing level the order can sweep the
            // whole opposite book without naming an unbounded price.
            let worst_opposite = match order.side() {
                Side::Buy => self.book.worst_ask(),
                Side::Sell => self.book.worst_bid(),
                Side::Unknown => None,
            };
            match worst_opposite {
                Some(price) => order.convert_to_limit(price),
                None => return Ok(Vec::new()),
            }
        }

        match order.order_type() {
            OrderType::FillAndKill
                if !self.is_marketable(order.side(), order.price()) =>
            {
                return Ok(Vec::new());
            }
            OrderType::FillOrKill
                if !self.depth.can_fully_fill(
                    order.side(),
                    order.price(),
                    order.remaining_quantity(),
                ) =>
            {
                return Ok(Vec::new());
            }
            _ => {}
        }

        let (side, price, quantity) = (order.side(), order.price(), order.remaining_quantity());
        self.book.insert(order)?;
        self.depth.on_order_added(side, price, quantity);
        Ok(self.match_orders())
    }

    /// Cancels a resting order. Unknown ids are a silent no-op.
    pub fn cancel_order(&mut self, id: OrderId) {
        if let Some(order) = self.book.remove(id) {
            self.depth.on_order_removed(
                order.side(),
                order.price(),
                order.remaining_quantity(),
            );
        }
    }

    /// Cancels a batch of orders. Unknown ids are skipped.
    pub fn cancel_orders(&mut self, ids: &[OrderId]) {
        for id in ids {
            self.cancel_order(*id);
        }
    }

    /// Replaces a resting order with new side/price/quantity, keeping its id
    /// and original order type. The replacement joins the tail of its new
    /// level, so queue priority is lost.
    ///
    /// The change is validated before the original order is touched; an
    /// unknown id is a no-op returning no trades.
    ///
    /// # Errors
    /// Returns `InvalidOrder` for an unknown change side or a zero change
    /// quantity; the original order keeps resting with its priority intact.
    pub fn modify_order(&mut self, id: OrderId, change: OrderChange) -> MatchingResult<Vec<Trade>> {
        if change.side == Side::Unknown {
            return Err(MatchingError::InvalidOrder("change side is unknown"));
        }
        if change.quantity == 0 {
            return Err(MatchingError::InvalidOrder("change quantity must be positive"));
        }
        let Some(order_type) = self.book.order(id).map(Order::order_type) else {
            return Ok(Vec::new());
        };
        self.cancel_order(id);
        self.add_order(Order::new(id, order_type, change.side, change.price, change.quantity))
    }

    /// Collects the ids of all resting Good-For-Day orders, for the daily
    /// prune.
    pub fn good_for_day_ids(&self) -> Vec<OrderId> {
        self.book
            .orders()
            .filter(|order| order.order_type() == OrderType::GoodForDay)
            .map(Order::id)
            .collect()
    }

    /// Returns the number of resting orders.
    #[inline]
    pub fn len(&self) -> usize {
        self.book.len()
    }

    /// Returns true if no orders rest.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.book.is_empty()
    }

    /// Returns true if an order with this id is resting.
    #[inline]
    pub fn contains(&self, id: OrderId) -> bool {
        self.book.contains(id)
    }

    /// Returns the best bid price.
    #[inline]
    pub fn best_bid(&self) -> Option<Price> {
        self.book.best_bid()
    }

    /// Returns the best ask price.
    #[inline]
    pub fn best_ask(&self) -> Option<Price> {
        self.book.best_ask()
    }

    /// Returns the spread between the best ask and the best bid.
    #[inline]
    pub fn spread(&self) -> Option<i64> {
        self.book.spread()
    }

    /// Takes a best-first aggregated depth snapshot, at most `limit` rows
    /// per side.
    pub fn depth_snapshot(&self, limit: usize) -> DepthSnapshot {
        self.depth.snapshot(limit)
    }

    /// Read access to the resting-order store.
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Read access to the aggregated depth.
    pub fn depth(&self) -> &DepthTracker {
        &self.depth
    }

    fn is_marketable(&self, side: Side, price: Price) -> bool {
        match side {
            Side::Buy => self.book.best_ask().is_some_and(|ask| ask <= price),
            Side::Sell => self.book.best_bid().is_some_and(|bid| bid >= price),
            Side::Unknown => false,
        }
    }

    /// Uncrosses the book: while the best bid reaches the best ask, fill the
    /// two heads against each other under price-time priority. After the
    /// loop, a FillAndKill left at the top of either side is cancelled.
    fn match_orders(&mut self) -> Vec<Trade> {
        let mut trades = Vec::new();
        loop {
            let (Some(best_bid), Some(best_ask)) = (self.book.best_bid(), self.book.best_ask())
            else {
                break;
            };
            if best_bid < best_ask {
                break;
            }
            let (Some(bid_handle), Some(ask_handle)) =
                (self.book.front(Side::Buy), self.book.front(Side::Sell))
            else {
                break;
            };

            let (Some(bid_open), Some(ask_open)) = (
                self.book.order_at(bid_handle).map(Order::remaining_quantity),
                self.book.order_at(ask_handle).map(Order::remaining_quantity),
            ) else {
                break;
            };
            let fill_quantity = bid_open.min(ask_open);

            let (Some(bid_leg), Some(ask_leg)) = (
                self.fill_resting(bid_handle, fill_quantity),
                self.fill_resting(ask_handle, fill_quantity),
            ) else {
                break;
            };
            trades.push(Trade::new(bid_leg, ask_leg));
        }

        self.sweep_fill_and_kill(Side::Buy);
        self.sweep_fill_and_kill(Side::Sell);
        trades
    }

    /// Consumes `quantity` from a resting head order and returns its trade
    /// leg. A fully filled order is retired from book, directory and depth.
    fn fill_resting(&mut self, handle: OrderHandle, quantity: Quantity) -> Option<TradeInfo> {
        let order = self.book.order_at_mut(handle)?;
        order.fill(quantity);
        let (id, side, price, filled) =
            (order.id(), order.side(), order.price(), order.is_filled());
        self.depth.on_order_matched(side, price, quantity, filled);
        if filled {
            self.book.remove(id);
        }
        Some(TradeInfo { order_id: id, price, quantity })
    }

    /// A resting FillAndKill cannot wait: once matching halts, the head of
    /// the best level on each side is cancelled if it is one. An admitted
    /// FAK is always alone at the top of its side, so the head check covers
    /// every survivor.
    fn sweep_fill_and_kill(&mut self, side: Side) {
        let Some(handle) = self.book.front(side) else { return };
        let Some(order) = self.book.order_at(handle) else { return };
        if order.order_type() != OrderType::FillAndKill {
            return;
        }
        let id = order.id();
        self.cancel_order(id);
    }
}
