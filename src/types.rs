//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module defines the core value types used throughout the matching engine:
// orders, trades and the side/order-type enums with their stable wire codes.
//
// | Section            | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | ENUMS              | Side and OrderType with stable integer codes.                    |
// | STRUCTS            | Order, OrderChange, TradeInfo and Trade.                         |
// | ERRORS             | TypeError for wire-code conversion failures.                     |
// | TESTS              | Unit tests for the defined types.                                |
//--------------------------------------------------------------------------------------------------

use thiserror::Error;

/// Caller-assigned order identifier, unique while the order rests on the book.
pub type OrderId = u64;

/// Price in integer ticks. Always non-negative; no floating point anywhere.
pub type Price = u64;

/// Quantity in integer units. Strictly positive on admission.
pub type Quantity = u64;

/// Represents the side of an order.
///
/// `Unknown` is representable so that the admission gate can reject it; it
/// never rests on the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    /// Side was not specified or could not be decoded.
    Unknown = 0,
    /// A buy (bid) order.
    Buy = 1,
    /// A sell (ask) order.
    Sell = 2,
}

impl Side {
    /// Returns the opposing side. `Unknown` has no opposite and maps to itself.
    #[inline]
    pub const fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
            Side::Unknown => Side::Unknown,
        }
    }

    /// Returns the stable wire code for this side.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decodes a side from its wire code.
    pub fn from_code(code: u8) -> Result<Side, TypeError> {
        match code {
            0 => Ok(Side::Unknown),
            1 => Ok(Side::Buy),
            2 => Ok(Side::Sell),
            other => Err(TypeError::InvalidSide(other)),
        }
    }
}

/// Represents the type of an order, influencing its admission and matching
/// behavior.
///
/// The integer codes are stable for wire compatibility: UNKNOWN=0, GTC=1,
/// FAK=2, FOK=3, GFD=4, MAR=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OrderType {
    /// Type was not specified or could not be decoded. Never admissible.
    Unknown = 0,
    /// Rests until filled or cancelled.
    GoodTillCancel = 1,
    /// Fill-And-Kill (IOC): match what is possible now, cancel any remainder.
    FillAndKill = 2,
    /// Fill-Or-Kill: fully fill on admission or drop entirely.
    FillOrKill = 3,
    /// Good-For-Day: cancelled at the daily prune moment.
    GoodForDay = 4,
    /// Market: repriced at admission to the opposite side's worst resting
    /// price, then treated as GoodTillCancel.
    Market = 5,
}

impl OrderType {
    /// Returns the stable wire code for this order type.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decodes an order type from its wire code.
    pub fn from_code(code: u8) -> Result<OrderType, TypeError> {
        match code {
            0 => Ok(OrderType::Unknown),
            1 => Ok(OrderType::GoodTillCancel),
            2 => Ok(OrderType::FillAndKill),
            3 => Ok(OrderType::FillOrKill),
            4 => Ok(OrderType::GoodForDay),
            5 => Ok(OrderType::Market),
            other => Err(TypeError::InvalidOrderType(other)),
        }
    }
}

/// A trading order.
///
/// Identity and type are immutable for the life of the order; the remainder
/// only decreases. The one exception is the Market repricing at admission,
/// which rewrites price and type before the order ever rests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Caller-assigned identifier, unique while resting.
    id: OrderId,
    /// Type of the order (GoodTillCancel, FillAndKill, ...).
    order_type: OrderType,
    /// Side of the order (Buy or Sell).
    side: Side,
    /// Limit price in ticks.
    price: Price,
    /// Quantity at admission.
    initial_quantity: Quantity,
    /// Quantity still unfilled. Positive while the order is on the book.
    remaining_quantity: Quantity,
}

impl Order {
    /// Creates a new order with the full remainder open.
    pub fn new(
        id: OrderId,
        order_type: OrderType,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            id,
            order_type,
            side,
            price,
            initial_quantity: quantity,
            remaining_quantity: quantity,
        }
    }

    /// Creates a market order. The price is a placeholder; admission rewrites
    /// it to the worst price on the opposite side.
    pub fn market(id: OrderId, side: Side, quantity: Quantity) -> Self {
        Self::new(id, OrderType::Market, side, 0, quantity)
    }

    /// Returns the order identifier.
    #[inline]
    pub const fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the order type.
    #[inline]
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Returns the side of the order.
    #[inline]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Returns the limit price in ticks.
    #[inline]
    pub const fn price(&self) -> Price {
        self.price
    }

    /// Returns the quantity the order was admitted with.
    #[inline]
    pub const fn initial_quantity(&self) -> Quantity {
        self.initial_quantity
    }

    /// Returns the quantity still open.
    #[inline]
    pub const fn remaining_quantity(&self) -> Quantity {
        self.remaining_quantity
    }

    /// Returns the quantity filled so far.
    #[inline]
    pub const fn filled_quantity(&self) -> Quantity {
        self.initial_quantity - self.remaining_quantity
    }

    /// Returns true once the remainder reaches zero.
    #[inline]
    pub const fn is_filled(&self) -> bool {
        self.remaining_quantity == 0
    }

    /// Consumes `quantity` from the remainder.
    ///
    /// # Panics
    /// Filling beyond the remaining quantity breaks an invariant that cannot
    /// be restored, so it aborts rather than propagating.
    pub(crate) fn fill(&mut self, quantity: Quantity) {
        assert!(
            quantity <= self.remaining_quantity,
            "order {} filled for {} with only {} remaining",
            self.id,
            quantity,
            self.remaining_quantity
        );
        self.remaining_quantity -= quantity;
    }

    /// Rewrites a Market order into a GoodTillCancel at the given price.
    /// Used once, at admission.
    pub(crate) fn convert_to_limit(&mut self, price: Price) {
        self.price = price;
        self.order_type = OrderType::GoodTillCancel;
    }
}

/// Replacement parameters for a modify: the new side, price and quantity.
/// The id and order type of the original order are preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderChange {
    /// New side for the order.
    pub side: Side,
    /// New limit price in ticks.
    pub price: Price,
    /// New open quantity.
    pub quantity: Quantity,
}

/// One leg of a trade: the order it filled, at its own resting price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeInfo {
    /// Identifier of the filled order.
    pub order_id: OrderId,
    /// The resting price of that order.
    pub price: Price,
    /// Quantity filled in this step.
    pub quantity: Quantity,
}

/// A completed trade between the head bid and the head ask.
///
/// Both legs carry the same quantity; each leg records its own resting
/// price. At the moment of match the two prices cross, but they are kept
/// explicit for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trade {
    /// The bid-side leg.
    pub bid: TradeInfo,
    /// The ask-side leg.
    pub ask: TradeInfo,
}

impl Trade {
    /// Creates a trade from its two legs.
    pub fn new(bid: TradeInfo, ask: TradeInfo) -> Self {
        Self { bid, ask }
    }

    /// Returns the quantity exchanged (identical on both legs).
    #[inline]
    pub const fn quantity(&self) -> Quantity {
        self.bid.quantity
    }
}

/// Errors that can occur when decoding wire codes into types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// The code does not name a side.
    #[error("invalid side code: {0}")]
    InvalidSide(u8),
    /// The code does not name an order type.
    #[error("invalid order type code: {0}")]
    InvalidOrderType(u8),
}
