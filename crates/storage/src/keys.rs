//! Key namespace shared with read-side consumers.

/// Hash of `"{strike}:{type}"` to the stringified dealer position.
pub const DEALER_INVENTORY: &str = "dealer_inventory";
/// JSON of the last computed exposure result.
pub const GEX_CURRENT: &str = "gex:current";
/// Stringified flip level, present only while a flip exists.
pub const GEX_FLIP: &str = "gex:flip";
/// RFC 3339 time of the last published result.
pub const GEX_LAST_UPDATED: &str = "gex:last_updated";
/// Stringified last known spot price.
pub const SPOT_PRICE: &str = "spot_price";
