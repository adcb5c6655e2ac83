//! Inventory domain module (event-sourced).
//!
//! Stock moves carry a planned and a processed secondary quantity, their move
//! lines carry a processed one, and stock quants show on-hand stock in the
//! secondary unit. Pure domain logic: no IO, no storage.

pub mod quant;
pub mod stock_move;

pub use quant::{
    CreateQuant, QuantCommand, QuantCreated, QuantEvent, QuantLevel, QuantResynced, QuantityUpdated,
    ResyncProduct as ResyncQuant, StockQuant, StockQuantId, UpdateAvailableQuantity,
};
pub use stock_move::{
    AddMoveLine, CreateStockMove, EditMoveLine, MarkDone, MoveLineAdded, MoveLineSynced,
    MoveOrigin, MoveQuantities, QuantitiesSynced, RecordDone, ResyncProduct, SetDemand,
    SetSecondaryDone, StockMove, StockMoveCommand, StockMoveCreated, StockMoveDone,
    StockMoveEvent, StockMoveId, StockMoveLine, StockMoveStatus,
};
