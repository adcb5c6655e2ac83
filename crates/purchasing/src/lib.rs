//! Purchasing domain module (purchase orders, event-sourced).
//!
//! Purchase lines track `product_qty` and its `secondary_quantity` in the
//! product's secondary unit. Pure domain logic: no IO, no storage.

pub mod order;

pub use order::{
    AddLine, Approve, CreatePurchaseOrder, EditLine, LineAdded, LineSynced, PurchaseOrder,
    PurchaseOrderApproved, PurchaseOrderCommand, PurchaseOrderCreated, PurchaseOrderEvent,
    PurchaseOrderId, PurchaseOrderLine, PurchaseOrderStatus, ResyncProduct,
};
