//! Sales orders domain module (event-sourced).
//!
//! Sale lines track `product_uom_qty` and its `secondary_quantity`. When an
//! order is invoiced or procured, each line hands its current secondary
//! quantity to the generated document once. Pure domain logic: no IO, no
//! storage.

pub mod order;
pub mod propagation;

pub use order::{
    AddLine, ConfirmOrder, CreateSalesOrder, EditLine, LineAdded, LineSynced, MarkInvoiced,
    OrderConfirmed, OrderInvoiced, ResyncProduct, SaleOrderLine, SalesOrder, SalesOrderCommand,
    SalesOrderCreated, SalesOrderEvent, SalesOrderId, SalesOrderStatus,
};
pub use propagation::{InvoiceLineValues, ProcurementValues};
