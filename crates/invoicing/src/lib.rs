//! Invoicing domain module (event-sourced).
//!
//! Invoice lines track `quantity` and its `secondary_quantity`. Lines created
//! from a sales order keep the secondary quantity the sale line handed over.
//! Pure domain logic: no IO, no storage.

pub mod invoice;

pub use invoice::{
    AddLine, CreateInvoice, EditLine, Invoice, InvoiceCommand, InvoiceCreated, InvoiceEvent,
    InvoiceId, InvoiceLine, InvoicePosted, InvoiceStatus, LineAdded, LineSynced, Post,
    ResyncProduct,
};
