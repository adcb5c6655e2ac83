use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use uomsync_core::{Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, Entity, TenantId};
use uomsync_events::Event;
use uomsync_products::{
    LineEdit, ProductId, ProductUomSnapshot, QuantityBinding, UnitOfMeasure,
    impl_secondary_uom_line,
};
use uomsync_sales::{InvoiceLineValues, SalesOrderId};

/// Invoice identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub AggregateId);

impl InvoiceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Invoice status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Posted,
}

/// Invoice line, optionally traced back to the sale line it bills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    line_no: u32,
    product_id: ProductId,
    secondary_unit: Option<UnitOfMeasure>,
    quantity: f64,
    secondary_quantity: f64,
    sale_line_no: Option<u32>,
}

impl_secondary_uom_line!(InvoiceLine);

impl Entity for InvoiceLine {
    type Id = u32;

    fn id(&self) -> &u32 {
        &self.line_no
    }
}

impl InvoiceLine {
    pub const SECONDARY_QUANTITY: QuantityBinding<Self> = QuantityBinding::editable(
        "quantity",
        "secondary_quantity",
        Self::quantity,
        Self::write_quantity,
        Self::secondary_quantity,
        Self::write_secondary_quantity,
    );

    /// Build a line; `copied_secondary` is the value handed over by a sale
    /// line, if any.
    pub fn new(
        line_no: u32,
        product: &ProductUomSnapshot,
        quantity: f64,
        copied_secondary: Option<f64>,
    ) -> DomainResult<Self> {
        let mut line = Self {
            line_no,
            product_id: product.product_id,
            secondary_unit: None,
            quantity,
            secondary_quantity: 0.0,
            sale_line_no: None,
        };
        Self::SECONDARY_QUANTITY.initialize(&mut line, product, copied_secondary)?;
        Ok(line)
    }

    pub fn line_no(&self) -> u32 {
        self.line_no
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn secondary_unit(&self) -> Option<&UnitOfMeasure> {
        self.secondary_unit.as_ref()
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn secondary_quantity(&self) -> f64 {
        self.secondary_quantity
    }

    pub fn sale_line_no(&self) -> Option<u32> {
        self.sale_line_no
    }

    fn write_quantity(&mut self, qty: f64) {
        self.quantity = qty;
    }

    fn write_secondary_quantity(&mut self, qty: f64) {
        self.secondary_quantity = qty;
    }
}

/// Aggregate root: Invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    id: InvoiceId,
    tenant_id: Option<TenantId>,
    sales_order_id: Option<SalesOrderId>,
    status: InvoiceStatus,
    lines: Vec<InvoiceLine>,
    version: u64,
    created: bool,
}

impl Invoice {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InvoiceId) -> Self {
        Self {
            id,
            tenant_id: None,
            sales_order_id: None,
            status: InvoiceStatus::Draft,
            lines: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    /// Sales order this invoice bills, `None` for a standalone invoice.
    pub fn sales_order_id(&self) -> Option<SalesOrderId> {
        self.sales_order_id
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn lines(&self) -> &[InvoiceLine] {
        &self.lines
    }

    pub fn line(&self, line_no: u32) -> Option<&InvoiceLine> {
        self.lines.iter().find(|l| l.line_no == line_no)
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, InvoiceStatus::Draft)
    }
}

impl AggregateRoot for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateInvoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateInvoice {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub sales_order_id: Option<SalesOrderId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddLine {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub product: ProductUomSnapshot,
    pub quantity: f64,
    /// Secondary quantity copied from the sale line; recomputed when absent.
    pub secondary_quantity: Option<f64>,
    /// Sales order the billed sale line belongs to; must be the invoice's.
    pub sales_order_id: Option<SalesOrderId>,
    pub sale_line_no: Option<u32>,
    pub occurred_at: DateTime<Utc>,
}

impl AddLine {
    /// Line billing a sale line, seeded from the values the sale line prepared.
    pub fn from_sale_line(
        tenant_id: TenantId,
        invoice_id: InvoiceId,
        product: ProductUomSnapshot,
        values: &InvoiceLineValues,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if values.product_id != product.product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(Self {
            tenant_id,
            invoice_id,
            product,
            quantity: values.quantity,
            secondary_quantity: values.secondary_quantity,
            sales_order_id: Some(values.sales_order_id),
            sale_line_no: Some(values.sale_line_no),
            occurred_at,
        })
    }
}

/// Command: EditLine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditLine {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub line_no: u32,
    pub product: ProductUomSnapshot,
    pub edit: LineEdit,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ResyncProduct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResyncProduct {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub product: ProductUomSnapshot,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InvoiceCommand {
    CreateInvoice(CreateInvoice),
    AddLine(AddLine),
    EditLine(EditLine),
    ResyncProduct(ResyncProduct),
    Post(Post),
}

/// Event: InvoiceCreated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceCreated {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub sales_order_id: Option<SalesOrderId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineAdded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineAdded {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub line: InvoiceLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineSynced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSynced {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub line: InvoiceLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoicePosted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoicePosted {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceCreated(InvoiceCreated),
    LineAdded(LineAdded),
    LineSynced(LineSynced),
    InvoicePosted(InvoicePosted),
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceCreated(_) => "invoicing.invoice.created",
            InvoiceEvent::LineAdded(_) => "invoicing.invoice.line_added",
            InvoiceEvent::LineSynced(_) => "invoicing.invoice.line_synced",
            InvoiceEvent::InvoicePosted(_) => "invoicing.invoice.posted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::InvoiceCreated(e) => e.occurred_at,
            InvoiceEvent::LineAdded(e) => e.occurred_at,
            InvoiceEvent::LineSynced(e) => e.occurred_at,
            InvoiceEvent::InvoicePosted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Invoice {
    type Command = InvoiceCommand;
    type Event = InvoiceEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InvoiceEvent::InvoiceCreated(e) => {
                self.id = e.invoice_id;
                self.tenant_id = Some(e.tenant_id);
                self.sales_order_id = e.sales_order_id;
                self.status = InvoiceStatus::Draft;
                self.lines.clear();
                self.created = true;
            }
            InvoiceEvent::LineAdded(e) => {
                self.lines.push(e.line.clone());
            }
            InvoiceEvent::LineSynced(e) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.line_no == e.line.line_no) {
                    *line = e.line.clone();
                }
            }
            InvoiceEvent::InvoicePosted(_) => {
                self.status = InvoiceStatus::Posted;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InvoiceCommand::CreateInvoice(cmd) => self.handle_create(cmd),
            InvoiceCommand::AddLine(cmd) => self.handle_add_line(cmd),
            InvoiceCommand::EditLine(cmd) => self.handle_edit_line(cmd),
            InvoiceCommand::ResyncProduct(cmd) => self.handle_resync(cmd),
            InvoiceCommand::Post(cmd) => self.handle_post(cmd),
        }
    }
}

impl Invoice {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_invoice_id(&self, invoice_id: InvoiceId) -> Result<(), DomainError> {
        if self.id != invoice_id {
            return Err(DomainError::invariant("invoice_id mismatch"));
        }
        Ok(())
    }

    fn ensure_existing(&self, tenant_id: TenantId, invoice_id: InvoiceId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(tenant_id)?;
        self.ensure_invoice_id(invoice_id)
    }

    fn ensure_modifiable(&self) -> Result<(), DomainError> {
        if !self.is_modifiable() {
            return Err(DomainError::invariant("cannot modify a posted invoice"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("invoice already exists"));
        }

        Ok(vec![InvoiceEvent::InvoiceCreated(InvoiceCreated {
            tenant_id: cmd.tenant_id,
            invoice_id: cmd.invoice_id,
            sales_order_id: cmd.sales_order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.invoice_id)?;
        self.ensure_modifiable()?;

        if cmd.quantity < 0.0 || cmd.secondary_quantity.is_some_and(|qty| qty < 0.0) {
            return Err(DomainError::validation("quantities cannot be negative"));
        }
        if cmd.sale_line_no.is_some() && self.sales_order_id.is_none() {
            return Err(DomainError::invariant(
                "standalone invoice cannot bill a sale line",
            ));
        }
        if cmd.sale_line_no.is_some() && cmd.sales_order_id.is_none() {
            return Err(DomainError::invariant("sale line reference is missing its sales order"));
        }
        if cmd.sales_order_id.is_some() && cmd.sales_order_id != self.sales_order_id {
            return Err(DomainError::invariant(
                "sale line belongs to another sales order",
            ));
        }

        let line_no = (self.lines.len() as u32) + 1;
        let mut line = InvoiceLine::new(line_no, &cmd.product, cmd.quantity, cmd.secondary_quantity)?;
        line.sale_line_no = cmd.sale_line_no;

        Ok(vec![InvoiceEvent::LineAdded(LineAdded {
            tenant_id: cmd.tenant_id,
            invoice_id: cmd.invoice_id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_edit_line(&self, cmd: &EditLine) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.invoice_id)?;
        self.ensure_modifiable()?;

        if cmd.edit.quantity().is_some_and(|qty| qty < 0.0) {
            return Err(DomainError::validation("quantities cannot be negative"));
        }

        let mut line = self.line(cmd.line_no).cloned().ok_or_else(DomainError::not_found)?;
        let outcome = InvoiceLine::SECONDARY_QUANTITY.apply(&mut line, &cmd.product, cmd.edit)?;
        debug!(invoice_id = %self.id, line_no = cmd.line_no, ?outcome, "invoice line synced");

        Ok(vec![InvoiceEvent::LineSynced(LineSynced {
            tenant_id: cmd.tenant_id,
            invoice_id: cmd.invoice_id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_resync(&self, cmd: &ResyncProduct) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.invoice_id)?;

        self.lines
            .iter()
            .filter(|l| l.product_id == cmd.product.product_id)
            .map(|l| {
                let mut line = l.clone();
                InvoiceLine::SECONDARY_QUANTITY.apply(&mut line, &cmd.product, LineEdit::Resync)?;
                Ok(InvoiceEvent::LineSynced(LineSynced {
                    tenant_id: cmd.tenant_id,
                    invoice_id: cmd.invoice_id,
                    line,
                    occurred_at: cmd.occurred_at,
                }))
            })
            .collect()
    }

    fn handle_post(&self, cmd: &Post) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.invoice_id)?;

        if self.status == InvoiceStatus::Posted {
            return Err(DomainError::conflict("invoice is already posted"));
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation("cannot post invoice without lines"));
        }

        Ok(vec![InvoiceEvent::InvoicePosted(InvoicePosted {
            tenant_id: cmd.tenant_id,
            invoice_id: cmd.invoice_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
