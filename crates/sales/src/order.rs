use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use uomsync_core::{Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, Entity, TenantId};
use uomsync_events::Event;
use uomsync_products::{
    LineEdit, ProductId, ProductUomSnapshot, QuantityBinding, UnitOfMeasure,
    impl_secondary_uom_line,
};

/// Sales order identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SalesOrderId(pub AggregateId);

impl SalesOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SalesOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Sales order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalesOrderStatus {
    Draft,
    Confirmed,
    Invoiced,
}

/// Sale line: `product_uom_qty` and its secondary quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleOrderLine {
    line_no: u32,
    product_id: ProductId,
    secondary_unit: Option<UnitOfMeasure>,
    product_uom_qty: f64,
    secondary_quantity: f64,
}

impl_secondary_uom_line!(SaleOrderLine);

impl Entity for SaleOrderLine {
    type Id = u32;

    fn id(&self) -> &u32 {
        &self.line_no
    }
}

impl SaleOrderLine {
    pub const SECONDARY_QUANTITY: QuantityBinding<Self> = QuantityBinding::editable(
        "product_uom_qty",
        "secondary_quantity",
        Self::product_uom_qty,
        Self::write_product_uom_qty,
        Self::secondary_quantity,
        Self::write_secondary_quantity,
    );

    pub fn new(line_no: u32, product: &ProductUomSnapshot, product_uom_qty: f64) -> DomainResult<Self> {
        let mut line = Self {
            line_no,
            product_id: product.product_id,
            secondary_unit: None,
            product_uom_qty,
            secondary_quantity: 0.0,
        };
        Self::SECONDARY_QUANTITY.initialize(&mut line, product, None)?;
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

    pub fn product_uom_qty(&self) -> f64 {
        self.product_uom_qty
    }

    pub fn secondary_quantity(&self) -> f64 {
        self.secondary_quantity
    }

    fn write_product_uom_qty(&mut self, qty: f64) {
        self.product_uom_qty = qty;
    }

    fn write_secondary_quantity(&mut self, qty: f64) {
        self.secondary_quantity = qty;
    }
}

/// Aggregate root: SalesOrder.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesOrder {
    id: SalesOrderId,
    tenant_id: Option<TenantId>,
    status: SalesOrderStatus,
    lines: Vec<SaleOrderLine>,
    version: u64,
    created: bool,
}

impl SalesOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: SalesOrderId) -> Self {
        Self {
            id,
            tenant_id: None,
            status: SalesOrderStatus::Draft,
            lines: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> SalesOrderId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn status(&self) -> SalesOrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[SaleOrderLine] {
        &self.lines
    }

    pub fn line(&self, line_no: u32) -> Option<&SaleOrderLine> {
        self.lines.iter().find(|l| l.line_no == line_no)
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, SalesOrderStatus::Draft)
    }

    pub fn is_invoice_allowed(&self) -> bool {
        matches!(self.status, SalesOrderStatus::Confirmed)
    }
}

impl AggregateRoot for SalesOrder {
    type Id = SalesOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateSalesOrder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSalesOrder {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddLine {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub product: ProductUomSnapshot,
    pub product_uom_qty: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: EditLine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditLine {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub line_no: u32,
    pub product: ProductUomSnapshot,
    pub edit: LineEdit,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ResyncProduct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResyncProduct {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub product: ProductUomSnapshot,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmOrder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmOrder {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkInvoiced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkInvoiced {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SalesOrderCommand {
    CreateSalesOrder(CreateSalesOrder),
    AddLine(AddLine),
    EditLine(EditLine),
    ResyncProduct(ResyncProduct),
    ConfirmOrder(ConfirmOrder),
    MarkInvoiced(MarkInvoiced),
}

/// Event: SalesOrderCreated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesOrderCreated {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineAdded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineAdded {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub line: SaleOrderLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineSynced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSynced {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub line: SaleOrderLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderConfirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderConfirmed {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderInvoiced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderInvoiced {
    pub tenant_id: TenantId,
    pub order_id: SalesOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SalesOrderEvent {
    SalesOrderCreated(SalesOrderCreated),
    LineAdded(LineAdded),
    LineSynced(LineSynced),
    OrderConfirmed(OrderConfirmed),
    OrderInvoiced(OrderInvoiced),
}

impl Event for SalesOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SalesOrderEvent::SalesOrderCreated(_) => "sales.order.created",
            SalesOrderEvent::LineAdded(_) => "sales.order.line_added",
            SalesOrderEvent::LineSynced(_) => "sales.order.line_synced",
            SalesOrderEvent::OrderConfirmed(_) => "sales.order.confirmed",
            SalesOrderEvent::OrderInvoiced(_) => "sales.order.invoiced",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SalesOrderEvent::SalesOrderCreated(e) => e.occurred_at,
            SalesOrderEvent::LineAdded(e) => e.occurred_at,
            SalesOrderEvent::LineSynced(e) => e.occurred_at,
            SalesOrderEvent::OrderConfirmed(e) => e.occurred_at,
            SalesOrderEvent::OrderInvoiced(e) => e.occurred_at,
        }
    }
}

impl Aggregate for SalesOrder {
    type Command = SalesOrderCommand;
    type Event = SalesOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SalesOrderEvent::SalesOrderCreated(e) => {
                self.id = e.order_id;
                self.tenant_id = Some(e.tenant_id);
                self.status = SalesOrderStatus::Draft;
                self.lines.clear();
                self.created = true;
            }
            SalesOrderEvent::LineAdded(e) => {
                self.lines.push(e.line.clone());
            }
            SalesOrderEvent::LineSynced(e) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.line_no == e.line.line_no) {
                    *line = e.line.clone();
                }
            }
            SalesOrderEvent::OrderConfirmed(_) => {
                self.status = SalesOrderStatus::Confirmed;
            }
            SalesOrderEvent::OrderInvoiced(_) => {
                self.status = SalesOrderStatus::Invoiced;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SalesOrderCommand::CreateSalesOrder(cmd) => self.handle_create(cmd),
            SalesOrderCommand::AddLine(cmd) => self.handle_add_line(cmd),
            SalesOrderCommand::EditLine(cmd) => self.handle_edit_line(cmd),
            SalesOrderCommand::ResyncProduct(cmd) => self.handle_resync(cmd),
            SalesOrderCommand::ConfirmOrder(cmd) => self.handle_confirm(cmd),
            SalesOrderCommand::MarkInvoiced(cmd) => self.handle_mark_invoiced(cmd),
        }
    }
}

impl SalesOrder {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_order_id(&self, order_id: SalesOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_existing(&self, tenant_id: TenantId, order_id: SalesOrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(tenant_id)?;
        self.ensure_order_id(order_id)
    }

    fn ensure_modifiable(&self) -> Result<(), DomainError> {
        if !self.is_modifiable() {
            return Err(DomainError::invariant(
                "cannot modify order once it is confirmed or invoiced",
            ));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateSalesOrder) -> Result<Vec<SalesOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("sales order already exists"));
        }

        Ok(vec![SalesOrderEvent::SalesOrderCreated(SalesOrderCreated {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;
        self.ensure_modifiable()?;

        if cmd.product_uom_qty < 0.0 {
            return Err(DomainError::validation("product_uom_qty cannot be negative"));
        }

        let line_no = (self.lines.len() as u32) + 1;
        let line = SaleOrderLine::new(line_no, &cmd.product, cmd.product_uom_qty)?;

        Ok(vec![SalesOrderEvent::LineAdded(LineAdded {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_edit_line(&self, cmd: &EditLine) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;
        self.ensure_modifiable()?;

        if cmd.edit.quantity().is_some_and(|qty| qty < 0.0) {
            return Err(DomainError::validation("quantities cannot be negative"));
        }

        let mut line = self.line(cmd.line_no).cloned().ok_or_else(DomainError::not_found)?;
        let outcome = SaleOrderLine::SECONDARY_QUANTITY.apply(&mut line, &cmd.product, cmd.edit)?;
        debug!(order_id = %self.id, line_no = cmd.line_no, ?outcome, "sale line synced");

        Ok(vec![SalesOrderEvent::LineSynced(LineSynced {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_resync(&self, cmd: &ResyncProduct) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;

        self.lines
            .iter()
            .filter(|l| l.product_id == cmd.product.product_id)
            .map(|l| {
                let mut line = l.clone();
                SaleOrderLine::SECONDARY_QUANTITY.apply(&mut line, &cmd.product, LineEdit::Resync)?;
                Ok(SalesOrderEvent::LineSynced(LineSynced {
                    tenant_id: cmd.tenant_id,
                    order_id: cmd.order_id,
                    line,
                    occurred_at: cmd.occurred_at,
                }))
            })
            .collect()
    }

    fn handle_confirm(&self, cmd: &ConfirmOrder) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;

        if self.status != SalesOrderStatus::Draft {
            return Err(DomainError::invariant("only draft orders can be confirmed"));
        }

        if self.lines.is_empty() {
            return Err(DomainError::validation("cannot confirm order without lines"));
        }

        Ok(vec![SalesOrderEvent::OrderConfirmed(OrderConfirmed {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_invoiced(&self, cmd: &MarkInvoiced) -> Result<Vec<SalesOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;

        if !self.is_invoice_allowed() {
            return Err(DomainError::invariant("cannot invoice order that is not confirmed"));
        }

        Ok(vec![SalesOrderEvent::OrderInvoiced(OrderInvoiced {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
