use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use uomsync_core::{Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, Entity, TenantId};
use uomsync_events::Event;
use uomsync_products::{
    LineEdit, ProductId, ProductUomSnapshot, QuantityBinding, SyncOutcome, UnitOfMeasure,
    impl_secondary_uom_line,
};
use uomsync_sales::{ProcurementValues, SalesOrderId};

/// Stock move identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockMoveId(pub AggregateId);

impl StockMoveId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for StockMoveId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockMoveStatus {
    Draft,
    Done,
}

/// Sale line a move was procured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOrigin {
    pub sales_order_id: SalesOrderId,
    pub sale_line_no: u32,
}

/// Quantities of a move.
///
/// Two pairs share the product: the demand (`product_uom_qty` and the derived
/// `secondary_qty`) and the processed amount (`quantity` and the editable
/// `secondary_qty_done`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveQuantities {
    product_id: ProductId,
    secondary_unit: Option<UnitOfMeasure>,
    product_uom_qty: f64,
    quantity: f64,
    secondary_qty: f64,
    secondary_qty_done: f64,
}

impl_secondary_uom_line!(MoveQuantities);

impl MoveQuantities {
    pub const PLANNED: QuantityBinding<Self> = QuantityBinding::derived(
        "product_uom_qty",
        "secondary_qty",
        Self::product_uom_qty,
        Self::write_product_uom_qty,
        Self::secondary_qty,
        Self::write_secondary_qty,
    );

    pub const DONE: QuantityBinding<Self> = QuantityBinding::editable(
        "quantity",
        "secondary_qty_done",
        Self::quantity,
        Self::write_quantity,
        Self::secondary_qty_done,
        Self::write_secondary_qty_done,
    );

    fn new(
        product: &ProductUomSnapshot,
        product_uom_qty: f64,
        copied_secondary_qty: Option<f64>,
    ) -> DomainResult<Self> {
        let mut quantities = Self {
            product_id: product.product_id,
            secondary_unit: None,
            product_uom_qty,
            quantity: 0.0,
            secondary_qty: 0.0,
            secondary_qty_done: 0.0,
        };
        Self::PLANNED.initialize(&mut quantities, product, copied_secondary_qty)?;
        Self::DONE.initialize(&mut quantities, product, None)?;
        Ok(quantities)
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn secondary_unit(&self) -> Option<&UnitOfMeasure> {
        self.secondary_unit.as_ref()
    }

    /// Demand in the product's unit.
    pub fn product_uom_qty(&self) -> f64 {
        self.product_uom_qty
    }

    /// Processed amount in the product's unit.
    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn secondary_qty(&self) -> f64 {
        self.secondary_qty
    }

    pub fn secondary_qty_done(&self) -> f64 {
        self.secondary_qty_done
    }

    fn write_product_uom_qty(&mut self, qty: f64) {
        self.product_uom_qty = qty;
    }

    fn write_quantity(&mut self, qty: f64) {
        self.quantity = qty;
    }

    fn write_secondary_qty(&mut self, qty: f64) {
        self.secondary_qty = qty;
    }

    fn write_secondary_qty_done(&mut self, qty: f64) {
        self.secondary_qty_done = qty;
    }
}

/// Detailed operation of a move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMoveLine {
    line_no: u32,
    product_id: ProductId,
    secondary_unit: Option<UnitOfMeasure>,
    quantity: f64,
    secondary_qty_done: f64,
}

impl_secondary_uom_line!(StockMoveLine);

impl Entity for StockMoveLine {
    type Id = u32;

    fn id(&self) -> &u32 {
        &self.line_no
    }
}

impl StockMoveLine {
    pub const SECONDARY_QTY_DONE: QuantityBinding<Self> = QuantityBinding::editable(
        "quantity",
        "secondary_qty_done",
        Self::quantity,
        Self::write_quantity,
        Self::secondary_qty_done,
        Self::write_secondary_qty_done,
    );

    pub fn new(line_no: u32, product: &ProductUomSnapshot, quantity: f64) -> DomainResult<Self> {
        let mut line = Self {
            line_no,
            product_id: product.product_id,
            secondary_unit: None,
            quantity,
            secondary_qty_done: 0.0,
        };
        Self::SECONDARY_QTY_DONE.initialize(&mut line, product, None)?;
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

    pub fn secondary_qty_done(&self) -> f64 {
        self.secondary_qty_done
    }

    fn write_quantity(&mut self, qty: f64) {
        self.quantity = qty;
    }

    fn write_secondary_qty_done(&mut self, qty: f64) {
        self.secondary_qty_done = qty;
    }
}

/// Aggregate root: StockMove.
#[derive(Debug, Clone, PartialEq)]
pub struct StockMove {
    id: StockMoveId,
    tenant_id: Option<TenantId>,
    origin: Option<MoveOrigin>,
    status: StockMoveStatus,
    quantities: Option<MoveQuantities>,
    move_lines: Vec<StockMoveLine>,
    version: u64,
    created: bool,
}

impl StockMove {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: StockMoveId) -> Self {
        Self {
            id,
            tenant_id: None,
            origin: None,
            status: StockMoveStatus::Draft,
            quantities: None,
            move_lines: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> StockMoveId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn origin(&self) -> Option<MoveOrigin> {
        self.origin
    }

    pub fn status(&self) -> StockMoveStatus {
        self.status
    }

    /// `None` until the move is created.
    pub fn quantities(&self) -> Option<&MoveQuantities> {
        self.quantities.as_ref()
    }

    pub fn move_lines(&self) -> &[StockMoveLine] {
        &self.move_lines
    }

    pub fn move_line(&self, line_no: u32) -> Option<&StockMoveLine> {
        self.move_lines.iter().find(|l| l.line_no == line_no)
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, StockMoveStatus::Draft)
    }
}

impl AggregateRoot for StockMove {
    type Id = StockMoveId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateStockMove.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateStockMove {
    pub tenant_id: TenantId,
    pub move_id: StockMoveId,
    pub product: ProductUomSnapshot,
    pub product_uom_qty: f64,
    /// Planned secondary quantity copied from a sale line; recomputed when absent.
    pub secondary_qty: Option<f64>,
    pub origin: Option<MoveOrigin>,
    pub occurred_at: DateTime<Utc>,
}

impl CreateStockMove {
    /// Move fulfilling a sale line, seeded from its procurement values.
    pub fn from_procurement(
        tenant_id: TenantId,
        move_id: StockMoveId,
        product: ProductUomSnapshot,
        values: &ProcurementValues,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if values.product_id != product.product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(Self {
            tenant_id,
            move_id,
            product,
            product_uom_qty: values.product_uom_qty,
            secondary_qty: values.secondary_qty,
            origin: Some(MoveOrigin {
                sales_order_id: values.sales_order_id,
                sale_line_no: values.sale_line_no,
            }),
            occurred_at,
        })
    }
}

/// Command: SetDemand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetDemand {
    pub tenant_id: TenantId,
    pub move_id: StockMoveId,
    pub product: ProductUomSnapshot,
    pub product_uom_qty: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordDone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDone {
    pub tenant_id: TenantId,
    pub move_id: StockMoveId,
    pub product: ProductUomSnapshot,
    pub quantity: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetSecondaryDone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetSecondaryDone {
    pub tenant_id: TenantId,
    pub move_id: StockMoveId,
    pub product: ProductUomSnapshot,
    pub secondary_qty_done: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddMoveLine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddMoveLine {
    pub tenant_id: TenantId,
    pub move_id: StockMoveId,
    pub product: ProductUomSnapshot,
    /// Defaults to the move's demand when absent or zero.
    pub quantity: Option<f64>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: EditMoveLine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditMoveLine {
    pub tenant_id: TenantId,
    pub move_id: StockMoveId,
    pub line_no: u32,
    pub product: ProductUomSnapshot,
    pub edit: LineEdit,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ResyncProduct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResyncProduct {
    pub tenant_id: TenantId,
    pub move_id: StockMoveId,
    pub product: ProductUomSnapshot,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkDone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkDone {
    pub tenant_id: TenantId,
    pub move_id: StockMoveId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StockMoveCommand {
    CreateStockMove(CreateStockMove),
    SetDemand(SetDemand),
    RecordDone(RecordDone),
    SetSecondaryDone(SetSecondaryDone),
    AddMoveLine(AddMoveLine),
    EditMoveLine(EditMoveLine),
    ResyncProduct(ResyncProduct),
    MarkDone(MarkDone),
}

/// Event: StockMoveCreated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMoveCreated {
    pub tenant_id: TenantId,
    pub move_id: StockMoveId,
    pub origin: Option<MoveOrigin>,
    pub quantities: MoveQuantities,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuantitiesSynced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantitiesSynced {
    pub tenant_id: TenantId,
    pub move_id: StockMoveId,
    pub quantities: MoveQuantities,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MoveLineAdded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveLineAdded {
    pub tenant_id: TenantId,
    pub move_id: StockMoveId,
    pub line: StockMoveLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MoveLineSynced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveLineSynced {
    pub tenant_id: TenantId,
    pub move_id: StockMoveId,
    pub line: StockMoveLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockMoveDone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMoveDone {
    pub tenant_id: TenantId,
    pub move_id: StockMoveId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StockMoveEvent {
    StockMoveCreated(StockMoveCreated),
    QuantitiesSynced(QuantitiesSynced),
    MoveLineAdded(MoveLineAdded),
    MoveLineSynced(MoveLineSynced),
    StockMoveDone(StockMoveDone),
}

impl Event for StockMoveEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockMoveEvent::StockMoveCreated(_) => "inventory.move.created",
            StockMoveEvent::QuantitiesSynced(_) => "inventory.move.quantities_synced",
            StockMoveEvent::MoveLineAdded(_) => "inventory.move.line_added",
            StockMoveEvent::MoveLineSynced(_) => "inventory.move.line_synced",
            StockMoveEvent::StockMoveDone(_) => "inventory.move.done",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockMoveEvent::StockMoveCreated(e) => e.occurred_at,
            StockMoveEvent::QuantitiesSynced(e) => e.occurred_at,
            StockMoveEvent::MoveLineAdded(e) => e.occurred_at,
            StockMoveEvent::MoveLineSynced(e) => e.occurred_at,
            StockMoveEvent::StockMoveDone(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StockMove {
    type Command = StockMoveCommand;
    type Event = StockMoveEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockMoveEvent::StockMoveCreated(e) => {
                self.id = e.move_id;
                self.tenant_id = Some(e.tenant_id);
                self.origin = e.origin;
                self.status = StockMoveStatus::Draft;
                self.quantities = Some(e.quantities.clone());
                self.move_lines.clear();
                self.created = true;
            }
            StockMoveEvent::QuantitiesSynced(e) => {
                self.quantities = Some(e.quantities.clone());
            }
            StockMoveEvent::MoveLineAdded(e) => {
                self.move_lines.push(e.line.clone());
            }
            StockMoveEvent::MoveLineSynced(e) => {
                if let Some(line) = self.move_lines.iter_mut().find(|l| l.line_no == e.line.line_no) {
                    *line = e.line.clone();
                }
            }
            StockMoveEvent::StockMoveDone(_) => {
                self.status = StockMoveStatus::Done;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockMoveCommand::CreateStockMove(cmd) => self.handle_create(cmd),
            StockMoveCommand::SetDemand(cmd) => self.handle_edit_quantities(
                cmd.tenant_id,
                cmd.move_id,
                &cmd.product,
                &MoveQuantities::PLANNED,
                LineEdit::SetPrimary(cmd.product_uom_qty),
                cmd.occurred_at,
            ),
            StockMoveCommand::RecordDone(cmd) => self.handle_edit_quantities(
                cmd.tenant_id,
                cmd.move_id,
                &cmd.product,
                &MoveQuantities::DONE,
                LineEdit::SetPrimary(cmd.quantity),
                cmd.occurred_at,
            ),
            StockMoveCommand::SetSecondaryDone(cmd) => self.handle_edit_quantities(
                cmd.tenant_id,
                cmd.move_id,
                &cmd.product,
                &MoveQuantities::DONE,
                LineEdit::SetSecondary(cmd.secondary_qty_done),
                cmd.occurred_at,
            ),
            StockMoveCommand::AddMoveLine(cmd) => self.handle_add_move_line(cmd),
            StockMoveCommand::EditMoveLine(cmd) => self.handle_edit_move_line(cmd),
            StockMoveCommand::ResyncProduct(cmd) => self.handle_resync(cmd),
            StockMoveCommand::MarkDone(cmd) => self.handle_mark_done(cmd),
        }
    }
}

fn ensure_non_negative(edit: LineEdit) -> Result<(), DomainError> {
    if edit.quantity().is_some_and(|qty| qty < 0.0) {
        return Err(DomainError::validation("quantities cannot be negative"));
    }
    Ok(())
}

impl StockMove {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_move_id(&self, move_id: StockMoveId) -> Result<(), DomainError> {
        if self.id != move_id {
            return Err(DomainError::invariant("move_id mismatch"));
        }
        Ok(())
    }

    fn existing_quantities(
        &self,
        tenant_id: TenantId,
        move_id: StockMoveId,
    ) -> Result<&MoveQuantities, DomainError> {
        self.ensure_tenant(tenant_id)?;
        self.ensure_move_id(move_id)?;
        self.quantities.as_ref().ok_or_else(DomainError::not_found)
    }

    fn ensure_modifiable(&self) -> Result<(), DomainError> {
        if !self.is_modifiable() {
            return Err(DomainError::invariant("cannot modify a done stock move"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateStockMove) -> Result<Vec<StockMoveEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("stock move already exists"));
        }
        if cmd.product_uom_qty < 0.0 || cmd.secondary_qty.is_some_and(|qty| qty < 0.0) {
            return Err(DomainError::validation("quantities cannot be negative"));
        }

        let quantities = MoveQuantities::new(&cmd.product, cmd.product_uom_qty, cmd.secondary_qty)?;

        Ok(vec![StockMoveEvent::StockMoveCreated(StockMoveCreated {
            tenant_id: cmd.tenant_id,
            move_id: cmd.move_id,
            origin: cmd.origin,
            quantities,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_edit_quantities(
        &self,
        tenant_id: TenantId,
        move_id: StockMoveId,
        product: &ProductUomSnapshot,
        binding: &QuantityBinding<MoveQuantities>,
        edit: LineEdit,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<StockMoveEvent>, DomainError> {
        let mut quantities = self.existing_quantities(tenant_id, move_id)?.clone();
        self.ensure_modifiable()?;
        ensure_non_negative(edit)?;

        let outcome = binding.apply(&mut quantities, product, edit)?;
        debug!(move_id = %self.id, field = binding.primary_field(), ?outcome, "stock move synced");

        Ok(vec![StockMoveEvent::QuantitiesSynced(QuantitiesSynced {
            tenant_id,
            move_id,
            quantities,
            occurred_at,
        })])
    }

    fn handle_add_move_line(&self, cmd: &AddMoveLine) -> Result<Vec<StockMoveEvent>, DomainError> {
        let quantities = self.existing_quantities(cmd.tenant_id, cmd.move_id)?;
        self.ensure_modifiable()?;

        if quantities.product_id != cmd.product.product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        let quantity = cmd
            .quantity
            .filter(|qty| *qty != 0.0)
            .unwrap_or(quantities.product_uom_qty);
        if quantity < 0.0 {
            return Err(DomainError::validation("quantities cannot be negative"));
        }

        let line_no = (self.move_lines.len() as u32) + 1;
        let line = StockMoveLine::new(line_no, &cmd.product, quantity)?;

        Ok(vec![StockMoveEvent::MoveLineAdded(MoveLineAdded {
            tenant_id: cmd.tenant_id,
            move_id: cmd.move_id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_edit_move_line(&self, cmd: &EditMoveLine) -> Result<Vec<StockMoveEvent>, DomainError> {
        self.existing_quantities(cmd.tenant_id, cmd.move_id)?;
        self.ensure_modifiable()?;
        ensure_non_negative(cmd.edit)?;

        if cmd.edit == LineEdit::ChangeProduct {
            return Err(DomainError::validation(
                "move lines keep the product of their move",
            ));
        }

        let mut line = self
            .move_line(cmd.line_no)
            .cloned()
            .ok_or_else(DomainError::not_found)?;
        let outcome = StockMoveLine::SECONDARY_QTY_DONE.apply(&mut line, &cmd.product, cmd.edit)?;
        debug!(move_id = %self.id, line_no = cmd.line_no, ?outcome, "move line synced");

        Ok(vec![StockMoveEvent::MoveLineSynced(MoveLineSynced {
            tenant_id: cmd.tenant_id,
            move_id: cmd.move_id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_resync(&self, cmd: &ResyncProduct) -> Result<Vec<StockMoveEvent>, DomainError> {
        let current = self.existing_quantities(cmd.tenant_id, cmd.move_id)?;
        if current.product_id != cmd.product.product_id {
            return Ok(Vec::new());
        }

        let mut quantities = current.clone();
        MoveQuantities::PLANNED.apply(&mut quantities, &cmd.product, LineEdit::Resync)?;
        MoveQuantities::DONE.apply(&mut quantities, &cmd.product, LineEdit::Resync)?;

        let mut events = vec![StockMoveEvent::QuantitiesSynced(QuantitiesSynced {
            tenant_id: cmd.tenant_id,
            move_id: cmd.move_id,
            quantities,
            occurred_at: cmd.occurred_at,
        })];

        for l in &self.move_lines {
            let mut line = l.clone();
            let outcome: SyncOutcome =
                StockMoveLine::SECONDARY_QTY_DONE.apply(&mut line, &cmd.product, LineEdit::Resync)?;
            debug!(move_id = %self.id, line_no = line.line_no, ?outcome, "move line resynced");
            events.push(StockMoveEvent::MoveLineSynced(MoveLineSynced {
                tenant_id: cmd.tenant_id,
                move_id: cmd.move_id,
                line,
                occurred_at: cmd.occurred_at,
            }));
        }

        Ok(events)
    }

    fn handle_mark_done(&self, cmd: &MarkDone) -> Result<Vec<StockMoveEvent>, DomainError> {
        let quantities = self.existing_quantities(cmd.tenant_id, cmd.move_id)?;

        if self.status == StockMoveStatus::Done {
            return Err(DomainError::conflict("stock move is already done"));
        }
        if quantities.quantity <= 0.0 {
            return Err(DomainError::validation(
                "cannot complete a stock move with nothing processed",
            ));
        }

        Ok(vec![StockMoveEvent::StockMoveDone(StockMoveDone {
            tenant_id: cmd.tenant_id,
            move_id: cmd.move_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
