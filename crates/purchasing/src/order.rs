use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use uomsync_core::{Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, Entity, TenantId};
use uomsync_events::Event;
use uomsync_products::{
    LineEdit, ProductId, ProductUomSnapshot, QuantityBinding, UnitOfMeasure,
    impl_secondary_uom_line,
};

/// Purchase order identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseOrderId(pub AggregateId);

impl PurchaseOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PurchaseOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Purchase order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Draft,
    Approved,
}

/// Purchase order line: ordered `product_qty` and its secondary quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    line_no: u32,
    product_id: ProductId,
    secondary_unit: Option<UnitOfMeasure>,
    product_qty: f64,
    secondary_quantity: f64,
}

impl_secondary_uom_line!(PurchaseOrderLine);

impl Entity for PurchaseOrderLine {
    type Id = u32;

    fn id(&self) -> &u32 {
        &self.line_no
    }
}

impl PurchaseOrderLine {
    pub const SECONDARY_QUANTITY: QuantityBinding<Self> = QuantityBinding::editable(
        "product_qty",
        "secondary_quantity",
        Self::product_qty,
        Self::write_product_qty,
        Self::secondary_quantity,
        Self::write_secondary_quantity,
    );

    /// New line with its secondary quantity computed from `product_qty`.
    pub fn new(line_no: u32, product: &ProductUomSnapshot, product_qty: f64) -> DomainResult<Self> {
        let mut line = Self {
            line_no,
            product_id: product.product_id,
            secondary_unit: None,
            product_qty,
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

    pub fn product_qty(&self) -> f64 {
        self.product_qty
    }

    pub fn secondary_quantity(&self) -> f64 {
        self.secondary_quantity
    }

    fn write_product_qty(&mut self, qty: f64) {
        self.product_qty = qty;
    }

    fn write_secondary_quantity(&mut self, qty: f64) {
        self.secondary_quantity = qty;
    }
}

/// Aggregate root: PurchaseOrder.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    tenant_id: Option<TenantId>,
    status: PurchaseOrderStatus,
    lines: Vec<PurchaseOrderLine>,
    version: u64,
    created: bool,
}

impl PurchaseOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PurchaseOrderId) -> Self {
        Self {
            id,
            tenant_id: None,
            status: PurchaseOrderStatus::Draft,
            lines: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[PurchaseOrderLine] {
        &self.lines
    }

    pub fn line(&self, line_no: u32) -> Option<&PurchaseOrderLine> {
        self.lines.iter().find(|l| l.line_no == line_no)
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, PurchaseOrderStatus::Draft)
    }
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreatePurchaseOrder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePurchaseOrder {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddLine {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub product: ProductUomSnapshot,
    pub product_qty: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: EditLine (primary or secondary quantity, or product).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditLine {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub line_no: u32,
    pub product: ProductUomSnapshot,
    pub edit: LineEdit,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ResyncProduct (product settings changed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResyncProduct {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub product: ProductUomSnapshot,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Approve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approve {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PurchaseOrderCommand {
    CreatePurchaseOrder(CreatePurchaseOrder),
    AddLine(AddLine),
    EditLine(EditLine),
    ResyncProduct(ResyncProduct),
    Approve(Approve),
}

/// Event: PurchaseOrderCreated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderCreated {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineAdded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineAdded {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub line: PurchaseOrderLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineSynced. Carries the line with both quantities after the edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSynced {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub line: PurchaseOrderLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderApproved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderApproved {
    pub tenant_id: TenantId,
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PurchaseOrderEvent {
    PurchaseOrderCreated(PurchaseOrderCreated),
    LineAdded(LineAdded),
    LineSynced(LineSynced),
    PurchaseOrderApproved(PurchaseOrderApproved),
}

impl Event for PurchaseOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(_) => "purchasing.purchase_order.created",
            PurchaseOrderEvent::LineAdded(_) => "purchasing.purchase_order.line_added",
            PurchaseOrderEvent::LineSynced(_) => "purchasing.purchase_order.line_synced",
            PurchaseOrderEvent::PurchaseOrderApproved(_) => "purchasing.purchase_order.approved",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => e.occurred_at,
            PurchaseOrderEvent::LineAdded(e) => e.occurred_at,
            PurchaseOrderEvent::LineSynced(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderApproved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PurchaseOrder {
    type Command = PurchaseOrderCommand;
    type Event = PurchaseOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => {
                self.id = e.order_id;
                self.tenant_id = Some(e.tenant_id);
                self.status = PurchaseOrderStatus::Draft;
                self.lines.clear();
                self.created = true;
            }
            PurchaseOrderEvent::LineAdded(e) => {
                self.lines.push(e.line.clone());
            }
            PurchaseOrderEvent::LineSynced(e) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.line_no == e.line.line_no) {
                    *line = e.line.clone();
                }
            }
            PurchaseOrderEvent::PurchaseOrderApproved(_) => {
                self.status = PurchaseOrderStatus::Approved;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PurchaseOrderCommand::CreatePurchaseOrder(cmd) => self.handle_create(cmd),
            PurchaseOrderCommand::AddLine(cmd) => self.handle_add_line(cmd),
            PurchaseOrderCommand::EditLine(cmd) => self.handle_edit_line(cmd),
            PurchaseOrderCommand::ResyncProduct(cmd) => self.handle_resync(cmd),
            PurchaseOrderCommand::Approve(cmd) => self.handle_approve(cmd),
        }
    }
}

impl PurchaseOrder {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_order_id(&self, order_id: PurchaseOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_existing(&self, tenant_id: TenantId, order_id: PurchaseOrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(tenant_id)?;
        self.ensure_order_id(order_id)
    }

    fn ensure_modifiable(&self) -> Result<(), DomainError> {
        if !self.is_modifiable() {
            return Err(DomainError::invariant(
                "cannot modify purchase order once it is approved",
            ));
        }
        Ok(())
    }

    fn handle_create(
        &self,
        cmd: &CreatePurchaseOrder,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("purchase order already exists"));
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderCreated(PurchaseOrderCreated {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;
        self.ensure_modifiable()?;

        if cmd.product_qty < 0.0 {
            return Err(DomainError::validation("product_qty cannot be negative"));
        }

        let line_no = (self.lines.len() as u32) + 1;
        let line = PurchaseOrderLine::new(line_no, &cmd.product, cmd.product_qty)?;

        Ok(vec![PurchaseOrderEvent::LineAdded(LineAdded {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_edit_line(&self, cmd: &EditLine) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;
        self.ensure_modifiable()?;

        if cmd.edit.quantity().is_some_and(|qty| qty < 0.0) {
            return Err(DomainError::validation("quantities cannot be negative"));
        }

        let mut line = self.line(cmd.line_no).cloned().ok_or_else(DomainError::not_found)?;
        let outcome = PurchaseOrderLine::SECONDARY_QUANTITY.apply(&mut line, &cmd.product, cmd.edit)?;
        debug!(order_id = %self.id, line_no = cmd.line_no, ?outcome, "purchase line synced");

        Ok(vec![PurchaseOrderEvent::LineSynced(LineSynced {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    /// Recompute every line of the product. Allowed in any status: secondary
    /// quantities always follow the product's current settings.
    fn handle_resync(&self, cmd: &ResyncProduct) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;

        self.lines
            .iter()
            .filter(|l| l.product_id == cmd.product.product_id)
            .map(|l| {
                let mut line = l.clone();
                PurchaseOrderLine::SECONDARY_QUANTITY.apply(&mut line, &cmd.product, LineEdit::Resync)?;
                Ok(PurchaseOrderEvent::LineSynced(LineSynced {
                    tenant_id: cmd.tenant_id,
                    order_id: cmd.order_id,
                    line,
                    occurred_at: cmd.occurred_at,
                }))
            })
            .collect()
    }

    fn handle_approve(&self, cmd: &Approve) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.order_id)?;

        if self.status == PurchaseOrderStatus::Approved {
            return Err(DomainError::conflict("purchase order is already approved"));
        }

        if self.lines.is_empty() {
            return Err(DomainError::validation("cannot approve an empty purchase order"));
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderApproved(PurchaseOrderApproved {
            tenant_id: cmd.tenant_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uomsync_products::{SecondaryUom, UomCategory};

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn test_order_id() -> PurchaseOrderId {
        PurchaseOrderId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    /// Bought by the box of 10, stocked by the unit.
    fn boxed_product(ratio: f64) -> ProductUomSnapshot {
        let count = UomCategory::new("Count");
        let unit = UnitOfMeasure::reference("Unit", count.clone());
        let boxed = UnitOfMeasure::bigger("Box of 10", count, 10.0).unwrap();
        ProductUomSnapshot {
            product_id: ProductId::new(AggregateId::new()),
            secondary: SecondaryUom::enabled(&unit, boxed, ratio).unwrap(),
            uom: unit,
        }
    }

    fn created_order(tenant_id: TenantId, order_id: PurchaseOrderId) -> PurchaseOrder {
        let mut order = PurchaseOrder::empty(order_id);
        let events = order
            .handle(&PurchaseOrderCommand::CreatePurchaseOrder(CreatePurchaseOrder {
                tenant_id,
                order_id,
                occurred_at: test_time(),
            }))
            .unwrap();
        order.apply(&events[0]);
        order
    }

    fn add_line(
        order: &mut PurchaseOrder,
        tenant_id: TenantId,
        product: &ProductUomSnapshot,
        product_qty: f64,
    ) {
        let events = order
            .handle(&PurchaseOrderCommand::AddLine(AddLine {
                tenant_id,
                order_id: order.id_typed(),
                product: product.clone(),
                product_qty,
                occurred_at: test_time(),
            }))
            .unwrap();
        order.apply(&events[0]);
    }

    fn edit(
        order: &PurchaseOrder,
        tenant_id: TenantId,
        product: &ProductUomSnapshot,
        edit: LineEdit,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        order.handle(&PurchaseOrderCommand::EditLine(EditLine {
            tenant_id,
            order_id: order.id_typed(),
            line_no: 1,
            product: product.clone(),
            edit,
            occurred_at: test_time(),
        }))
    }

    #[test]
    fn create_purchase_order_emits_created_event() {
        let tenant_id = test_tenant_id();
        let order_id = test_order_id();
        let order = created_order(tenant_id, order_id);

        assert_eq!(order.tenant_id(), Some(tenant_id));
        assert_eq!(order.status(), PurchaseOrderStatus::Draft);
        assert!(order.lines().is_empty());
        assert_eq!(order.version(), 1);
    }

    #[test]
    fn added_line_carries_secondary_quantity() {
        let tenant_id = test_tenant_id();
        let product = boxed_product(0.1);
        let mut order = created_order(tenant_id, test_order_id());

        add_line(&mut order, tenant_id, &product, 45.0);

        let line = &order.lines()[0];
        assert_eq!(line.line_no(), 1);
        assert_eq!(line.product_qty(), 45.0);
        assert_eq!(line.secondary_quantity(), 4.5);
        assert_eq!(line.secondary_unit().map(UnitOfMeasure::name), Some("Box of 10"));
    }

    #[test]
    fn editing_secondary_quantity_sets_product_qty() {
        let tenant_id = test_tenant_id();
        let product = boxed_product(0.1);
        let mut order = created_order(tenant_id, test_order_id());
        add_line(&mut order, tenant_id, &product, 10.0);

        let events = edit(&order, tenant_id, &product, LineEdit::SetSecondary(3.0)).unwrap();
        assert_eq!(events.len(), 1);
        order.apply(&events[0]);

        let line = &order.lines()[0];
        assert_eq!(line.secondary_quantity(), 3.0);
        assert!((line.product_qty() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn editing_product_qty_recomputes_secondary() {
        let tenant_id = test_tenant_id();
        let product = boxed_product(0.1);
        let mut order = created_order(tenant_id, test_order_id());
        add_line(&mut order, tenant_id, &product, 10.0);

        let events = edit(&order, tenant_id, &product, LineEdit::SetPrimary(125.0)).unwrap();
        order.apply(&events[0]);

        assert_eq!(order.lines()[0].secondary_quantity(), 12.5);
    }

    #[test]
    fn rejects_negative_quantities_and_unknown_lines() {
        let tenant_id = test_tenant_id();
        let product = boxed_product(0.1);
        let mut order = created_order(tenant_id, test_order_id());

        let err = order
            .handle(&PurchaseOrderCommand::AddLine(AddLine {
                tenant_id,
                order_id: order.id_typed(),
                product: product.clone(),
                product_qty: -1.0,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        assert_eq!(
            edit(&order, tenant_id, &product, LineEdit::SetPrimary(1.0)).unwrap_err(),
            DomainError::NotFound
        );

        add_line(&mut order, tenant_id, &product, 10.0);
        let err = edit(&order, tenant_id, &product, LineEdit::SetSecondary(-2.0)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn resync_follows_new_ratio_even_after_approval() {
        let tenant_id = test_tenant_id();
        let product = boxed_product(0.1);
        let other = boxed_product(0.1);
        let mut order = created_order(tenant_id, test_order_id());
        add_line(&mut order, tenant_id, &product, 40.0);
        add_line(&mut order, tenant_id, &other, 40.0);

        let events = order
            .handle(&PurchaseOrderCommand::Approve(Approve {
                tenant_id,
                order_id: order.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap();
        order.apply(&events[0]);

        let mut repacked = product.clone();
        let count = UomCategory::new("Count");
        let unit = UnitOfMeasure::reference("Unit", count.clone());
        let crate_of_20 = UnitOfMeasure::bigger("Crate of 20", count, 20.0).unwrap();
        repacked.secondary = SecondaryUom::enabled(&unit, crate_of_20, 0.05).unwrap();

        let events = order
            .handle(&PurchaseOrderCommand::ResyncProduct(ResyncProduct {
                tenant_id,
                order_id: order.id_typed(),
                product: repacked,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(events.len(), 1);
        for event in &events {
            order.apply(event);
        }

        assert_eq!(order.lines()[0].secondary_quantity(), 2.0);
        assert_eq!(order.lines()[1].secondary_quantity(), 4.0);
    }

    #[test]
    fn approved_order_rejects_line_edits() {
        let tenant_id = test_tenant_id();
        let product = boxed_product(0.1);
        let mut order = created_order(tenant_id, test_order_id());
        add_line(&mut order, tenant_id, &product, 10.0);

        let approve = PurchaseOrderCommand::Approve(Approve {
            tenant_id,
            order_id: order.id_typed(),
            occurred_at: test_time(),
        });
        let events = order.handle(&approve).unwrap();
        order.apply(&events[0]);

        let err = edit(&order, tenant_id, &product, LineEdit::SetPrimary(5.0)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        let err = order.handle(&approve).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn approve_rejects_empty_order() {
        let tenant_id = test_tenant_id();
        let order = created_order(tenant_id, test_order_id());

        let err = order
            .handle(&PurchaseOrderCommand::Approve(Approve {
                tenant_id,
                order_id: order.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn commands_for_another_tenant_are_rejected() {
        let product = boxed_product(0.1);
        let order = created_order(test_tenant_id(), test_order_id());

        let err = order
            .handle(&PurchaseOrderCommand::AddLine(AddLine {
                tenant_id: test_tenant_id(),
                order_id: order.id_typed(),
                product,
                product_qty: 1.0,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 200,
                ..ProptestConfig::default()
            })]

            /// Every line event stores quantities that agree with the product settings.
            #[test]
            fn line_events_are_consistent(qty in 0.0f64..1.0e5, secondary in 0.0f64..1.0e4) {
                let tenant_id = test_tenant_id();
                let product = boxed_product(0.1);
                let mut order = created_order(tenant_id, test_order_id());
                add_line(&mut order, tenant_id, &product, qty);
                let line = &order.lines()[0];
                prop_assert!(product.secondary.is_consistent(line.product_qty(), line.secondary_quantity()));

                let secondary = (secondary * 100.0).round() / 100.0;
                let events = edit(&order, tenant_id, &product, LineEdit::SetSecondary(secondary)).unwrap();
                order.apply(&events[0]);
                let line = &order.lines()[0];
                prop_assert_eq!(line.secondary_quantity(), secondary);
                prop_assert!(product.secondary.is_consistent(line.product_qty(), line.secondary_quantity()));
            }
        }
    }
}
