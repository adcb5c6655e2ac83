//! On-hand stock of one product at one location.
//!
//! `secondary_quantity` is display-only: it always follows `quantity` and is
//! never edited directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use uomsync_core::{Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, TenantId};
use uomsync_events::Event;
use uomsync_products::{
    LineEdit, ProductId, ProductUomSnapshot, QuantityBinding, UnitOfMeasure,
    impl_secondary_uom_line,
};

/// Stock quant identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockQuantId(pub AggregateId);

impl StockQuantId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for StockQuantId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Quantity snapshot carried by quant events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantLevel {
    product_id: ProductId,
    secondary_unit: Option<UnitOfMeasure>,
    quantity: f64,
    secondary_quantity: f64,
}

impl_secondary_uom_line!(QuantLevel);

impl QuantLevel {
    pub const SECONDARY_QUANTITY: QuantityBinding<Self> = QuantityBinding::derived(
        "quantity",
        "secondary_quantity",
        Self::quantity,
        Self::write_quantity,
        Self::secondary_quantity,
        Self::write_secondary_quantity,
    );

    fn empty(product: &ProductUomSnapshot) -> DomainResult<Self> {
        let mut level = Self {
            product_id: product.product_id,
            secondary_unit: None,
            quantity: 0.0,
            secondary_quantity: 0.0,
        };
        Self::SECONDARY_QUANTITY.initialize(&mut level, product, None)?;
        Ok(level)
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

    fn write_quantity(&mut self, qty: f64) {
        self.quantity = qty;
    }

    fn write_secondary_quantity(&mut self, qty: f64) {
        self.secondary_quantity = qty;
    }
}

/// Aggregate root: StockQuant.
#[derive(Debug, Clone, PartialEq)]
pub struct StockQuant {
    id: StockQuantId,
    tenant_id: Option<TenantId>,
    location: String,
    level: Option<QuantLevel>,
    version: u64,
    created: bool,
}

impl StockQuant {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: StockQuantId) -> Self {
        Self {
            id,
            tenant_id: None,
            location: String::new(),
            level: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> StockQuantId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn product_id(&self) -> Option<ProductId> {
        self.level.as_ref().map(QuantLevel::product_id)
    }

    pub fn quantity(&self) -> f64 {
        self.level.as_ref().map_or(0.0, QuantLevel::quantity)
    }

    pub fn secondary_quantity(&self) -> f64 {
        self.level.as_ref().map_or(0.0, QuantLevel::secondary_quantity)
    }

    pub fn secondary_unit(&self) -> Option<&UnitOfMeasure> {
        self.level.as_ref().and_then(QuantLevel::secondary_unit)
    }
}

impl AggregateRoot for StockQuant {
    type Id = StockQuantId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateQuant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateQuant {
    pub tenant_id: TenantId,
    pub quant_id: StockQuantId,
    pub product: ProductUomSnapshot,
    pub location: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateAvailableQuantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateAvailableQuantity {
    pub tenant_id: TenantId,
    pub quant_id: StockQuantId,
    pub product: ProductUomSnapshot,
    pub delta: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ResyncProduct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResyncProduct {
    pub tenant_id: TenantId,
    pub quant_id: StockQuantId,
    pub product: ProductUomSnapshot,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuantCommand {
    CreateQuant(CreateQuant),
    UpdateAvailableQuantity(UpdateAvailableQuantity),
    ResyncProduct(ResyncProduct),
}

/// Event: QuantCreated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantCreated {
    pub tenant_id: TenantId,
    pub quant_id: StockQuantId,
    pub location: String,
    pub level: QuantLevel,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuantityUpdated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityUpdated {
    pub tenant_id: TenantId,
    pub quant_id: StockQuantId,
    pub delta: f64,
    pub level: QuantLevel,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuantResynced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantResynced {
    pub tenant_id: TenantId,
    pub quant_id: StockQuantId,
    pub level: QuantLevel,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuantEvent {
    QuantCreated(QuantCreated),
    QuantityUpdated(QuantityUpdated),
    QuantResynced(QuantResynced),
}

impl Event for QuantEvent {
    fn event_type(&self) -> &'static str {
        match self {
            QuantEvent::QuantCreated(_) => "inventory.quant.created",
            QuantEvent::QuantityUpdated(_) => "inventory.quant.quantity_updated",
            QuantEvent::QuantResynced(_) => "inventory.quant.resynced",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            QuantEvent::QuantCreated(e) => e.occurred_at,
            QuantEvent::QuantityUpdated(e) => e.occurred_at,
            QuantEvent::QuantResynced(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StockQuant {
    type Command = QuantCommand;
    type Event = QuantEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            QuantEvent::QuantCreated(e) => {
                self.id = e.quant_id;
                self.tenant_id = Some(e.tenant_id);
                self.location = e.location.clone();
                self.level = Some(e.level.clone());
                self.created = true;
            }
            QuantEvent::QuantityUpdated(e) => {
                self.level = Some(e.level.clone());
            }
            QuantEvent::QuantResynced(e) => {
                self.level = Some(e.level.clone());
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            QuantCommand::CreateQuant(cmd) => self.handle_create(cmd),
            QuantCommand::UpdateAvailableQuantity(cmd) => self.handle_update(cmd),
            QuantCommand::ResyncProduct(cmd) => self.handle_resync(cmd),
        }
    }
}

impl StockQuant {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_quant_id(&self, quant_id: StockQuantId) -> Result<(), DomainError> {
        if self.id != quant_id {
            return Err(DomainError::invariant("quant_id mismatch"));
        }
        Ok(())
    }

    fn existing_level(&self, tenant_id: TenantId, quant_id: StockQuantId) -> Result<&QuantLevel, DomainError> {
        self.ensure_tenant(tenant_id)?;
        self.ensure_quant_id(quant_id)?;
        self.level.as_ref().ok_or_else(DomainError::not_found)
    }

    fn handle_create(&self, cmd: &CreateQuant) -> Result<Vec<QuantEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("quant already exists"));
        }
        if cmd.location.trim().is_empty() {
            return Err(DomainError::validation("location cannot be empty"));
        }

        Ok(vec![QuantEvent::QuantCreated(QuantCreated {
            tenant_id: cmd.tenant_id,
            quant_id: cmd.quant_id,
            location: cmd.location.clone(),
            level: QuantLevel::empty(&cmd.product)?,
            occurred_at: cmd.occurred_at,
        })])
    }

    /// Quants may go negative: outgoing moves can be validated before stock
    /// is received.
    fn handle_update(&self, cmd: &UpdateAvailableQuantity) -> Result<Vec<QuantEvent>, DomainError> {
        let current = self.existing_level(cmd.tenant_id, cmd.quant_id)?;

        if !cmd.delta.is_finite() {
            return Err(DomainError::validation("delta must be a finite number"));
        }
        if cmd.delta == 0.0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }

        let mut level = current.clone();
        let new_quantity = level.quantity + cmd.delta;
        let outcome =
            QuantLevel::SECONDARY_QUANTITY.apply(&mut level, &cmd.product, LineEdit::SetPrimary(new_quantity))?;
        debug!(quant_id = %self.id, delta = cmd.delta, ?outcome, "quant updated");

        Ok(vec![QuantEvent::QuantityUpdated(QuantityUpdated {
            tenant_id: cmd.tenant_id,
            quant_id: cmd.quant_id,
            delta: cmd.delta,
            level,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_resync(&self, cmd: &ResyncProduct) -> Result<Vec<QuantEvent>, DomainError> {
        let current = self.existing_level(cmd.tenant_id, cmd.quant_id)?;
        if current.product_id != cmd.product.product_id {
            return Ok(Vec::new());
        }

        let mut level = current.clone();
        QuantLevel::SECONDARY_QUANTITY.apply(&mut level, &cmd.product, LineEdit::Resync)?;

        Ok(vec![QuantEvent::QuantResynced(QuantResynced {
            tenant_id: cmd.tenant_id,
            quant_id: cmd.quant_id,
            level,
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

    fn test_quant_id() -> StockQuantId {
        StockQuantId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    /// Counted in units, shown in packs of 6.
    fn six_pack(ratio: f64) -> ProductUomSnapshot {
        let count = UomCategory::new("Count");
        let unit = UnitOfMeasure::reference("Unit", count.clone());
        let pack = UnitOfMeasure::bigger("Pack of 6", count, 6.0).unwrap();
        ProductUomSnapshot {
            product_id: ProductId::new(AggregateId::new()),
            secondary: SecondaryUom::enabled(&unit, pack, ratio).unwrap(),
            uom: unit,
        }
    }

    fn created_quant(tenant_id: TenantId, product: &ProductUomSnapshot) -> StockQuant {
        let quant_id = test_quant_id();
        let mut quant = StockQuant::empty(quant_id);
        let events = quant
            .handle(&QuantCommand::CreateQuant(CreateQuant {
                tenant_id,
                quant_id,
                product: product.clone(),
                location: "WH/Stock".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap();
        quant.apply(&events[0]);
        quant
    }

    fn update(quant: &mut StockQuant, tenant_id: TenantId, product: &ProductUomSnapshot, delta: f64) {
        let events = quant
            .handle(&QuantCommand::UpdateAvailableQuantity(UpdateAvailableQuantity {
                tenant_id,
                quant_id: quant.id_typed(),
                product: product.clone(),
                delta,
                occurred_at: test_time(),
            }))
            .unwrap();
        quant.apply(&events[0]);
    }

    #[test]
    fn create_quant_starts_empty() {
        let tenant_id = test_tenant_id();
        let product = six_pack(0.5);
        let quant = created_quant(tenant_id, &product);

        assert_eq!(quant.location(), "WH/Stock");
        assert_eq!(quant.product_id(), Some(product.product_id));
        assert_eq!(quant.quantity(), 0.0);
        assert_eq!(quant.secondary_quantity(), 0.0);
        assert_eq!(quant.secondary_unit().map(UnitOfMeasure::name), Some("Pack of 6"));
    }

    #[test]
    fn updates_follow_quantity() {
        let tenant_id = test_tenant_id();
        let product = six_pack(0.5);
        let mut quant = created_quant(tenant_id, &product);

        update(&mut quant, tenant_id, &product, 12.0);
        assert_eq!(quant.quantity(), 12.0);
        assert_eq!(quant.secondary_quantity(), 6.0);

        update(&mut quant, tenant_id, &product, -20.0);
        assert_eq!(quant.quantity(), -8.0);
        assert_eq!(quant.secondary_quantity(), -4.0);
    }

    #[test]
    fn resync_applies_new_ratio() {
        let tenant_id = test_tenant_id();
        let product = six_pack(0.5);
        let mut quant = created_quant(tenant_id, &product);
        update(&mut quant, tenant_id, &product, 12.0);

        let mut corrected = product.clone();
        corrected.secondary = six_pack(1.0 / 6.0).secondary;
        let events = quant
            .handle(&QuantCommand::ResyncProduct(ResyncProduct {
                tenant_id,
                quant_id: quant.id_typed(),
                product: corrected,
                occurred_at: test_time(),
            }))
            .unwrap();
        quant.apply(&events[0]);

        assert_eq!(quant.quantity(), 12.0);
        assert_eq!(quant.secondary_quantity(), 2.0);
    }

    #[test]
    fn zero_and_non_finite_deltas_are_rejected() {
        let tenant_id = test_tenant_id();
        let product = six_pack(0.5);
        let quant = created_quant(tenant_id, &product);

        for delta in [0.0, f64::NAN, f64::INFINITY] {
            let err = quant
                .handle(&QuantCommand::UpdateAvailableQuantity(UpdateAvailableQuantity {
                    tenant_id,
                    quant_id: quant.id_typed(),
                    product: product.clone(),
                    delta,
                    occurred_at: test_time(),
                }))
                .unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
    }

    #[test]
    fn update_with_wrong_product_is_rejected() {
        let tenant_id = test_tenant_id();
        let quant = created_quant(tenant_id, &six_pack(0.5));

        let err = quant
            .handle(&QuantCommand::UpdateAvailableQuantity(UpdateAvailableQuantity {
                tenant_id,
                quant_id: quant.id_typed(),
                product: six_pack(0.5),
                delta: 1.0,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::invariant("product_id mismatch"));
    }

    #[test]
    fn secondary_quantity_cannot_be_typed() {
        let product = six_pack(0.5);
        let mut level = QuantLevel::empty(&product).unwrap();

        let err = QuantLevel::SECONDARY_QUANTITY
            .apply(&mut level, &product, LineEdit::SetSecondary(3.0))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::validation("secondary_quantity is computed from quantity and cannot be edited")
        );
        assert_eq!(level.secondary_quantity(), 0.0);
    }

    #[test]
    fn cannot_create_twice_or_without_location() {
        let tenant_id = test_tenant_id();
        let product = six_pack(0.5);
        let quant = created_quant(tenant_id, &product);

        let err = quant
            .handle(&QuantCommand::CreateQuant(CreateQuant {
                tenant_id,
                quant_id: quant.id_typed(),
                product: product.clone(),
                location: "WH/Stock".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let fresh = StockQuant::empty(test_quant_id());
        let err = fresh
            .handle(&QuantCommand::CreateQuant(CreateQuant {
                tenant_id,
                quant_id: fresh.id_typed(),
                product,
                location: "  ".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 200,
                ..ProptestConfig::default()
            })]

            /// After any sequence of updates the secondary matches the stock.
            #[test]
            fn secondary_tracks_stock(deltas in proptest::collection::vec(-500.0f64..500.0, 1..20)) {
                let tenant_id = test_tenant_id();
                let product = six_pack(1.0 / 6.0);
                let mut quant = created_quant(tenant_id, &product);

                for delta in deltas.into_iter().filter(|d| *d != 0.0) {
                    update(&mut quant, tenant_id, &product, delta);
                }

                prop_assert!(product.secondary.is_consistent(quant.quantity(), quant.secondary_quantity()));
            }
        }
    }
}
