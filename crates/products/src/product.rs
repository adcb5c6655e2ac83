use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use uomsync_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId, ValueObject};
use uomsync_events::Event;

use crate::secondary::{ConfigurationError, SecondaryTracking, SecondaryUom, suggest_ratio};
use crate::uom::{UnitOfMeasure, UomCategory};

/// Product identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Read-only view of a product's units, handed to document lines.
///
/// Lines never look a product up themselves; whoever edits a line passes the
/// snapshot of the product that line references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUomSnapshot {
    pub product_id: ProductId,
    pub uom: UnitOfMeasure,
    pub secondary: SecondaryUom,
}

impl ValueObject for ProductUomSnapshot {}

impl ProductUomSnapshot {
    /// Snapshot of a product without secondary UoM, counted in plain units.
    pub fn plain(product_id: ProductId) -> Self {
        Self {
            product_id,
            uom: UnitOfMeasure::reference("Unit", UomCategory::new("Unit")),
            secondary: SecondaryUom::disabled(),
        }
    }
}

/// Aggregate root: Product.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    id: ProductId,
    tenant_id: Option<TenantId>,
    sku: String,
    name: String,
    uom: Option<UnitOfMeasure>,
    secondary: SecondaryUom,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            tenant_id: None,
            sku: String::new(),
            name: String::new(),
            uom: None,
            secondary: SecondaryUom::disabled(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uom(&self) -> Option<&UnitOfMeasure> {
        self.uom.as_ref()
    }

    pub fn secondary_uom(&self) -> &SecondaryUom {
        &self.secondary
    }

    pub fn convert_to_secondary(&self, qty: f64) -> f64 {
        self.secondary.convert_to_secondary(qty)
    }

    pub fn convert_to_primary(&self, qty: f64) -> f64 {
        self.secondary.convert_to_primary(qty)
    }

    pub fn round_secondary(&self, qty: f64) -> f64 {
        self.secondary.round_secondary(qty)
    }

    /// Snapshot for document lines; `NotFound` until the product is created.
    pub fn uom_snapshot(&self) -> Result<ProductUomSnapshot, DomainError> {
        match (&self.uom, self.created) {
            (Some(uom), true) => Ok(ProductUomSnapshot {
                product_id: self.id,
                uom: uom.clone(),
                secondary: self.secondary.clone(),
            }),
            _ => Err(DomainError::not_found()),
        }
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub uom: UnitOfMeasure,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfigureSecondaryUom.
///
/// Without an explicit `ratio` the ratio between the two units is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigureSecondaryUom {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub unit: Option<UnitOfMeasure>,
    pub ratio: Option<f64>,
    pub tracking: SecondaryTracking,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DisableSecondaryUom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisableSecondaryUom {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeUnitOfMeasure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeUnitOfMeasure {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub uom: UnitOfMeasure,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    ConfigureSecondaryUom(ConfigureSecondaryUom),
    DisableSecondaryUom(DisableSecondaryUom),
    ChangeUnitOfMeasure(ChangeUnitOfMeasure),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub uom: UnitOfMeasure,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SecondaryUomConfigured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryUomConfigured {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub secondary: SecondaryUom,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SecondaryUomDisabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryUomDisabled {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: UnitOfMeasureChanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitOfMeasureChanged {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub uom: UnitOfMeasure,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    SecondaryUomConfigured(SecondaryUomConfigured),
    SecondaryUomDisabled(SecondaryUomDisabled),
    UnitOfMeasureChanged(UnitOfMeasureChanged),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "products.product.created",
            ProductEvent::SecondaryUomConfigured(_) => "products.product.secondary_uom_configured",
            ProductEvent::SecondaryUomDisabled(_) => "products.product.secondary_uom_disabled",
            ProductEvent::UnitOfMeasureChanged(_) => "products.product.uom_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::SecondaryUomConfigured(e) => e.occurred_at,
            ProductEvent::SecondaryUomDisabled(e) => e.occurred_at,
            ProductEvent::UnitOfMeasureChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.tenant_id = Some(e.tenant_id);
                self.sku = e.sku.clone();
                self.name = e.name.clone();
                self.uom = Some(e.uom.clone());
                self.secondary = SecondaryUom::disabled();
                self.created = true;
            }
            ProductEvent::SecondaryUomConfigured(e) => {
                self.secondary = e.secondary.clone();
            }
            ProductEvent::SecondaryUomDisabled(_) => {
                self.secondary = self.secondary.to_disabled();
            }
            ProductEvent::UnitOfMeasureChanged(e) => {
                self.uom = Some(e.uom.clone());
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::ConfigureSecondaryUom(cmd) => self.handle_configure(cmd),
            ProductCommand::DisableSecondaryUom(cmd) => self.handle_disable(cmd),
            ProductCommand::ChangeUnitOfMeasure(cmd) => self.handle_change_uom(cmd),
        }
    }
}

impl Product {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    /// Primary unit of a created product.
    fn ensure_existing(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<&UnitOfMeasure, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(tenant_id)?;
        self.ensure_product_id(product_id)?;
        self.uom.as_ref().ok_or_else(DomainError::not_found)
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        if cmd.sku.trim().is_empty() {
            return Err(DomainError::validation("SKU cannot be empty"));
        }

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            sku: cmd.sku.clone(),
            name: cmd.name.clone(),
            uom: cmd.uom.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_configure(
        &self,
        cmd: &ConfigureSecondaryUom,
    ) -> Result<Vec<ProductEvent>, DomainError> {
        let primary = self.ensure_existing(cmd.tenant_id, cmd.product_id)?;

        let Some(unit) = cmd.unit.clone() else {
            warn!(product_id = %self.id, "secondary UoM enabled without a unit");
            return Err(ConfigurationError::MissingUnit.into());
        };
        let ratio = cmd.ratio.unwrap_or_else(|| suggest_ratio(primary, &unit));

        let secondary = SecondaryUom::enabled(primary, unit, ratio)
            .map_err(|err| {
                warn!(product_id = %self.id, error = %err, "secondary UoM configuration rejected");
                DomainError::from(err)
            })?
            .with_tracking(cmd.tracking);

        Ok(vec![ProductEvent::SecondaryUomConfigured(SecondaryUomConfigured {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            secondary,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_disable(&self, cmd: &DisableSecondaryUom) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.product_id)?;

        if !self.secondary.is_enabled() {
            return Err(DomainError::conflict("secondary UoM is already disabled"));
        }

        Ok(vec![ProductEvent::SecondaryUomDisabled(SecondaryUomDisabled {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_uom(&self, cmd: &ChangeUnitOfMeasure) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_existing(cmd.tenant_id, cmd.product_id)?;

        // The enabled secondary unit has to stay convertible from the new primary.
        self.secondary.validate(&cmd.uom).map_err(|err| {
            warn!(product_id = %self.id, error = %err, "primary UoM change rejected");
            DomainError::from(err)
        })?;

        Ok(vec![ProductEvent::UnitOfMeasureChanged(UnitOfMeasureChanged {
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            uom: cmd.uom.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
