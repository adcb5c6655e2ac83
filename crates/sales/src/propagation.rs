//! Values a sale line hands to the documents generated from it.
//!
//! The secondary quantity is copied once, at creation of the downstream
//! record, and only for products with secondary UoM enabled. There is no live
//! link afterwards: editing the sale line does not touch the invoice or move.

use serde::{Deserialize, Serialize};

use uomsync_core::{DomainError, DomainResult};
use uomsync_products::{ProductId, ProductUomSnapshot};

use crate::order::{SaleOrderLine, SalesOrder, SalesOrderId};

/// Seed for an invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLineValues {
    pub sales_order_id: SalesOrderId,
    pub sale_line_no: u32,
    pub product_id: ProductId,
    pub quantity: f64,
    /// Sale line's `secondary_quantity`, when the product tracks one.
    pub secondary_quantity: Option<f64>,
}

/// Seed for a procurement (stock move) request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcurementValues {
    pub sales_order_id: SalesOrderId,
    pub sale_line_no: u32,
    pub product_id: ProductId,
    pub product_uom_qty: f64,
    /// Sale line's `secondary_quantity`, when the product tracks one.
    pub secondary_qty: Option<f64>,
}

fn ensure_product(line: &SaleOrderLine, product: &ProductUomSnapshot) -> DomainResult<()> {
    if line.product_id() != product.product_id {
        return Err(DomainError::invariant("product_id mismatch"));
    }
    Ok(())
}

fn copied_secondary(line: &SaleOrderLine, product: &ProductUomSnapshot) -> Option<f64> {
    product
        .secondary
        .is_enabled()
        .then(|| line.secondary_quantity())
}

impl SaleOrderLine {
    pub fn prepare_invoice_line(
        &self,
        order_id: SalesOrderId,
        product: &ProductUomSnapshot,
    ) -> DomainResult<InvoiceLineValues> {
        ensure_product(self, product)?;
        Ok(InvoiceLineValues {
            sales_order_id: order_id,
            sale_line_no: self.line_no(),
            product_id: self.product_id(),
            quantity: self.product_uom_qty(),
            secondary_quantity: copied_secondary(self, product),
        })
    }

    pub fn prepare_procurement_values(
        &self,
        order_id: SalesOrderId,
        product: &ProductUomSnapshot,
    ) -> DomainResult<ProcurementValues> {
        ensure_product(self, product)?;
        Ok(ProcurementValues {
            sales_order_id: order_id,
            sale_line_no: self.line_no(),
            product_id: self.product_id(),
            product_uom_qty: self.product_uom_qty(),
            secondary_qty: copied_secondary(self, product),
        })
    }
}

fn snapshot_for<'a>(
    products: &'a [ProductUomSnapshot],
    product_id: ProductId,
) -> DomainResult<&'a ProductUomSnapshot> {
    products
        .iter()
        .find(|p| p.product_id == product_id)
        .ok_or_else(DomainError::not_found)
}

impl SalesOrder {
    /// Invoice line seeds for every line of a confirmed order.
    ///
    /// `products` must contain a snapshot for each product on the order.
    pub fn prepare_invoice_lines(
        &self,
        products: &[ProductUomSnapshot],
    ) -> DomainResult<Vec<InvoiceLineValues>> {
        if !self.is_invoice_allowed() {
            return Err(DomainError::invariant(
                "cannot invoice order that is not confirmed",
            ));
        }
        self.lines()
            .iter()
            .map(|line| line.prepare_invoice_line(self.id_typed(), snapshot_for(products, line.product_id())?))
            .collect()
    }

    /// Procurement seeds for every line of a confirmed (or invoiced) order.
    pub fn prepare_procurements(
        &self,
        products: &[ProductUomSnapshot],
    ) -> DomainResult<Vec<ProcurementValues>> {
        if self.is_modifiable() {
            return Err(DomainError::invariant(
                "cannot procure goods for an unconfirmed order",
            ));
        }
        self.lines()
            .iter()
            .map(|line| {
                line.prepare_procurement_values(self.id_typed(), snapshot_for(products, line.product_id())?)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::test_support::*;
    use uomsync_products::LineEdit;

    #[test]
    fn invoice_seed_copies_typed_secondary_quantity() {
        let tenant_id = test_tenant_id();
        let product = eggs();
        let mut order = created_order(tenant_id);
        add_line(&mut order, tenant_id, &product, 24.0);
        edit_line(&mut order, tenant_id, 1, &product, LineEdit::SetSecondary(2.5));
        confirm(&mut order, tenant_id);

        let seeds = order.prepare_invoice_lines(&[product.clone()]).unwrap();

        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].sale_line_no, 1);
        assert_eq!(seeds[0].product_id, product.product_id);
        assert_eq!(seeds[0].secondary_quantity, Some(2.5));
        assert!((seeds[0].quantity - 30.0).abs() < 1e-3);
    }

    #[test]
    fn plain_products_copy_nothing() {
        let tenant_id = test_tenant_id();
        let product = plain();
        let mut order = created_order(tenant_id);
        add_line(&mut order, tenant_id, &product, 5.0);
        confirm(&mut order, tenant_id);

        let invoice = order.prepare_invoice_lines(&[product.clone()]).unwrap();
        let procurement = order.prepare_procurements(&[product]).unwrap();

        assert_eq!(invoice[0].secondary_quantity, None);
        assert_eq!(procurement[0].secondary_qty, None);
        assert_eq!(procurement[0].product_uom_qty, 5.0);
    }

    #[test]
    fn draft_orders_cannot_be_invoiced_or_procured() {
        let tenant_id = test_tenant_id();
        let product = eggs();
        let mut order = created_order(tenant_id);
        add_line(&mut order, tenant_id, &product, 12.0);

        assert!(matches!(
            order.prepare_invoice_lines(&[product.clone()]).unwrap_err(),
            DomainError::InvariantViolation(_)
        ));
        assert!(matches!(
            order.prepare_procurements(&[product]).unwrap_err(),
            DomainError::InvariantViolation(_)
        ));
    }

    #[test]
    fn missing_snapshot_is_not_found() {
        let tenant_id = test_tenant_id();
        let mut order = created_order(tenant_id);
        add_line(&mut order, tenant_id, &eggs(), 12.0);
        confirm(&mut order, tenant_id);

        assert_eq!(
            order.prepare_procurements(&[eggs()]).unwrap_err(),
            DomainError::NotFound
        );
    }

    #[test]
    fn line_seed_checks_product() {
        let tenant_id = test_tenant_id();
        let product = eggs();
        let mut order = created_order(tenant_id);
        add_line(&mut order, tenant_id, &product, 12.0);

        let line = order.line(1).unwrap();
        let values = line.prepare_procurement_values(order.id_typed(), &product).unwrap();
        assert_eq!(values.secondary_qty, Some(1.0));

        let err = line.prepare_invoice_line(order.id_typed(), &plain()).unwrap_err();
        assert_eq!(err, DomainError::invariant("product_id mismatch"));
    }
}
