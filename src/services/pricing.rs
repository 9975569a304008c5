use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{offer, product};

/// Order totals. Either supplied by an earlier pricing step or derived from
/// the offer/product snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CheckoutTotals {
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub shipping: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    #[serde(default)]
    pub total: Decimal,
}

impl CheckoutTotals {
    /// `subtotal - discount + shipping + tax`
    pub fn derived_total(&self) -> Decimal {
        self.subtotal - self.discount + self.shipping + self.tax
    }
}

/// Resolve the totals for a checkout attempt.
///
/// Supplied totals with a non-zero total win as-is; supplied totals with a
/// missing/zero total get it derived from their own components. Otherwise
/// price falls back from the offer override to the product price, shipping
/// from the offer to the product. A missing offer or product yields zeros;
/// whether a zero charge is acceptable is the caller's call.
pub fn resolve_totals(
    offer: Option<&offer::Model>,
    product: Option<&product::Model>,
    supplied: Option<&CheckoutTotals>,
) -> CheckoutTotals {
    if let Some(supplied) = supplied {
        if !supplied.total.is_zero() {
            return supplied.clone();
        }
        let derived = supplied.derived_total();
        if !derived.is_zero() {
            let mut totals = supplied.clone();
            totals.total = derived;
            return totals;
        }
    }

    let subtotal = offer
        .and_then(|o| o.price_override)
        .or_else(|| product.map(|p| p.price))
        .unwrap_or_default();
    let shipping = offer
        .and_then(|o| o.ship_price)
        .or_else(|| product.map(|p| p.shipping_cost))
        .unwrap_or_default();

    let mut totals = CheckoutTotals {
        subtotal,
        discount: Decimal::ZERO,
        shipping,
        tax: Decimal::ZERO,
        total: Decimal::ZERO,
    };
    totals.total = totals.derived_total();
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn offer(price_override: Option<Decimal>, ship_price: Option<Decimal>) -> offer::Model {
        offer::Model {
            id: Uuid::new_v4(),
            campaign_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            gateway_id: None,
            name: "Starter Kit".to_string(),
            price_override,
            ship_price,
            qty_per_order: 1,
            active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn product(price: Decimal, shipping_cost: Decimal) -> product::Model {
        product::Model {
            id: Uuid::new_v4(),
            name: "Widget".to_string(),
            sku: "WID-1".to_string(),
            price,
            shipping_cost,
            active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn supplied_totals_with_nonzero_total_win() {
        let supplied = CheckoutTotals {
            subtotal: dec!(50.00),
            discount: dec!(10.00),
            shipping: dec!(4.99),
            tax: dec!(2.50),
            total: dec!(47.49),
        };
        let offer = offer(Some(dec!(99.99)), Some(dec!(9.99)));
        let product = product(dec!(19.99), dec!(2.99));

        let totals = resolve_totals(Some(&offer), Some(&product), Some(&supplied));
        assert_eq!(totals, supplied);
    }

    #[test]
    fn supplied_totals_with_zero_total_get_derived() {
        let supplied = CheckoutTotals {
            subtotal: dec!(20.00),
            discount: dec!(5.00),
            shipping: dec!(3.00),
            tax: dec!(1.00),
            total: Decimal::ZERO,
        };

        let totals = resolve_totals(None, None, Some(&supplied));
        assert_eq!(totals.total, dec!(19.00));
        assert_eq!(totals.subtotal, dec!(20.00));
    }

    #[test]
    fn offer_override_beats_product_price() {
        let offer = offer(Some(dec!(29.99)), Some(dec!(5.00)));
        let product = product(dec!(49.99), dec!(7.50));

        let totals = resolve_totals(Some(&offer), Some(&product), None);
        assert_eq!(totals.subtotal, dec!(29.99));
        assert_eq!(totals.shipping, dec!(5.00));
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.total, dec!(34.99));
    }

    #[test]
    fn product_fills_gaps_in_the_offer() {
        let offer = offer(None, None);
        let product = product(dec!(49.99), dec!(7.50));

        let totals = resolve_totals(Some(&offer), Some(&product), None);
        assert_eq!(totals.subtotal, dec!(49.99));
        assert_eq!(totals.shipping, dec!(7.50));
        assert_eq!(totals.total, dec!(57.49));
    }

    #[test]
    fn missing_offer_and_product_yield_zeros_not_errors() {
        let totals = resolve_totals(None, None, None);
        assert_eq!(totals, CheckoutTotals::default());
    }

    #[test]
    fn totals_invariant_holds_for_derived_totals() {
        let offer = offer(Some(dec!(29.99)), Some(dec!(5.00)));
        let totals = resolve_totals(Some(&offer), None, None);
        assert_eq!(
            totals.total,
            totals.subtotal - totals.discount + totals.shipping + totals.tax
        );
    }
}
