//! Adjustment composition.
//!
//! Operators compose left-to-right in catalog-priority order. Exclusive
//! adjustments move the fiat charge; inclusive adjustments move the winc
//! credited; upload adjustments move the winc reserved. All multiplication
//! truncates the magnitude toward zero so composition never credits more
//! than the inputs justify.

use rust_decimal::Decimal;

use crate::amount::{PaymentAmount, Winc};
use crate::models::{
    AdjustmentExclusivity, AdjustmentOperator, DestinationAddressType, PaymentAdjustmentCatalog,
    SingleUseCodeCatalog, UploadAdjustmentCatalog, UserAddressType,
};

/// One applied step of a payment-side composition.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedPaymentAdjustment {
    /// The catalog that produced this step.
    pub catalog_id: String,
    /// Catalog name, denormalized for receipts and logs.
    pub catalog_name: String,
    /// Operator applied.
    pub operator: AdjustmentOperator,
    /// Operator magnitude applied.
    pub operator_magnitude: Decimal,
    /// Signed change to the fiat charge; non-zero only for exclusives.
    pub payment_delta: PaymentAmount,
    /// Signed change to the winc credited; non-zero only for inclusives.
    pub winc_delta: Winc,
}

/// The result of composing a payment quote.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentAdjustmentPlan {
    /// The gross amount before exclusive adjustments.
    pub quoted_payment_amount: PaymentAmount,
    /// The amount the provider will charge.
    pub payment_amount: PaymentAmount,
    /// The winc credited to the user on success.
    pub winc_amount: Winc,
    /// Applied steps; vector order is the persisted `index` order.
    pub adjustments: Vec<AppliedPaymentAdjustment>,
}

/// Compose a payment quote from its gross fiat amount and gross winc.
///
/// `promo_catalogs` must already have passed eligibility; they are applied
/// in catalog-priority order regardless of request order. The
/// `minimum_payment_amount` floor still gates application here: a code
/// whose floor exceeds the running amount is skipped without a row.
pub fn compose_payment_adjustments(
    quoted_payment_amount: &PaymentAmount,
    gross_winc: &Winc,
    promo_catalogs: &[SingleUseCodeCatalog],
    inclusive_catalogs: &[PaymentAdjustmentCatalog],
    dest_address_type: DestinationAddressType,
) -> PaymentAdjustmentPlan {
    let mut adjustments = Vec::new();

    // Exclusive pass: move the fiat charge.
    let mut promos: Vec<&SingleUseCodeCatalog> = promo_catalogs.iter().collect();
    promos.sort_by_key(|c| c.catalog.priority);

    let mut payment_amount = quoted_payment_amount.clone();
    for promo in promos {
        if let Some(minimum) = &promo.minimum_payment_amount {
            if payment_amount < *minimum {
                continue;
            }
        }

        let mut delta = match promo.catalog.operator {
            AdjustmentOperator::Multiply => {
                payment_amount.times(promo.catalog.operator_magnitude - Decimal::ONE)
            }
            AdjustmentOperator::Add => {
                PaymentAmount::from_decimal_trunc(promo.catalog.operator_magnitude)
            }
        };
        if let Some(maximum_discount) = &promo.maximum_discount_amount {
            if delta.is_negative() && delta.negated() > *maximum_discount {
                delta = maximum_discount.negated();
            }
        }

        payment_amount = payment_amount.plus(&delta);
        adjustments.push(AppliedPaymentAdjustment {
            catalog_id: promo.catalog.catalog_id.clone(),
            catalog_name: promo.catalog.name.clone(),
            operator: promo.catalog.operator,
            operator_magnitude: promo.catalog.operator_magnitude,
            payment_delta: delta,
            winc_delta: Winc::zero(),
        });
    }

    // Inclusive pass: move the winc credited, never the charge.
    let mut fees: Vec<&PaymentAdjustmentCatalog> = inclusive_catalogs
        .iter()
        .filter(|c| applies_to_destination(c.exclusivity, dest_address_type))
        .collect();
    fees.sort_by_key(|c| c.priority);

    let mut winc_amount = gross_winc.clone();
    for fee in fees {
        let delta = match fee.operator {
            AdjustmentOperator::Multiply => {
                winc_amount.times(fee.operator_magnitude - Decimal::ONE)
            }
            AdjustmentOperator::Add => Winc::from_decimal_trunc(fee.operator_magnitude),
        };
        if delta.is_zero() {
            continue;
        }

        winc_amount = winc_amount.plus(&delta);
        adjustments.push(AppliedPaymentAdjustment {
            catalog_id: fee.catalog_id.clone(),
            catalog_name: fee.name.clone(),
            operator: fee.operator,
            operator_magnitude: fee.operator_magnitude,
            payment_delta: PaymentAmount::zero(),
            winc_delta: delta,
        });
    }

    PaymentAdjustmentPlan {
        quoted_payment_amount: quoted_payment_amount.clone(),
        payment_amount,
        winc_amount,
        adjustments,
    }
}

/// Whether an inclusive catalog applies to the given destination.
fn applies_to_destination(
    exclusivity: AdjustmentExclusivity,
    dest_address_type: DestinationAddressType,
) -> bool {
    match exclusivity {
        AdjustmentExclusivity::Inclusive => true,
        AdjustmentExclusivity::InclusiveKyve => {
            dest_address_type.as_user_address_type() == Some(UserAddressType::Kyve)
        }
        // Exclusive catalogs never belong in the inclusive pass.
        AdjustmentExclusivity::Exclusive => false,
    }
}

/// One upload catalog plus the user's consumption facts for it.
#[derive(Debug, Clone)]
pub struct UploadSubsidyContext<'a> {
    /// The catalog under consideration.
    pub catalog: &'a UploadAdjustmentCatalog,
    /// Winc this user has already drawn from the catalog within its
    /// limitation window. Ignored when the catalog has no limitation.
    pub winc_used_in_interval: Winc,
}

/// One applied step of an upload composition.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedUploadAdjustment {
    /// The catalog that produced this step.
    pub catalog_id: String,
    /// Catalog name, denormalized for receipts and logs.
    pub catalog_name: String,
    /// Operator applied.
    pub operator: AdjustmentOperator,
    /// Operator magnitude applied.
    pub operator_magnitude: Decimal,
    /// Winc removed from the network cost by this step. Positive for a
    /// subsidy; a surcharge records a negative removal.
    pub winc_delta: Winc,
}

/// The result of composing an upload reservation.
///
/// Invariant: the sum of adjustment deltas plus `reserved_winc` equals
/// `network_winc`.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadAdjustmentPlan {
    /// Network cost before adjustments.
    pub network_winc: Winc,
    /// Winc actually deducted from the user's balance.
    pub reserved_winc: Winc,
    /// Applied steps; vector order is the persisted `index` order.
    pub adjustments: Vec<AppliedUploadAdjustment>,
}

/// Compose an upload reservation from the network cost.
///
/// Catalogs apply in priority order. A catalog is skipped when the upload
/// exceeds its byte-count threshold or the user has exhausted its
/// per-interval winc budget; a subsidy larger than the remaining budget is
/// clamped to it. The reserved amount never drops below zero.
pub fn compose_upload_adjustments(
    network_winc: &Winc,
    byte_count: u64,
    subsidies: &[UploadSubsidyContext<'_>],
) -> UploadAdjustmentPlan {
    let mut ordered: Vec<&UploadSubsidyContext<'_>> = subsidies.iter().collect();
    ordered.sort_by_key(|ctx| ctx.catalog.priority);

    let mut reserved_winc = network_winc.clone();
    let mut adjustments = Vec::new();

    for ctx in ordered {
        let catalog = ctx.catalog;
        if let Some(threshold) = catalog.byte_count_threshold {
            if byte_count > threshold {
                continue;
            }
        }

        let mut next = match catalog.operator {
            AdjustmentOperator::Multiply => reserved_winc.times(catalog.operator_magnitude),
            AdjustmentOperator::Add => {
                reserved_winc.plus(&Winc::from_decimal_trunc(catalog.operator_magnitude))
            }
        };
        if next.is_negative() {
            next = Winc::zero();
        }

        let mut subsidized = reserved_winc.minus(&next);
        if let Some(limitation) = &catalog.winc_limitation {
            if subsidized.is_positive() {
                let remaining = limitation.limit.minus(&ctx.winc_used_in_interval);
                if !remaining.is_positive() {
                    continue;
                }
                if subsidized > remaining {
                    subsidized = remaining;
                    next = reserved_winc.minus(&subsidized);
                }
            }
        }
        if subsidized.is_zero() {
            continue;
        }

        reserved_winc = next;
        adjustments.push(AppliedUploadAdjustment {
            catalog_id: catalog.catalog_id.clone(),
            catalog_name: catalog.name.clone(),
            operator: catalog.operator,
            operator_magnitude: catalog.operator_magnitude,
            winc_delta: subsidized,
        });
    }

    UploadAdjustmentPlan {
        network_winc: network_winc.clone(),
        reserved_winc,
        adjustments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use crate::models::{LimitationIntervalUnit, TargetUserGroup, WincLimitation};

    fn payment_catalog(
        id: &str,
        operator: AdjustmentOperator,
        magnitude: Decimal,
        priority: i32,
        exclusivity: AdjustmentExclusivity,
    ) -> PaymentAdjustmentCatalog {
        PaymentAdjustmentCatalog {
            catalog_id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            operator,
            operator_magnitude: magnitude,
            priority,
            start_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end_at: None,
            exclusivity,
        }
    }

    fn promo(id: &str, magnitude: Decimal, priority: i32) -> SingleUseCodeCatalog {
        SingleUseCodeCatalog {
            catalog: payment_catalog(
                id,
                AdjustmentOperator::Multiply,
                magnitude,
                priority,
                AdjustmentExclusivity::Exclusive,
            ),
            code_value: id.to_uppercase(),
            target_user_group: TargetUserGroup::All,
            max_uses: 0,
            minimum_payment_amount: None,
            maximum_discount_amount: None,
        }
    }

    fn upload_catalog(
        id: &str,
        magnitude: Decimal,
        priority: i32,
    ) -> UploadAdjustmentCatalog {
        UploadAdjustmentCatalog {
            catalog_id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            operator: AdjustmentOperator::Multiply,
            operator_magnitude: magnitude,
            priority,
            start_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end_at: None,
            byte_count_threshold: None,
            winc_limitation: None,
        }
    }

    #[test]
    fn test_twenty_percent_promo_on_ten_units() {
        let plan = compose_payment_adjustments(
            &PaymentAmount::from(10u64),
            &Winc::from(1000u64),
            &[promo("c", dec!(0.8), 1)],
            &[],
            DestinationAddressType::Arweave,
        );

        assert_eq!(plan.payment_amount, PaymentAmount::from(8u64));
        assert_eq!(plan.winc_amount, Winc::from(1000u64));
        assert_eq!(plan.adjustments.len(), 1);
        assert_eq!(
            plan.adjustments[0].payment_delta,
            PaymentAmount::from(-2i64)
        );
        assert!(plan.adjustments[0].winc_delta.is_zero());
    }

    #[test]
    fn test_maximum_discount_clamps_delta() {
        let mut code = promo("c", dec!(0.5), 1);
        code.maximum_discount_amount = Some(PaymentAmount::from(100u64));

        let plan = compose_payment_adjustments(
            &PaymentAmount::from(1000u64),
            &Winc::from(1u64),
            &[code],
            &[],
            DestinationAddressType::Arweave,
        );

        // Uncapped the discount would be 500.
        assert_eq!(
            plan.adjustments[0].payment_delta,
            PaymentAmount::from(-100i64)
        );
        assert_eq!(plan.payment_amount, PaymentAmount::from(900u64));
    }

    #[test]
    fn test_minimum_payment_amount_skips_code() {
        let mut code = promo("c", dec!(0.8), 1);
        code.minimum_payment_amount = Some(PaymentAmount::from(500u64));

        let plan = compose_payment_adjustments(
            &PaymentAmount::from(100u64),
            &Winc::from(1u64),
            &[code],
            &[],
            DestinationAddressType::Arweave,
        );

        assert!(plan.adjustments.is_empty());
        assert_eq!(plan.payment_amount, PaymentAmount::from(100u64));
    }

    #[test]
    fn test_inclusive_fee_reduces_winc_not_charge() {
        let fee = payment_catalog(
            "infra-fee",
            AdjustmentOperator::Multiply,
            dec!(0.766),
            10,
            AdjustmentExclusivity::Inclusive,
        );

        let plan = compose_payment_adjustments(
            &PaymentAmount::from(10000u64),
            &Winc::from(1000u64),
            &[],
            &[fee],
            DestinationAddressType::Arweave,
        );

        assert_eq!(plan.payment_amount, PaymentAmount::from(10000u64));
        assert_eq!(plan.winc_amount, Winc::from(766u64));
        assert_eq!(plan.adjustments[0].winc_delta, Winc::from(-234i64));
        assert!(plan.adjustments[0].payment_delta.is_zero());
    }

    #[test]
    fn test_kyve_fee_gated_by_destination() {
        let fee = payment_catalog(
            "kyve-fee",
            AdjustmentOperator::Multiply,
            dec!(0.5),
            10,
            AdjustmentExclusivity::InclusiveKyve,
        );

        let for_arweave = compose_payment_adjustments(
            &PaymentAmount::from(100u64),
            &Winc::from(100u64),
            &[],
            &[fee.clone()],
            DestinationAddressType::Arweave,
        );
        assert_eq!(for_arweave.winc_amount, Winc::from(100u64));

        let for_kyve = compose_payment_adjustments(
            &PaymentAmount::from(100u64),
            &Winc::from(100u64),
            &[],
            &[fee],
            DestinationAddressType::Kyve,
        );
        assert_eq!(for_kyve.winc_amount, Winc::from(50u64));
    }

    #[test]
    fn test_promos_apply_in_priority_order() {
        // Priority 1 takes 50% off first, then priority 2 subtracts a flat 5.
        let mut flat = promo("flat", dec!(-5), 2);
        flat.catalog.operator = AdjustmentOperator::Add;
        flat.catalog.operator_magnitude = dec!(-5);

        let plan = compose_payment_adjustments(
            &PaymentAmount::from(100u64),
            &Winc::from(1u64),
            &[flat, promo("half", dec!(0.5), 1)],
            &[],
            DestinationAddressType::Arweave,
        );

        assert_eq!(plan.adjustments[0].catalog_id, "half");
        assert_eq!(plan.adjustments[1].catalog_id, "flat");
        assert_eq!(plan.payment_amount, PaymentAmount::from(45u64));
    }

    #[test]
    fn test_upload_subsidy_records_removed_winc() {
        let catalog = upload_catalog("fwd", dec!(0.8), 1);
        let plan = compose_upload_adjustments(
            &Winc::from(100u64),
            1024,
            &[UploadSubsidyContext {
                catalog: &catalog,
                winc_used_in_interval: Winc::zero(),
            }],
        );

        assert_eq!(plan.reserved_winc, Winc::from(80u64));
        assert_eq!(plan.adjustments[0].winc_delta, Winc::from(20u64));
        // Deltas plus reserved telescope back to the network cost.
        assert_eq!(
            plan.adjustments[0].winc_delta.plus(&plan.reserved_winc),
            plan.network_winc
        );
    }

    #[test]
    fn test_upload_byte_threshold_skips_catalog() {
        let mut catalog = upload_catalog("small-files", dec!(0), 1);
        catalog.byte_count_threshold = Some(1024);

        let plan = compose_upload_adjustments(
            &Winc::from(100u64),
            2048,
            &[UploadSubsidyContext {
                catalog: &catalog,
                winc_used_in_interval: Winc::zero(),
            }],
        );

        assert!(plan.adjustments.is_empty());
        assert_eq!(plan.reserved_winc, Winc::from(100u64));
    }

    #[test]
    fn test_upload_limitation_clamps_subsidy() {
        let mut catalog = upload_catalog("fwd", dec!(0), 1);
        catalog.winc_limitation = Some(WincLimitation {
            limit: Winc::from(100u64),
            interval: 1,
            interval_unit: LimitationIntervalUnit::Day,
        });

        // Full subsidy would remove 500; only 30 of the budget remains.
        let plan = compose_upload_adjustments(
            &Winc::from(500u64),
            64,
            &[UploadSubsidyContext {
                catalog: &catalog,
                winc_used_in_interval: Winc::from(70u64),
            }],
        );

        assert_eq!(plan.adjustments[0].winc_delta, Winc::from(30u64));
        assert_eq!(plan.reserved_winc, Winc::from(470u64));
    }

    #[test]
    fn test_upload_limitation_exhausted_skips_catalog() {
        let mut catalog = upload_catalog("fwd", dec!(0.5), 1);
        catalog.winc_limitation = Some(WincLimitation {
            limit: Winc::from(100u64),
            interval: 1,
            interval_unit: LimitationIntervalUnit::Day,
        });

        let plan = compose_upload_adjustments(
            &Winc::from(500u64),
            64,
            &[UploadSubsidyContext {
                catalog: &catalog,
                winc_used_in_interval: Winc::from(100u64),
            }],
        );

        assert!(plan.adjustments.is_empty());
        assert_eq!(plan.reserved_winc, Winc::from(500u64));
    }

    proptest! {
        #[test]
        fn prop_upload_deltas_plus_reserved_equal_network(
            network in 0u64..1_000_000_000,
            magnitudes in proptest::collection::vec(0u32..200, 0..5),
        ) {
            let catalogs: Vec<UploadAdjustmentCatalog> = magnitudes
                .iter()
                .enumerate()
                .map(|(i, m)| {
                    upload_catalog(
                        &format!("c{i}"),
                        Decimal::new(i64::from(*m), 2),
                        i as i32,
                    )
                })
                .collect();
            let contexts: Vec<UploadSubsidyContext<'_>> = catalogs
                .iter()
                .map(|catalog| UploadSubsidyContext {
                    catalog,
                    winc_used_in_interval: Winc::zero(),
                })
                .collect();

            let plan = compose_upload_adjustments(&Winc::from(network), 64, &contexts);

            let mut total = plan.reserved_winc.clone();
            for adjustment in &plan.adjustments {
                total = total.plus(&adjustment.winc_delta);
            }
            prop_assert_eq!(total, plan.network_winc);
        }
    }
}
