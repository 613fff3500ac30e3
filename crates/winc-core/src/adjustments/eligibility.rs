//! Promo-code resolution and eligibility rules.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{SingleUseCodeCatalog, TargetUserGroup};

/// Why a promo code was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromoCodeError {
    /// No started catalog carries the requested code.
    #[error("promo code not found: {code:?}")]
    NotFound {
        /// The requested code.
        code: String,
    },

    /// The catalog's activity window has ended.
    #[error("promo code expired: {code:?}")]
    Expired {
        /// The requested code.
        code: String,
    },

    /// The code has reached its global use cap.
    #[error("promo code {code:?} has reached its maximum number of uses")]
    ExceedsMaxUses {
        /// The requested code.
        code: String,
    },

    /// The user's history disqualifies them from this code.
    #[error("user {user_address} is not eligible for promo code {code:?}")]
    Ineligible {
        /// The requesting account.
        user_address: String,
        /// The requested code.
        code: String,
    },
}

/// Usage facts the store gathers for one catalog/user pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromoCodeFacts {
    /// Applications of this catalog across all payment receipts.
    pub global_use_count: i64,
    /// Payment receipts held by the requesting user.
    pub user_payment_receipt_count: i64,
    /// Payment receipts of the requesting user linked to this catalog.
    pub user_catalog_use_count: i64,
}

/// Pick the catalog a code resolves to.
///
/// Among catalogs carrying the code, the most recently started wins;
/// catalog id breaks ties so the choice is stable.
pub fn select_catalog_for_code<'a>(
    catalogs: &'a [SingleUseCodeCatalog],
    code: &str,
) -> Option<&'a SingleUseCodeCatalog> {
    catalogs
        .iter()
        .filter(|c| c.code_value == code)
        .max_by(|a, b| {
            a.catalog
                .start_at
                .cmp(&b.catalog.start_at)
                .then_with(|| a.catalog.catalog_id.cmp(&b.catalog.catalog_id))
        })
}

/// Assert that `user_address` may redeem `catalog` given its usage facts.
pub fn assert_promo_code_eligible(
    catalog: &SingleUseCodeCatalog,
    user_address: &str,
    facts: &PromoCodeFacts,
    now: DateTime<Utc>,
) -> Result<(), PromoCodeError> {
    let code = &catalog.code_value;

    if let Some(end_at) = catalog.catalog.end_at {
        if now > end_at {
            return Err(PromoCodeError::Expired { code: code.clone() });
        }
    }

    // max_uses of zero means unlimited.
    if catalog.max_uses > 0 && facts.global_use_count >= catalog.max_uses {
        return Err(PromoCodeError::ExceedsMaxUses { code: code.clone() });
    }

    match catalog.target_user_group {
        TargetUserGroup::New => {
            if facts.user_payment_receipt_count > 0 {
                return Err(PromoCodeError::Ineligible {
                    user_address: user_address.to_string(),
                    code: code.clone(),
                });
            }
        }
        TargetUserGroup::All | TargetUserGroup::Existing => {
            // Single use per user: any prior receipt linked to this catalog
            // disqualifies.
            if facts.user_catalog_use_count > 0 {
                return Err(PromoCodeError::Ineligible {
                    user_address: user_address.to_string(),
                    code: code.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use crate::models::{
        AdjustmentExclusivity, AdjustmentOperator, PaymentAdjustmentCatalog,
    };

    fn catalog(id: &str, code: &str, start_year: i32) -> SingleUseCodeCatalog {
        SingleUseCodeCatalog {
            catalog: PaymentAdjustmentCatalog {
                catalog_id: id.to_string(),
                name: id.to_string(),
                description: String::new(),
                operator: AdjustmentOperator::Multiply,
                operator_magnitude: dec!(0.8),
                priority: 1,
                start_at: Utc.with_ymd_and_hms(start_year, 1, 1, 0, 0, 0).unwrap(),
                end_at: None,
                exclusivity: AdjustmentExclusivity::Exclusive,
            },
            code_value: code.to_string(),
            target_user_group: TargetUserGroup::All,
            max_uses: 0,
            minimum_payment_amount: None,
            maximum_discount_amount: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_select_prefers_most_recent_start() {
        let catalogs = vec![
            catalog("old", "SAVE20", 2023),
            catalog("new", "SAVE20", 2025),
            catalog("other", "SAVE50", 2024),
        ];

        let chosen = select_catalog_for_code(&catalogs, "SAVE20").unwrap();
        assert_eq!(chosen.catalog.catalog_id, "new");
        assert!(select_catalog_for_code(&catalogs, "MISSING").is_none());
    }

    #[test]
    fn test_expired_code_is_refused() {
        let mut c = catalog("c", "SAVE20", 2023);
        c.catalog.end_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

        let err =
            assert_promo_code_eligible(&c, "alice", &PromoCodeFacts::default(), now()).unwrap_err();
        assert!(matches!(err, PromoCodeError::Expired { .. }));
    }

    #[test]
    fn test_global_cap_is_enforced() {
        let mut c = catalog("c", "SAVE20", 2023);
        c.max_uses = 5;

        let facts = PromoCodeFacts {
            global_use_count: 5,
            ..Default::default()
        };
        let err = assert_promo_code_eligible(&c, "alice", &facts, now()).unwrap_err();
        assert!(matches!(err, PromoCodeError::ExceedsMaxUses { .. }));

        // Zero means unlimited.
        c.max_uses = 0;
        let many = PromoCodeFacts {
            global_use_count: 10_000,
            ..Default::default()
        };
        assert!(assert_promo_code_eligible(&c, "alice", &many, now()).is_ok());
    }

    #[test]
    fn test_new_user_code_requires_empty_history() {
        let mut c = catalog("c", "WELCOME", 2023);
        c.target_user_group = TargetUserGroup::New;

        assert!(
            assert_promo_code_eligible(&c, "alice", &PromoCodeFacts::default(), now()).is_ok()
        );

        let with_history = PromoCodeFacts {
            user_payment_receipt_count: 1,
            ..Default::default()
        };
        let err = assert_promo_code_eligible(&c, "alice", &with_history, now()).unwrap_err();
        assert!(matches!(err, PromoCodeError::Ineligible { .. }));
    }

    #[test]
    fn test_single_use_per_user() {
        let c = catalog("c", "SAVE20", 2023);

        let reused = PromoCodeFacts {
            user_catalog_use_count: 1,
            user_payment_receipt_count: 3,
            ..Default::default()
        };
        let err = assert_promo_code_eligible(&c, "alice", &reused, now()).unwrap_err();
        assert!(matches!(err, PromoCodeError::Ineligible { .. }));

        let fresh = PromoCodeFacts {
            user_payment_receipt_count: 3,
            ..Default::default()
        };
        assert!(assert_promo_code_eligible(&c, "alice", &fresh, now()).is_ok());
    }
}
