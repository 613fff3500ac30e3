//! Adjustment catalogs: the policies that modify prices.
//!
//! Three flavors share a common head (operator, magnitude, priority,
//! activity window): upload catalogs subsidize or surcharge upload costs,
//! payment catalogs adjust fiat top-ups, and single-use-code catalogs are
//! payment catalogs gated behind a promo code with usage limits. The
//! payment flavors live in one table and are discriminated at read time by
//! the presence of the code columns.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amount::{PaymentAmount, Winc};

/// How an adjustment transforms the running amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentOperator {
    /// Add the magnitude (negative magnitudes subtract).
    Add,
    /// Multiply by the magnitude (a subsidy uses a magnitude below one).
    Multiply,
}

impl AdjustmentOperator {
    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentOperator::Add => "add",
            AdjustmentOperator::Multiply => "multiply",
        }
    }
}

impl fmt::Display for AdjustmentOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdjustmentOperator {
    type Err = UnknownCatalogToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(AdjustmentOperator::Add),
            "multiply" => Ok(AdjustmentOperator::Multiply),
            other => Err(UnknownCatalogToken(other.to_string())),
        }
    }
}

/// Whether a payment adjustment changes what the provider charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentExclusivity {
    /// Does not change the fiat charge; alters the winc credited.
    #[default]
    Inclusive,
    /// Changes the fiat charge (promo discounts).
    Exclusive,
    /// Inclusive, but applied only to kyve destinations.
    InclusiveKyve,
}

impl AdjustmentExclusivity {
    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentExclusivity::Inclusive => "inclusive",
            AdjustmentExclusivity::Exclusive => "exclusive",
            AdjustmentExclusivity::InclusiveKyve => "inclusive_kyve",
        }
    }
}

impl fmt::Display for AdjustmentExclusivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdjustmentExclusivity {
    type Err = UnknownCatalogToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inclusive" => Ok(AdjustmentExclusivity::Inclusive),
            "exclusive" => Ok(AdjustmentExclusivity::Exclusive),
            "inclusive_kyve" => Ok(AdjustmentExclusivity::InclusiveKyve),
            other => Err(UnknownCatalogToken(other.to_string())),
        }
    }
}

/// Which users a single-use code targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetUserGroup {
    /// Any user.
    #[default]
    All,
    /// Only users with no prior payment receipts.
    New,
    /// Users with payment history.
    Existing,
}

impl TargetUserGroup {
    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetUserGroup::All => "all",
            TargetUserGroup::New => "new",
            TargetUserGroup::Existing => "existing",
        }
    }
}

impl fmt::Display for TargetUserGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetUserGroup {
    type Err = UnknownCatalogToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(TargetUserGroup::All),
            "new" => Ok(TargetUserGroup::New),
            "existing" => Ok(TargetUserGroup::Existing),
            other => Err(UnknownCatalogToken(other.to_string())),
        }
    }
}

/// Unit of a subsidy limitation interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LimitationIntervalUnit {
    /// Minutes
    Minute,
    /// Hours
    Hour,
    /// Days
    #[default]
    Day,
    /// Weeks
    Week,
    /// Months, approximated as 30 days for windowed sums
    Month,
}

impl LimitationIntervalUnit {
    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitationIntervalUnit::Minute => "minute",
            LimitationIntervalUnit::Hour => "hour",
            LimitationIntervalUnit::Day => "day",
            LimitationIntervalUnit::Week => "week",
            LimitationIntervalUnit::Month => "month",
        }
    }

    /// The duration of `count` of this unit.
    pub fn duration(&self, count: i64) -> Duration {
        match self {
            LimitationIntervalUnit::Minute => Duration::minutes(count),
            LimitationIntervalUnit::Hour => Duration::hours(count),
            LimitationIntervalUnit::Day => Duration::days(count),
            LimitationIntervalUnit::Week => Duration::weeks(count),
            LimitationIntervalUnit::Month => Duration::days(30 * count),
        }
    }
}

impl fmt::Display for LimitationIntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LimitationIntervalUnit {
    type Err = UnknownCatalogToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minute" => Ok(LimitationIntervalUnit::Minute),
            "hour" => Ok(LimitationIntervalUnit::Hour),
            "day" => Ok(LimitationIntervalUnit::Day),
            "week" => Ok(LimitationIntervalUnit::Week),
            "month" => Ok(LimitationIntervalUnit::Month),
            other => Err(UnknownCatalogToken(other.to_string())),
        }
    }
}

/// Error for an unrecognized catalog enum string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown catalog token: {0:?}")]
pub struct UnknownCatalogToken(pub String);

/// A cap on how much subsidy one user can draw from a catalog per interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WincLimitation {
    /// Maximum winc subsidized per user within the interval.
    pub limit: Winc,
    /// Interval length, in `interval_unit`s.
    pub interval: i64,
    /// Unit of `interval`.
    pub interval_unit: LimitationIntervalUnit,
}

impl WincLimitation {
    /// The interval as a concrete duration.
    pub fn window(&self) -> Duration {
        self.interval_unit.duration(self.interval)
    }
}

/// A policy adjusting upload costs (subsidies and surcharges).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadAdjustmentCatalog {
    /// Catalog identifier.
    pub catalog_id: String,
    /// Human-readable name.
    pub name: String,
    /// Operator description shown to users.
    pub description: String,
    /// How the adjustment is applied.
    pub operator: AdjustmentOperator,
    /// Operator magnitude; a subsidy is `multiply` below one.
    pub operator_magnitude: Decimal,
    /// Application order; lower priorities apply first.
    pub priority: i32,
    /// Start of the activity window (inclusive).
    pub start_at: DateTime<Utc>,
    /// End of the activity window (exclusive), if bounded.
    pub end_at: Option<DateTime<Utc>>,
    /// Uploads above this byte count are not subsidized, when set.
    pub byte_count_threshold: Option<u64>,
    /// Per-user subsidy budget per interval, when set.
    pub winc_limitation: Option<WincLimitation>,
}

/// A policy adjusting fiat top-ups (inclusive fees).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAdjustmentCatalog {
    /// Catalog identifier.
    pub catalog_id: String,
    /// Human-readable name.
    pub name: String,
    /// Operator description shown to users.
    pub description: String,
    /// How the adjustment is applied.
    pub operator: AdjustmentOperator,
    /// Operator magnitude.
    pub operator_magnitude: Decimal,
    /// Application order; lower priorities apply first.
    pub priority: i32,
    /// Start of the activity window (inclusive).
    pub start_at: DateTime<Utc>,
    /// End of the activity window (exclusive), if bounded.
    pub end_at: Option<DateTime<Utc>>,
    /// Whether the adjustment changes the fiat charge.
    pub exclusivity: AdjustmentExclusivity,
}

/// A payment catalog gated behind a promo code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleUseCodeCatalog {
    /// The payment-catalog head.
    #[serde(flatten)]
    pub catalog: PaymentAdjustmentCatalog,
    /// The code users present.
    pub code_value: String,
    /// Which users may redeem the code.
    pub target_user_group: TargetUserGroup,
    /// Global use cap across all receipts; zero means unlimited.
    pub max_uses: i64,
    /// Running amounts below this floor skip the code at application time.
    pub minimum_payment_amount: Option<PaymentAmount>,
    /// Cap on the absolute discount granted.
    pub maximum_discount_amount: Option<PaymentAmount>,
}

/// The payment-catalog sum type resolved at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaymentCatalogVariant {
    /// A code-gated catalog.
    SingleUseCode(SingleUseCodeCatalog),
    /// An always-on inclusive fee.
    Fee(PaymentAdjustmentCatalog),
}

/// Whether a `[start_at, end_at)` window contains `now`.
pub fn window_contains(
    start_at: DateTime<Utc>,
    end_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    now >= start_at && end_at.map(|end| now < end).unwrap_or(true)
}

impl UploadAdjustmentCatalog {
    /// Whether the catalog is active at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        window_contains(self.start_at, self.end_at, now)
    }
}

impl PaymentAdjustmentCatalog {
    /// Whether the catalog is active at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        window_contains(self.start_at, self.end_at, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_boundaries() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        assert!(window_contains(start, Some(end), start));
        assert!(!window_contains(start, Some(end), end));
        assert!(!window_contains(
            start,
            Some(end),
            start - Duration::seconds(1)
        ));
        assert!(window_contains(start, None, end + Duration::days(900)));
    }

    #[test]
    fn test_limitation_window() {
        let lim = WincLimitation {
            limit: Winc::from(1000u64),
            interval: 24,
            interval_unit: LimitationIntervalUnit::Hour,
        };
        assert_eq!(lim.window(), Duration::days(1));
    }

    #[test]
    fn test_catalog_token_round_trips() {
        for op in ["add", "multiply"] {
            assert_eq!(op.parse::<AdjustmentOperator>().unwrap().as_str(), op);
        }
        for excl in ["inclusive", "exclusive", "inclusive_kyve"] {
            assert_eq!(excl.parse::<AdjustmentExclusivity>().unwrap().as_str(), excl);
        }
        for group in ["all", "new", "existing"] {
            assert_eq!(group.parse::<TargetUserGroup>().unwrap().as_str(), group);
        }
    }
}
