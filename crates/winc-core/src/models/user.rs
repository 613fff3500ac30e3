//! User accounts and address types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::Winc;

/// Blockchain address families a user account can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserAddressType {
    /// Arweave native address
    #[default]
    Arweave,
    /// Solana address
    Solana,
    /// Ethereum address
    Ethereum,
    /// Kyve address
    Kyve,
    /// Polygon address
    Matic,
}

impl UserAddressType {
    /// All known address types.
    pub const ALL: [UserAddressType; 5] = [
        UserAddressType::Arweave,
        UserAddressType::Solana,
        UserAddressType::Ethereum,
        UserAddressType::Kyve,
        UserAddressType::Matic,
    ];

    /// Stable string form used in storage and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserAddressType::Arweave => "arweave",
            UserAddressType::Solana => "solana",
            UserAddressType::Ethereum => "ethereum",
            UserAddressType::Kyve => "kyve",
            UserAddressType::Matic => "matic",
        }
    }
}

impl fmt::Display for UserAddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserAddressType {
    type Err = UnknownAddressType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserAddressType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownAddressType(s.to_string()))
    }
}

/// Error for an unrecognized address-type string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown address type: {0:?}")]
pub struct UnknownAddressType(pub String);

/// Where a top-up or gift is destined: a user address family, or an email
/// inbox for gifted credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationAddressType {
    /// Arweave native address
    Arweave,
    /// Solana address
    Solana,
    /// Ethereum address
    Ethereum,
    /// Kyve address
    Kyve,
    /// Polygon address
    Matic,
    /// Email destination; credits are held as a gift until redeemed
    Email,
}

impl DestinationAddressType {
    /// The user address type, unless this is an email gift destination.
    pub fn as_user_address_type(&self) -> Option<UserAddressType> {
        match self {
            DestinationAddressType::Arweave => Some(UserAddressType::Arweave),
            DestinationAddressType::Solana => Some(UserAddressType::Solana),
            DestinationAddressType::Ethereum => Some(UserAddressType::Ethereum),
            DestinationAddressType::Kyve => Some(UserAddressType::Kyve),
            DestinationAddressType::Matic => Some(UserAddressType::Matic),
            DestinationAddressType::Email => None,
        }
    }

    /// Whether this destination is an email gift.
    pub fn is_email(&self) -> bool {
        matches!(self, DestinationAddressType::Email)
    }

    /// Stable string form used in storage and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self.as_user_address_type() {
            Some(user_type) => user_type.as_str(),
            None => "email",
        }
    }
}

impl From<UserAddressType> for DestinationAddressType {
    fn from(value: UserAddressType) -> Self {
        match value {
            UserAddressType::Arweave => DestinationAddressType::Arweave,
            UserAddressType::Solana => DestinationAddressType::Solana,
            UserAddressType::Ethereum => DestinationAddressType::Ethereum,
            UserAddressType::Kyve => DestinationAddressType::Kyve,
            UserAddressType::Matic => DestinationAddressType::Matic,
        }
    }
}

impl fmt::Display for DestinationAddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DestinationAddressType {
    type Err = UnknownAddressType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "email" {
            return Ok(DestinationAddressType::Email);
        }
        s.parse::<UserAddressType>().map(Into::into)
    }
}

/// A ledger account.
///
/// Created on the first credit event (top-up, gift redemption, zero-cost
/// reservation) and never deleted. The balance is signed: chargebacks may
/// drive it negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The account address; primary key.
    pub address: String,
    /// Address family of `address`.
    pub address_type: UserAddressType,
    /// Current signed winc balance.
    pub winc_balance: Winc,
    /// Opaque promotional metadata; no schema is enforced here.
    pub promotional_info: serde_json::Value,
    /// Account creation instant.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_type_string_round_trip() {
        for t in UserAddressType::ALL {
            assert_eq!(t.as_str().parse::<UserAddressType>().unwrap(), t);
        }
        assert!("email".parse::<UserAddressType>().is_err());
        assert!("bitcoin".parse::<UserAddressType>().is_err());
    }

    #[test]
    fn test_destination_type_covers_email() {
        let email: DestinationAddressType = "email".parse().unwrap();
        assert!(email.is_email());
        assert_eq!(email.as_user_address_type(), None);

        let sol: DestinationAddressType = "solana".parse().unwrap();
        assert_eq!(sol.as_user_address_type(), Some(UserAddressType::Solana));
    }
}
