use crate::error::EngineError;
use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned to a request by the oracle collaborator.
///
/// The engine never interprets the token; it is only compared and hashed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The principal that paid for a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Requester(String);

impl Requester {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Requester {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A non-negative fee amount.
///
/// Wraps `rust_decimal::Decimal` so that negative amounts can never enter
/// the ledger or the treasury.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Fee(Decimal);

impl Fee {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, EngineError> {
        if value >= Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(EngineError::ValidationError(
                "Fee must not be negative".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Sum of two fees, or `FeeOverflow` when it exceeds `Decimal::MAX`.
    pub fn checked_add(self, rhs: Self) -> Result<Self, EngineError> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(EngineError::FeeOverflow {
                balance: self.0,
                fee: rhs.0,
            })
    }
}

impl TryFrom<Decimal> for Fee {
    type Error = EngineError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Fee> for Decimal {
    fn from(fee: Fee) -> Self {
        fee.0
    }
}

impl fmt::Display for Fee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}


/// Which derivation turns the oracle's raw value into a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    /// Random word reduced into a rarity tier.
    Rarity,
    /// Price reading compared against the threshold rule.
    Threshold,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Rarity => f.write_str("rarity"),
            RequestKind::Threshold => f.write_str("threshold"),
        }
    }
}

impl std::str::FromStr for RequestKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rarity" => Ok(RequestKind::Rarity),
            "threshold" => Ok(RequestKind::Threshold),
            other => Err(EngineError::ValidationError(format!(
                "unknown request kind '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    Pending,
    Fulfilled,
    Expired,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestState::Pending => f.write_str("pending"),
            RequestState::Fulfilled => f.write_str("fulfilled"),
            RequestState::Expired => f.write_str("expired"),
        }
    }
}

/// The categorical result delivered for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub request_id: RequestId,
    pub category: String,
    /// The oracle's raw value, kept for audit.
    pub raw_value: U256,
}

/// A single row of the request ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: RequestId,
    pub requester: Requester,
    pub fee_paid: Fee,
    pub kind: RequestKind,
    pub state: RequestState,
    pub created_at: DateTime<Utc>,
    /// Set once the row reaches `Fulfilled`.
    pub outcome: Option<Outcome>,
}

impl Request {
    pub fn new(id: RequestId, requester: Requester, fee_paid: Fee, kind: RequestKind) -> Self {
        Self {
            id,
            requester,
            fee_paid,
            kind,
            state: RequestState::Pending,
            created_at: Utc::now(),
            outcome: None,
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        self.state == RequestState::Fulfilled
    }
}
