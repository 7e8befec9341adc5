//! Payment status machine and payment methods.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle of a single payment attempt.
///
/// ```text
/// Created    → Processing | Approved | Rejected
/// Processing → Approved | Rejected | Reversed
/// Approved   → Reversed
/// ```
///
/// Stored as lowercase text (`created`, `processing`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Created,
    Processing,
    Approved,
    Rejected,
    Reversed,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Processing => "processing",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Reversed => "reversed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Reversed)
    }

    /// A payment in one of these states blocks any new attempt for the same order.
    pub fn blocks_new_attempt(self) -> bool {
        matches!(self, Self::Approved | Self::Processing)
    }

    /// Whether `self → next` is a legal move. Same-state moves are not transitions.
    pub fn can_transition_to(self, next: Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Created, Processing | Approved | Rejected)
                | (Processing, Approved | Rejected | Reversed)
                | (Approved, Reversed)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payment status: {0}")]
pub struct UnknownPaymentStatus(pub String);

impl FromStr for PaymentStatus {
    type Err = UnknownPaymentStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "processing" => Ok(Self::Processing),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "reversed" => Ok(Self::Reversed),
            other => Err(UnknownPaymentStatus(other.to_owned())),
        }
    }
}

/// How a payment is collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Settled at the point of sale; inserted already approved.
    Cashier,
    /// Online checkout, settled asynchronously through gateway notifications.
    Gateway,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cashier => "cashier",
            Self::Gateway => "gateway",
        }
    }

    /// Name shown to customers on receipts.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Cashier => "Cashier",
            Self::Gateway => "Mercado Pago",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payment method: {0}")]
pub struct UnknownPaymentMethod(pub String);

impl FromStr for PaymentMethod {
    type Err = UnknownPaymentMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cashier" => Ok(Self::Cashier),
            "gateway" => Ok(Self::Gateway),
            other => Err(UnknownPaymentMethod(other.to_owned())),
        }
    }
}
