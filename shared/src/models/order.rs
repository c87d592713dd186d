//! Order model
//!
//! Orders live in two physical record sets (registered-student orders and
//! guest orders) sharing one logical shape. The kind tag is embedded in the
//! composite [`OrderId`], so both kinds are addressed uniformly.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, ErrorCode};

/// Order status
///
/// Numeric values are what the database stores and what the admin API
/// receives as the update value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
#[repr(i16)]
pub enum OrderStatus {
    /// Initial state: stock is debited, payment pending
    PendingPayment = 1,
    /// Terminal success
    Completed = 2,
    /// Terminal failure group
    CancelledByUser = 3,
    CancelledByAdmin = 4,
    Rejected = 5,
    Removed = 6,
}

/// Whether inventory is currently debited or credited for a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockPhase {
    /// Stock was debited when the order entered this status
    Held,
    /// Stock was credited back when the order entered this status
    Released,
}

impl OrderStatus {
    /// Inventory phase for this status
    pub fn stock_phase(&self) -> StockPhase {
        match self {
            Self::PendingPayment | Self::Completed => StockPhase::Held,
            Self::CancelledByUser | Self::CancelledByAdmin | Self::Rejected | Self::Removed => {
                StockPhase::Released
            }
        }
    }

    /// Human-readable label (receipts, admin UI)
    pub fn label(&self) -> &'static str {
        match self {
            Self::PendingPayment => "Pending payment",
            Self::Completed => "Completed",
            Self::CancelledByUser => "Cancelled by user",
            Self::CancelledByAdmin => "Cancelled by admin",
            Self::Rejected => "Rejected",
            Self::Removed => "Removed",
        }
    }

    pub fn as_i16(&self) -> i16 {
        *self as i16
    }
}

impl From<OrderStatus> for i16 {
    fn from(status: OrderStatus) -> Self {
        status.as_i16()
    }
}

impl TryFrom<i16> for OrderStatus {
    type Error = AppError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::PendingPayment),
            2 => Ok(Self::Completed),
            3 => Ok(Self::CancelledByUser),
            4 => Ok(Self::CancelledByAdmin),
            5 => Ok(Self::Rejected),
            6 => Ok(Self::Removed),
            other => Err(AppError::with_message(
                ErrorCode::InvalidStatusKey,
                format!("Unknown order status: {other}"),
            )),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Payment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
#[repr(i16)]
pub enum PaymentMode {
    /// Pay in person with cash
    WalkIn = 1,
    /// Pre-paid via e-wallet, requires an uploaded proof of payment
    EWallet = 2,
}

impl PaymentMode {
    /// Whether this mode requires a proof-of-payment upload at creation
    pub fn requires_proof(&self) -> bool {
        matches!(self, Self::EWallet)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::WalkIn => "Cash",
            Self::EWallet => "E-Wallet",
        }
    }

    pub fn as_i16(&self) -> i16 {
        *self as i16
    }
}

impl From<PaymentMode> for i16 {
    fn from(mode: PaymentMode) -> Self {
        mode.as_i16()
    }
}

impl TryFrom<i16> for PaymentMode {
    type Error = AppError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::WalkIn),
            2 => Ok(Self::EWallet),
            other => Err(AppError::validation(format!(
                "Unknown payment mode: {other}"
            ))),
        }
    }
}

/// Physical record set an order belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    /// Buyer is a registered student with a stored account
    Registered,
    /// Walk-in / external buyer, identity stored inline on the order row
    Guest,
}

impl OrderKind {
    /// Single-letter tag used in the composite identifier
    pub fn tag(&self) -> char {
        match self {
            Self::Registered => 'S',
            Self::Guest => 'G',
        }
    }
}

/// Composite order identifier: kind tag + row id, rendered as `S-42` / `G-7`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderId {
    pub kind: OrderKind,
    pub id: i64,
}

impl OrderId {
    pub fn registered(id: i64) -> Self {
        Self {
            kind: OrderKind::Registered,
            id,
        }
    }

    pub fn guest(id: i64) -> Self {
        Self {
            kind: OrderKind::Guest,
            id,
        }
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.tag(), self.id)
    }
}

impl FromStr for OrderId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::invalid_request(format!("Invalid order id: {s}"));
        let (tag, id) = s.split_once('-').ok_or_else(invalid)?;
        let kind = match tag {
            "S" => OrderKind::Registered,
            "G" => OrderKind::Guest,
            _ => return Err(invalid()),
        };
        let id: i64 = id.parse().map_err(|_| invalid())?;
        if id <= 0 {
            return Err(invalid());
        }
        Ok(Self { kind, id })
    }
}

impl Serialize for OrderId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OrderId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Inline identity for a buyer without a stored account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestIdentity {
    /// School-issued identifier (not a foreign key)
    pub student_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub course: i32,
    pub year_level: i32,
}

/// Buyer reference: a registered student or an inline guest identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Buyer {
    Registered { student_id: String },
    Guest(GuestIdentity),
}

impl Buyer {
    pub fn kind(&self) -> OrderKind {
        match self {
            Self::Registered { .. } => OrderKind::Registered,
            Self::Guest(_) => OrderKind::Guest,
        }
    }
}

/// Fully resolved order view (listing, lookups, receipts)
///
/// Joins buyer identity and product/variation fields onto the order row so
/// notification dispatch and the admin UI never query twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    pub id: OrderId,
    pub reference: String,
    /// Opaque public identifier for unauthenticated lookup
    pub public_id: String,
    pub buyer: Buyer,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub product_id: i64,
    pub product_name: String,
    pub product_price: Decimal,
    pub variation_id: Option<i64>,
    pub variation_name: Option<String>,
    pub quantity: i32,
    pub payment_mode: PaymentMode,
    pub status: OrderStatus,
    pub user_remarks: String,
    pub admin_remarks: String,
    pub status_updated: Option<DateTime<Utc>>,
    pub edit_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OrderView {
    /// Buyer's display name
    pub fn buyer_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Order total (unit price x quantity)
    pub fn total(&self) -> Decimal {
        self.product_price * Decimal::from(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_phase() {
        assert_eq!(OrderStatus::PendingPayment.stock_phase(), StockPhase::Held);
        assert_eq!(OrderStatus::Completed.stock_phase(), StockPhase::Held);
        for status in [
            OrderStatus::CancelledByUser,
            OrderStatus::CancelledByAdmin,
            OrderStatus::Rejected,
            OrderStatus::Removed,
        ] {
            assert_eq!(status.stock_phase(), StockPhase::Released);
        }
    }

    #[test]
    fn test_status_roundtrip() {
        for raw in 1..=6i16 {
            let status = OrderStatus::try_from(raw).unwrap();
            assert_eq!(status.as_i16(), raw);
        }
        assert!(OrderStatus::try_from(0).is_err());
        assert!(OrderStatus::try_from(7).is_err());
    }

    #[test]
    fn test_payment_mode_proof() {
        assert!(!PaymentMode::WalkIn.requires_proof());
        assert!(PaymentMode::EWallet.requires_proof());
    }

    #[test]
    fn test_order_id_display_parse() {
        let id = OrderId::registered(42);
        assert_eq!(id.to_string(), "S-42");
        assert_eq!("S-42".parse::<OrderId>().unwrap(), id);

        let id = OrderId::guest(7);
        assert_eq!(id.to_string(), "G-7");
        assert_eq!("G-7".parse::<OrderId>().unwrap(), id);
    }

    #[test]
    fn test_order_id_parse_rejects_garbage() {
        assert!("B-42".parse::<OrderId>().is_err());
        assert!("S42".parse::<OrderId>().is_err());
        assert!("S-".parse::<OrderId>().is_err());
        assert!("S--1".parse::<OrderId>().is_err());
        assert!("S-0".parse::<OrderId>().is_err());
        assert!("".parse::<OrderId>().is_err());
    }

    #[test]
    fn test_order_id_serde() {
        let id = OrderId::guest(13);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"G-13\"");
        let parsed: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_buyer_kind() {
        let registered = Buyer::Registered {
            student_id: "2021-00123".into(),
        };
        assert_eq!(registered.kind(), OrderKind::Registered);

        let guest = Buyer::Guest(GuestIdentity {
            student_number: "X-001".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            course: 2,
            year_level: 3,
        });
        assert_eq!(guest.kind(), OrderKind::Guest);
    }
}
