// models.rs - Users, pending orders and accounting entries

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::core_types::{OrderId, ServiceId, UserId};
use crate::money::Amount;

/// Ledger label for funds entering a balance (enrollment or incoming transfer)
pub const LABEL_REPLENISHED: &str = "Replenished";
/// Ledger label for funds leaving a balance through a transfer
pub const LABEL_TRANSFERRED: &str = "Transferred";

// ============================================================
// USER
// ============================================================

/// User balance snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct User {
    #[schema(value_type = String, format = Uuid)]
    pub id: UserId,
    /// Current balance, never negative
    #[schema(value_type = String, example = "100.00")]
    pub balance: Amount,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

impl User {
    /// Fresh user funded with `balance`
    pub fn new(id: UserId, balance: Amount, now: DateTime<Utc>) -> Self {
        Self {
            id,
            balance,
            created_at: now,
            last_update: now,
        }
    }
}

// ============================================================
// ORDERS
// ============================================================

/// The five fields identifying an order on reserve and on confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub user_id: UserId,
    pub service_id: ServiceId,
    pub order_id: OrderId,
    pub service_name: String,
    pub amount: Amount,
}

/// Pending order: funds are reserved, the service outcome is not known yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub service_id: ServiceId,
    pub service_name: String,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn from_request(req: &OrderRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: req.order_id,
            user_id: req.user_id,
            service_id: req.service_id,
            service_name: req.service_name.clone(),
            amount: req.amount,
            created_at: now,
        }
    }

    /// Exact match over all five identifying fields
    pub fn matches(&self, req: &OrderRequest) -> bool {
        self.id == req.order_id
            && self.user_id == req.user_id
            && self.service_id == req.service_id
            && self.service_name == req.service_name
            && self.amount == req.amount
    }
}

// ============================================================
// ACCOUNTING LOG
// ============================================================

/// Classification of an accounting entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Replenished,
    Transferred,
    /// Revenue recognized for a successfully settled order
    Settlement {
        service_id: ServiceId,
        order_id: OrderId,
        service_name: String,
    },
}

impl EntryKind {
    /// Label stored in the `service_name` column
    pub fn label(&self) -> &str {
        match self {
            EntryKind::Replenished => LABEL_REPLENISHED,
            EntryKind::Transferred => LABEL_TRANSFERRED,
            EntryKind::Settlement { service_name, .. } => service_name,
        }
    }

    pub fn service_id(&self) -> Option<ServiceId> {
        match self {
            EntryKind::Settlement { service_id, .. } => Some(*service_id),
            _ => None,
        }
    }

    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            EntryKind::Settlement { order_id, .. } => Some(*order_id),
            _ => None,
        }
    }

    /// Rebuild from stored columns. Rows with a service id are settlements.
    pub fn from_columns(
        label: String,
        service_id: Option<ServiceId>,
        order_id: Option<OrderId>,
    ) -> Option<Self> {
        match (service_id, order_id) {
            (Some(service_id), Some(order_id)) => Some(EntryKind::Settlement {
                service_id,
                order_id,
                service_name: label,
            }),
            (None, None) => match label.as_str() {
                LABEL_REPLENISHED => Some(EntryKind::Replenished),
                LABEL_TRANSFERRED => Some(EntryKind::Transferred),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Accounting entry about to be appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub user_id: UserId,
    pub kind: EntryKind,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

impl NewLedgerEntry {
    pub fn replenished(user_id: UserId, amount: Amount, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            kind: EntryKind::Replenished,
            amount,
            created_at: now,
        }
    }

    pub fn transferred(user_id: UserId, amount: Amount, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            kind: EntryKind::Transferred,
            amount,
            created_at: now,
        }
    }

    pub fn settlement(order: &Order, now: DateTime<Utc>) -> Self {
        Self {
            user_id: order.user_id,
            kind: EntryKind::Settlement {
                service_id: order.service_id,
                order_id: order.id,
                service_name: order.service_name.clone(),
            },
            amount: order.amount,
            created_at: now,
        }
    }
}

/// Committed accounting entry, never updated or deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Insertion sequence number
    pub id: i64,
    pub user_id: UserId,
    pub kind: EntryKind,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

// ============================================================
// REPORT VIEWS
// ============================================================

/// One row of the monthly revenue report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ServiceRevenue {
    pub service_name: String,
    #[schema(value_type = String, example = "1250.00")]
    pub revenue: Amount,
}

/// One row of a user's transaction history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct HistoryEntry {
    #[schema(value_type = String, format = Uuid)]
    pub user_id: UserId,
    /// Service name for settlements, otherwise the movement label
    pub service_name: String,
    #[schema(value_type = String, example = "50.00")]
    pub amount: Amount,
    pub date: DateTime<Utc>,
}

impl From<LedgerEntry> for HistoryEntry {
    fn from(entry: LedgerEntry) -> Self {
        let service_name = entry.kind.label().to_string();
        Self {
            user_id: entry.user_id,
            service_name,
            amount: entry.amount,
            date: entry.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportQueryError {
    #[error("Invalid year: {0}")]
    InvalidYear(String),
    #[error("Invalid month: {0}")]
    InvalidMonth(String),
    #[error("limit must be positive and offset non-negative")]
    InvalidPage,
}

/// Calendar month selected for a revenue report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportMonth {
    first_day: NaiveDate,
}

impl ReportMonth {
    /// Parse a 4-digit year and a 1-2 digit month ("5" and "05" are equivalent)
    pub fn parse(year: &str, month: &str) -> Result<Self, ReportQueryError> {
        let year = year.trim();
        let month = month.trim();

        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ReportQueryError::InvalidYear(year.to_string()));
        }
        if month.is_empty() || month.len() > 2 || !month.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ReportQueryError::InvalidMonth(month.to_string()));
        }

        let y: i32 = year
            .parse()
            .map_err(|_| ReportQueryError::InvalidYear(year.to_string()))?;
        let m: u32 = month
            .parse()
            .map_err(|_| ReportQueryError::InvalidMonth(month.to_string()))?;

        let first_day = NaiveDate::from_ymd_opt(y, m, 1)
            .ok_or_else(|| ReportQueryError::InvalidMonth(month.to_string()))?;
        Ok(Self { first_day })
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    /// Inclusive lower bound (00:00 UTC on the 1st)
    pub fn start(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.first_day.and_time(chrono::NaiveTime::MIN))
    }

    /// Exclusive upper bound (00:00 UTC on the 1st of the next month)
    pub fn end(&self) -> DateTime<Utc> {
        let next = if self.first_day.month() == 12 {
            NaiveDate::from_ymd_opt(self.first_day.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.first_day.year(), self.first_day.month() + 1, 1)
        };
        // Years are 4 digits, so the following month always exists
        let next = next.unwrap_or(NaiveDate::MAX);
        Utc.from_utc_datetime(&next.and_time(chrono::NaiveTime::MIN))
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start() && ts < self.end()
    }
}

/// History pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub fn new(limit: i64, offset: i64) -> Result<Self, ReportQueryError> {
        if limit <= 0 || offset < 0 {
            return Err(ReportQueryError::InvalidPage);
        }
        let limit = u32::try_from(limit).map_err(|_| ReportQueryError::InvalidPage)?;
        let offset = u32::try_from(offset).map_err(|_| ReportQueryError::InvalidPage)?;
        Ok(Self { limit, offset })
    }
}
