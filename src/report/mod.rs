//! Reporting Engine
//!
//! Read-only views over the accounting log: monthly revenue per service
//! (persisted as a downloadable CSV artifact) and per-user history.

pub mod archive;

pub use archive::{ArchiveError, CsvReportDir, ReportArchive, render_csv};

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::core_types::{ReportId, UserId};
use crate::error::{EngineError, EngineResult};
use crate::ledger::LedgerStore;
use crate::models::{HistoryEntry, Page, ReportMonth};

impl From<ArchiveError> for EngineError {
    fn from(e: ArchiveError) -> Self {
        EngineError::Internal(e.to_string())
    }
}

fn log_failure(err: &EngineError) {
    match err {
        EngineError::Internal(msg) => error!(error = %msg, "Report failed"),
        other => warn!(error = %other, "Report rejected"),
    }
}

#[derive(Clone)]
pub struct ReportingEngine {
    store: Arc<dyn LedgerStore>,
    archive: Arc<dyn ReportArchive>,
}

impl ReportingEngine {
    pub fn new(store: Arc<dyn LedgerStore>, archive: Arc<dyn ReportArchive>) -> Self {
        Self { store, archive }
    }

    /// Aggregate settlement revenue for one calendar month and archive it.
    ///
    /// Returns the handle under which the CSV can be fetched.
    #[instrument(skip(self))]
    pub async fn monthly_report(&self, year: &str, month: &str) -> EngineResult<ReportId> {
        self.build_monthly_report(year, month)
            .await
            .inspect_err(log_failure)
    }

    async fn build_monthly_report(&self, year: &str, month: &str) -> EngineResult<ReportId> {
        let month = ReportMonth::parse(year, month)?;
        let rows = self.store.monthly_revenue(month).await?;

        let id = ReportId::new_random();
        self.archive.put(id, render_csv(&rows)?).await?;

        info!(report_id = %id, services = rows.len(), "Monthly report generated");
        Ok(id)
    }

    /// Stored CSV body of a generated report
    #[instrument(skip(self), fields(report_id = %id))]
    pub async fn fetch_report(&self, id: ReportId) -> EngineResult<Vec<u8>> {
        let body = match self.archive.get(id).await {
            Ok(found) => found.ok_or_else(|| EngineError::NotFound(format!("report {}", id))),
            Err(e) => Err(e.into()),
        };
        body.inspect_err(log_failure)
    }

    /// Ledger entries of one user, largest amounts first
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn history(
        &self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> EngineResult<Vec<HistoryEntry>> {
        self.load_history(user_id, limit, offset)
            .await
            .inspect_err(log_failure)
    }

    async fn load_history(
        &self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> EngineResult<Vec<HistoryEntry>> {
        let page = Page::new(limit, offset)?;

        if self.store.get_user(user_id).await?.is_none() {
            return Err(EngineError::user_not_found(user_id));
        }

        let entries = self.store.user_history(user_id, page).await?;
        Ok(entries.into_iter().map(HistoryEntry::from).collect())
    }
}
