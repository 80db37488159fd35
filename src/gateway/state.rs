use std::sync::Arc;

use crate::engine::BalanceEngine;
use crate::ledger::LedgerStore;
use crate::report::{ReportArchive, ReportingEngine};

/// Shared gateway state
#[derive(Clone)]
pub struct AppState {
    pub engine: BalanceEngine,
    pub reporting: ReportingEngine,
    /// Base URL used to build report download links
    pub public_url: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        archive: Arc<dyn ReportArchive>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            engine: BalanceEngine::new(store.clone()),
            reporting: ReportingEngine::new(store, archive),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Download link for a generated report
    pub fn report_url(&self, id: impl std::fmt::Display) -> String {
        format!("{}/report/csv?id={}", self.public_url, id)
    }
}
