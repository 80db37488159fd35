//! Report artifacts
//!
//! Generated monthly reports are rendered to CSV and kept under their
//! [`ReportId`] until someone downloads them. Rows are `service;revenue`
//! without a header line.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::core_types::ReportId;
use crate::models::ServiceRevenue;

pub const CSV_DELIMITER: u8 = b';';

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Report I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV encoding error: {0}")]
    Csv(#[from] csv::Error),
}

/// Storage for rendered report artifacts
#[async_trait]
pub trait ReportArchive: Send + Sync {
    async fn put(&self, id: ReportId, body: Vec<u8>) -> Result<(), ArchiveError>;

    /// `None` if no report was stored under `id`
    async fn get(&self, id: ReportId) -> Result<Option<Vec<u8>>, ArchiveError>;
}

/// Render revenue rows as CSV bytes
pub fn render_csv(rows: &[ServiceRevenue]) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(CSV_DELIMITER)
        .has_headers(false)
        .from_writer(Vec::new());

    for row in rows {
        writer.write_record([row.service_name.as_str(), &row.revenue.to_string()])?;
    }

    writer
        .into_inner()
        .map_err(|e| ArchiveError::Io(e.into_error()))
}

/// One `<id>.csv` file per report inside a directory
#[derive(Debug, Clone)]
pub struct CsvReportDir {
    dir: PathBuf,
}

impl CsvReportDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: ReportId) -> PathBuf {
        self.dir.join(format!("{}.csv", id))
    }
}

#[async_trait]
impl ReportArchive for CsvReportDir {
    async fn put(&self, id: ReportId, body: Vec<u8>) -> Result<(), ArchiveError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(id), body).await?;
        Ok(())
    }

    async fn get(&self, id: ReportId) -> Result<Option<Vec<u8>>, ArchiveError> {
        match tokio::fs::read(self.path_for(id)).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
