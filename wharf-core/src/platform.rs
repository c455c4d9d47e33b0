//! Contract for the remote dataset platform.

use crate::{
    BareDatasetRequest, CreatedDataset, DatasetInfo, ExportRecord, ImportSource, JobOutcome,
    TransportError,
};

/// Remote dataset platform operations required by managed sources.
///
/// Job-creating calls block until the job reaches a terminal state; any poll
/// interval or backoff belongs to the implementation. Authentication is bound
/// when the implementation is constructed.
pub trait PlatformApi: Send + Sync {
    /// Fetch the current view of a dataset revision.
    fn dataset_info(&self, dataset_id: &str) -> Result<DatasetInfo, TransportError>;

    /// Start an export job and wait for it to finish.
    fn create_export_job(&self, dataset_id: &str) -> Result<JobOutcome, TransportError>;

    /// List the exports produced for a revision, in any order.
    fn list_export_records(&self, dataset_id: &str) -> Result<Vec<ExportRecord>, TransportError>;

    /// Start an import job and wait for it to finish.
    fn create_import_job(
        &self,
        dataset_id: &str,
        annotated: bool,
        source: &ImportSource,
    ) -> Result<JobOutcome, TransportError>;

    /// Start a release job and wait for it to finish.
    fn create_release_job(&self, dataset_id: &str) -> Result<JobOutcome, TransportError>;

    /// Create an empty dataset.
    fn create_bare_dataset(
        &self,
        request: &BareDatasetRequest,
    ) -> Result<CreatedDataset, TransportError>;
}
