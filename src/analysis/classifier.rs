//! Primary/derived classification of datasets.
//!
//! A dataset is derived when its type carries a bracketed annotation such
//! as `RNAseq [Salmon]`. The check only looks for both bracket characters
//! anywhere in the string; it does not validate order or nesting, so
//! `"]foo["` is derived too.

use crate::error::RecordError;
use crate::models::{field_value, DatasetRecord, DatasetStatus, MalformedPolicy, RawRecord};
use tracing::{debug, warn};

const DATASET_TYPE_FIELD: &str = "dataset_type";

/// Classify a dataset type string.
pub fn classify_type(dataset_type: &str) -> DatasetStatus {
    if dataset_type.contains('[') && dataset_type.contains(']') {
        DatasetStatus::Derived
    } else {
        DatasetStatus::Primary
    }
}

/// Classify a raw record by its `dataset_type` field.
pub fn classify(record: &RawRecord) -> Result<DatasetStatus, RecordError> {
    classify_at(record, 0)
}

fn classify_at(record: &RawRecord, index: usize) -> Result<DatasetStatus, RecordError> {
    field_value(record, DATASET_TYPE_FIELD)
        .map(|dataset_type| classify_type(&dataset_type))
        .ok_or_else(|| RecordError::FieldMissing {
            field: DATASET_TYPE_FIELD.to_string(),
            index,
        })
}

/// Records after classification.
#[derive(Debug, Clone, Default)]
pub struct Classified {
    pub records: Vec<DatasetRecord>,
    /// Records dropped for lacking a dataset type.
    pub skipped: usize,
}

impl Classified {
    /// Primary records only, in input order.
    pub fn primary(&self) -> Vec<DatasetRecord> {
        self.records
            .iter()
            .filter(|record| record.is_primary())
            .cloned()
            .collect()
    }

    pub fn primary_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_primary()).count()
    }

    pub fn derived_count(&self) -> usize {
        self.records.len() - self.primary_count()
    }
}

/// Classify every record.
///
/// With [`MalformedPolicy::Skip`] records without a dataset type are left
/// out and counted; with [`MalformedPolicy::Fail`] the first one aborts.
pub fn classify_all(
    records: &[RawRecord],
    policy: MalformedPolicy,
) -> Result<Classified, RecordError> {
    let mut classified = Classified::default();

    for (index, record) in records.iter().enumerate() {
        match classify_at(record, index) {
            Ok(status) => classified
                .records
                .push(DatasetRecord::new(record.clone(), status)),
            Err(e) => match policy {
                MalformedPolicy::Fail => return Err(e),
                MalformedPolicy::Skip => {
                    warn!("Skipping record: {}", e);
                    classified.skipped += 1;
                }
            },
        }
    }

    debug!(
        "Classified {} records ({} primary, {} derived, {} skipped)",
        classified.records.len(),
        classified.primary_count(),
        classified.derived_count(),
        classified.skipped
    );

    Ok(classified)
}
