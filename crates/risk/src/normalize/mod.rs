//! Record normalization
//!
//! Maps one raw provider hit onto a [`PatentRecord`]. This is the only
//! place in the engine that looks at untyped JSON. Recognized shapes:
//! - flat snake_case (`id`, `title`, `grant_date`, ...)
//! - camelCase (`patentNumber`, `grantDate`, ...)
//! - PatentsView (`patent_number`, `patent_title`, nested `assignees`, `cpcs`)
//! - USPTO envelopes (`applicationMetaData.*`)

mod extract;

use fto_common::models::PatentRecord;
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

use extract::{code_list, first_date, first_text, name_list};

/// Title used when the provider gives none
pub const MISSING_TITLE: &str = "No title";

const ID_PATHS: &[&str] = &[
    "id",
    "patent_number",
    "patentNumber",
    "publication_number",
    "publicationNumber",
    "applicationMetaData.patentNumber",
    "applicationNumberText",
    "applicationNumber",
];
const TITLE_PATHS: &[&str] = &[
    "title",
    "patent_title",
    "inventionTitle",
    "applicationMetaData.inventionTitle",
];
const ABSTRACT_PATHS: &[&str] = &["abstract", "patent_abstract", "abstractText"];
const GRANT_DATE_PATHS: &[&str] = &[
    "grant_date",
    "grantDate",
    "patent_date",
    "applicationMetaData.grantDate",
];
const FILING_DATE_PATHS: &[&str] = &[
    "filing_date",
    "filingDate",
    "app_date",
    "applicationMetaData.filingDate",
];
const JURISDICTION_PATHS: &[&str] = &["jurisdiction", "country", "patent_country"];
const APPLICANT_PATHS: &[&str] = &[
    "applicants",
    "assignees",
    "assignee_organization",
    "assignee",
    "applicationMetaData.applicantBag",
];
const INVENTOR_PATHS: &[&str] = &[
    "inventors",
    "inventor_last_name",
    "applicationMetaData.inventorBag",
];
const CLASSIFICATION_PATHS: &[&str] = &[
    "classifications",
    "cpc_codes",
    "cpcs",
    "cpc",
    "applicationMetaData.cpcClassificationBag",
];

/// Why a raw record was dropped
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("record has no usable identifier")]
    MissingIdentifier,

    #[error("duplicate identifier {0} in result set")]
    DuplicateIdentifier(String),
}

/// Records that survived normalization plus the count of dropped ones
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub records: Vec<PatentRecord>,
    pub skipped: usize,
}

/// Record normalizer
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    classification_cap: usize,
}

impl RecordNormalizer {
    /// `classification_cap` bounds how many codes the scorer will ever see.
    pub fn new(classification_cap: usize) -> Self {
        Self { classification_cap }
    }

    /// Normalize one raw record. Only a missing identifier is fatal; every
    /// other field falls back to its default.
    pub fn normalize(&self, raw: &Value, jurisdiction: &str) -> Result<PatentRecord, NormalizeError> {
        if !raw.is_object() {
            return Err(NormalizeError::NotAnObject);
        }

        let id = first_text(raw, ID_PATHS).ok_or(NormalizeError::MissingIdentifier)?;

        Ok(PatentRecord {
            id,
            title: first_text(raw, TITLE_PATHS).unwrap_or_else(|| MISSING_TITLE.to_string()),
            abstract_text: first_text(raw, ABSTRACT_PATHS),
            grant_date: first_date(raw, GRANT_DATE_PATHS),
            filing_date: first_date(raw, FILING_DATE_PATHS),
            jurisdiction: first_text(raw, JURISDICTION_PATHS)
                .map(|j| j.to_uppercase())
                .unwrap_or_else(|| jurisdiction.to_string()),
            applicants: name_list(raw, APPLICANT_PATHS),
            inventors: name_list(raw, INVENTOR_PATHS),
            classifications: code_list(raw, CLASSIFICATION_PATHS, self.classification_cap),
        })
    }

    /// Normalize a provider page. Unusable and duplicate records are skipped
    /// and counted; the batch itself never fails.
    pub fn normalize_batch(&self, raws: &[Value], jurisdiction: &str) -> NormalizedBatch {
        let mut seen = HashSet::with_capacity(raws.len());
        let mut batch = NormalizedBatch {
            records: Vec::with_capacity(raws.len()),
            skipped: 0,
        };

        for (index, raw) in raws.iter().enumerate() {
            let outcome = self.normalize(raw, jurisdiction).and_then(|record| {
                if seen.insert(record.id.clone()) {
                    Ok(record)
                } else {
                    Err(NormalizeError::DuplicateIdentifier(record.id))
                }
            });

            match outcome {
                Ok(record) => batch.records.push(record),
                Err(reason) => {
                    debug!(index, reason = %reason, "Skipping unparsable provider record");
                    batch.skipped += 1;
                }
            }
        }

        batch
    }
}
