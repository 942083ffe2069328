//! Canonical patent record

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Provider-independent view of one search hit.
///
/// Built once by the record normalizer and never modified afterwards;
/// scoring wraps it in a [`super::ScoredPatent`] instead of writing back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentRecord {
    /// Publication or patent number, unique within one result set
    pub id: String,

    pub title: String,

    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,

    #[serde(default)]
    pub grant_date: Option<NaiveDate>,

    #[serde(default)]
    pub filing_date: Option<NaiveDate>,

    pub jurisdiction: String,

    #[serde(default)]
    pub applicants: Vec<String>,

    #[serde(default)]
    pub inventors: Vec<String>,

    /// CPC-style codes, already capped by the normalizer
    #[serde(default)]
    pub classifications: Vec<String>,
}

impl PatentRecord {
    /// Minimal record with only an id and a title; the rest defaults.
    pub fn new(id: impl Into<String>, title: impl Into<String>, jurisdiction: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            abstract_text: None,
            grant_date: None,
            filing_date: None,
            jurisdiction: jurisdiction.into(),
            applicants: Vec::new(),
            inventors: Vec::new(),
            classifications: Vec::new(),
        }
    }
}
