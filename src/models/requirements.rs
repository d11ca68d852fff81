//! Aggregated permit requirements assembled from one crawl session.

use serde::{Deserialize, Serialize};

/// Structured permit data accumulated across every page of a crawl.
///
/// List-valued fields marked as deduplicated contain no repeated exact
/// values; form category lists elsewhere deliberately do not share this
/// guarantee.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermitRequirements {
    pub general_instructions: Vec<String>,
    pub step_by_step: Vec<String>,
    /// Deduplicated.
    pub required_documents: Vec<String>,
    pub fees: Vec<FeeStructure>,
    pub timelines: Vec<Timeline>,
    pub contacts: Vec<Contact>,
    /// Form submission endpoints found on-site. Deduplicated.
    pub online_form_endpoints: Vec<String>,
    /// Application PDFs. Deduplicated.
    pub downloadable_form_urls: Vec<String>,
}

/// One fee line parsed from a fee schedule table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeStructure {
    pub permit_type: String,
    /// Flat dollar amount, when the fee cell carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_fee: Option<f64>,
    /// Per-unit fee (per kW, per square foot, ...), when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable_fee: Option<VariableFee>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicable_to: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableFee {
    pub unit: String,
    pub amount: f64,
    pub description: String,
}

/// A processing-time statement pulled from page text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// "electrical" when found near electrical/solar vocabulary,
    /// otherwise "general".
    pub permit_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_days: Option<u32>,
    /// The matched phrase, verbatim.
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<String>>,
}

/// A contact harvested from phone/email patterns in page text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<String>,
}
