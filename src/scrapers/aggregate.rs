//! Within-crawl aggregation: every PageRecord from one session folded
//! into a single [`PermitRequirements`].

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::models::{
    Contact, FeeStructure, PageRecord, PermitRequirements, TableRecord, Timeline, VariableFee,
};

/// Vocabulary that tags a nearby timeline as electrical/solar-specific.
const ELECTRICAL_CONTEXT_KEYWORDS: &[&str] = &[
    "electrical",
    "solar",
    "photovoltaic",
    "pv",
    "renewable",
    "interconnection",
    "net metering",
    "wiring",
];

static CURRENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+(?:,\d{3})*(?:\.\d{2})?)").unwrap());

static VARIABLE_FEE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\$(\d+(?:\.\d{2})?)\s*(?:per|/)\s*(\w+)").unwrap());

static RANGE_DAYS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:to|-)\s*(\d+)\s*(?:business\s+)?days?").unwrap());

static RANGE_WEEKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:to|-)\s*(\d+)\s*weeks?").unwrap());

static WITHIN_DAYS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)within\s+(\d+)\s*(?:business\s+)?days?").unwrap());

static TURNAROUND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*day\s*(?:review|processing|turnaround)").unwrap());

static CONTACT_PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:phone|call|contact):?\s*(\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4})").unwrap()
});

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap());

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z][a-z]+\s+[A-Z][a-z]+").unwrap());

/// Fold every page of a crawl session into one requirements record.
///
/// Deduplication of the list-valued outputs happens once at the end and
/// preserves first-seen order.
pub fn aggregate_requirements(pages: &[PageRecord]) -> PermitRequirements {
    let mut req = PermitRequirements::default();

    for page in pages {
        let base = Url::parse(&page.url).ok();

        for list in &page.lists {
            if is_instruction_list(list) {
                if looks_numbered(list) {
                    req.step_by_step.extend(list.iter().cloned());
                } else {
                    req.general_instructions.extend(list.iter().cloned());
                }
            } else if is_document_list(list) {
                req.required_documents.extend(list.iter().cloned());
            }
        }

        for table in &page.tables {
            req.fees.extend(fees_from_table(table));
        }

        req.timelines.extend(timelines_from_text(&page.main_text));
        req.contacts.extend(contacts_from_text(&page.main_text));

        for form in &page.forms {
            if form.action.is_empty() {
                continue;
            }
            let endpoint = resolve(&base, &form.action);
            req.online_form_endpoints.push(endpoint);
        }

        for pdf in &page.pdf_links {
            req.downloadable_form_urls.push(resolve(&base, pdf));
        }
    }

    dedup_exact(&mut req.general_instructions);
    dedup_exact(&mut req.step_by_step);
    dedup_exact(&mut req.required_documents);
    dedup_exact(&mut req.online_form_endpoints);
    dedup_exact(&mut req.downloadable_form_urls);

    req
}

fn resolve(base: &Option<Url>, href: &str) -> String {
    base.as_ref()
        .and_then(|b| b.join(href).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| href.to_string())
}

/// A list is instructional when its joined text carries process
/// vocabulary.
fn is_instruction_list(list: &[String]) -> bool {
    let text = list.join(" ").to_lowercase();
    text.contains("step")
        || text.contains("how to")
        || text.contains("process")
        || text.contains("apply")
}

/// A list names required documents when its joined text says so.
fn is_document_list(list: &[String]) -> bool {
    let text = list.join(" ").to_lowercase();
    text.contains("document")
        || text.contains("required")
        || text.contains("submit")
        || text.contains("provide")
}

/// Numbered or step-prefixed items go to step_by_step; looser
/// instructional lists to general_instructions.
fn looks_numbered(list: &[String]) -> bool {
    list.iter().any(|item| {
        let lower = item.to_lowercase();
        lower.starts_with("step") || item.chars().next().is_some_and(|c| c.is_ascii_digit())
    })
}

/// Parse fee rows out of a table whose header announces fees.
///
/// The header gate matters: municipal sites are full of tables (hours,
/// meeting schedules) whose rows would otherwise parse as junk fees.
pub fn fees_from_table(table: &TableRecord) -> Vec<FeeStructure> {
    let header_text = table.headers.join(" ").to_lowercase();
    if !header_text.contains("fee") && !header_text.contains("cost") && !header_text.contains("price")
    {
        return Vec::new();
    }

    let mut fees = Vec::new();

    for row in &table.rows {
        let permit_type = row.first().cloned().unwrap_or_default();
        let fee_text = row.get(1).cloned().unwrap_or_default();
        if permit_type.is_empty() {
            continue;
        }

        let base_fee = CURRENCY_RE
            .captures(&fee_text)
            .and_then(|caps| caps[1].replace(',', "").parse::<f64>().ok());

        let variable_fee = VARIABLE_FEE_RE.captures(&fee_text).and_then(|caps| {
            let amount = caps[1].parse::<f64>().ok()?;
            Some(VariableFee {
                amount,
                unit: caps[2].to_string(),
                description: fee_text.clone(),
            })
        });

        if base_fee.is_some() || variable_fee.is_some() {
            fees.push(FeeStructure {
                permit_type,
                base_fee,
                variable_fee,
                description: fee_text,
                applicable_to: None,
            });
        }
    }

    fees
}

/// Processing-time statements from free text, tagged electrical when
/// electrical/solar vocabulary sits within 100 characters.
pub fn timelines_from_text(text: &str) -> Vec<Timeline> {
    let mut timelines = Vec::new();

    for caps in RANGE_DAYS_RE.captures_iter(text) {
        timelines.push(make_timeline(
            text,
            caps.get(0).unwrap().start(),
            &caps[0],
            caps[1].parse().ok(),
            caps[2].parse().ok(),
            None,
        ));
    }

    for caps in RANGE_WEEKS_RE.captures_iter(text) {
        let min_weeks: Option<u32> = caps[1].parse().ok();
        let max_weeks: Option<u32> = caps[2].parse().ok();
        timelines.push(make_timeline(
            text,
            caps.get(0).unwrap().start(),
            &caps[0],
            min_weeks.map(|w| w * 7),
            max_weeks.map(|w| w * 7),
            None,
        ));
    }

    for caps in WITHIN_DAYS_RE.captures_iter(text) {
        timelines.push(make_timeline(
            text,
            caps.get(0).unwrap().start(),
            &caps[0],
            None,
            caps[1].parse().ok(),
            None,
        ));
    }

    for caps in TURNAROUND_RE.captures_iter(text) {
        timelines.push(make_timeline(
            text,
            caps.get(0).unwrap().start(),
            &caps[0],
            None,
            None,
            caps[1].parse().ok(),
        ));
    }

    timelines
}

fn make_timeline(
    text: &str,
    match_start: usize,
    matched: &str,
    min_days: Option<u32>,
    max_days: Option<u32>,
    average_days: Option<u32>,
) -> Timeline {
    let permit_type = if has_electrical_context(text, match_start, matched.len()) {
        "electrical"
    } else {
        "general"
    };

    Timeline {
        permit_type: permit_type.to_string(),
        min_days,
        max_days,
        average_days,
        description: matched.to_string(),
        conditions: None,
    }
}

/// Look 100 characters either side of the match for electrical/solar
/// vocabulary.
fn has_electrical_context(text: &str, start: usize, len: usize) -> bool {
    let window_start = floor_char_boundary(text, start.saturating_sub(100));
    let window_end = ceil_char_boundary(text, (start + len + 100).min(text.len()));
    let window = text[window_start..window_end].to_lowercase();
    ELECTRICAL_CONTEXT_KEYWORDS.iter().any(|kw| window.contains(kw))
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// Contacts from labeled phone numbers and emails with nearby names.
pub fn contacts_from_text(text: &str) -> Vec<Contact> {
    let mut contacts = Vec::new();

    for caps in CONTACT_PHONE_RE.captures_iter(text) {
        contacts.push(Contact {
            phone: Some(caps[1].to_string()),
            ..Default::default()
        });
    }

    for m in EMAIL_RE.find_iter(text) {
        let context_start = floor_char_boundary(text, m.start().saturating_sub(50));
        let context = &text[context_start..m.start()];
        contacts.push(Contact {
            email: Some(m.as_str().to_string()),
            name: NAME_RE.find(context).map(|n| n.as_str().to_string()),
            ..Default::default()
        });
    }

    contacts
}

/// Order-preserving exact-value dedup.
pub fn dedup_exact(values: &mut Vec<String>) {
    let mut seen = HashSet::new();
    values.retain(|v| seen.insert(v.clone()));
}
