//! Office-profile extraction.
//!
//! Builds a partial [`DetailedOfficeInfo`] from page content. The same
//! text-level extractors serve both fetch strategies: the static pass
//! feeds them parsed-document text, the dynamic pass feeds them
//! rendered text and anchors. "Partial" means empty strings and unset
//! options; the merge step treats those as gaps.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use super::extract::{collapse_whitespace, EMAIL_RE, PHONE_RE};
use super::patterns::GovernmentPattern;
use crate::models::{
    AdditionalInfo, BusinessHours, DetailedOfficeInfo, FeeSummary, FormCategories, FormLink,
    OnlineServiceFlags, Portals, ProcessInfo, ServiceFlags, StaffContact, StaffContacts,
};

/// An anchor with enough context to categorize it. Produced by both the
/// static extractor and the rendered-page harvest.
#[derive(Debug, Clone, Default)]
pub struct LinkInfo {
    pub href: String,
    pub text: String,
    pub title: String,
}

static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\d+\s+[A-Za-z\s]+(?:Street|St|Avenue|Ave|Road|Rd|Drive|Dr|Boulevard|Blvd|Way|Lane|Ln|Circle|Cir|Court|Ct|Place|Pl),?\s*[A-Za-z\s]+,?\s*[A-Z]{2}\s*\d{5}(?:-\d{4})?",
    )
    .unwrap()
});

static TIME_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,2}:\d{2}\s*(?:am|pm)?(?:\s*[-–]\s*\d{1,2}:\d{2}\s*(?:am|pm)?)?)")
        .unwrap()
});

static PROCESSING_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:processing time|review time|turnaround time)[\s:]*(\d+[-\s]*(?:business\s*)?(?:days?|weeks?|months?))",
    )
    .unwrap()
});

static PROCESS_STEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)step\s*\d+[:\s]([^.\n]+)").unwrap());

static MEETING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(planning commission|zoning board|city council)[^.\n]*?meetings?[^.\n]*?(\d+(?:st|nd|rd|th)?\s+\w+)",
    )
    .unwrap()
});

static PERSON_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z][a-z]+\s+[A-Z][a-z]+").unwrap());

pub(crate) const WEEKDAYS: &[(&str, &str)] = &[
    ("monday", "mon"),
    ("tuesday", "tue"),
    ("wednesday", "wed"),
    ("thursday", "thu"),
    ("friday", "fri"),
    ("saturday", "sat"),
    ("sunday", "sun"),
];

const OFFICE_NAME_SELECTORS: &[&str] = &[
    "h1",
    ".page-title",
    ".department-name",
    ".office-name",
    "title",
    ".site-title",
];

const FORM_EXTENSIONS: &[&str] = &[".pdf", ".doc", ".docx", ".xlsx", ".xls"];

/// Build the static-pass profile from a parsed document.
///
/// The resolved government pattern biases extraction: its selector lists
/// are consulted before the generic body-text fallback, and its service
/// vocabulary can set flags the generic keyword tables would miss.
pub fn profile_from_document(
    document: &Html,
    url: &Url,
    pattern: Option<&GovernmentPattern>,
) -> DetailedOfficeInfo {
    let body_text = body_text(document);
    let links = collect_links(document);

    let mut info = profile_from_text(&body_text, &links, url);
    info.office_name = office_name_from_document(document);
    info.jurisdiction = pattern.map(|p| p.kind);

    if let Some(pattern) = pattern {
        // Pattern selector regions are more trustworthy than whole-body
        // regex sweeps; let them override.
        if let Some(contact_text) = first_selector_text(document, pattern.contact_selectors) {
            if let Some(phone) = PHONE_RE.find(&contact_text) {
                info.phone = phone.as_str().to_string();
            }
            if let Some(email) = EMAIL_RE.find(&contact_text) {
                info.email = email.as_str().to_string();
            }
            if let Some(address) = ADDRESS_RE.find(&contact_text) {
                info.address = address.as_str().to_string();
            }
        }
        if let Some(hours_text) = first_selector_text(document, pattern.hours_selectors) {
            let hours = hours_from_text(&hours_text);
            if !hours.is_empty() {
                info.business_hours = hours;
            }
        }
        apply_service_vocabulary(&mut info.services, pattern, &body_text);
    }

    info
}

/// Build a profile from flat text plus anchors. The dynamic pass calls
/// this directly with rendered content.
pub fn profile_from_text(text: &str, links: &[LinkInfo], url: &Url) -> DetailedOfficeInfo {
    let lower = text.to_lowercase();

    DetailedOfficeInfo {
        office_name: office_name_from_text(text),
        department: department_from_text(&lower),
        jurisdiction: None,
        address: ADDRESS_RE
            .find(text)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
        phone: PHONE_RE
            .find(text)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
        email: EMAIL_RE
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .find(|e| !e.contains("example.com"))
            .unwrap_or_default(),
        website: url.to_string(),
        business_hours: hours_from_text(text),
        services: service_flags_from_text(&lower),
        online_services: online_service_flags_from_text(&lower),
        portals: portals_from_links(links),
        fee_structure: fee_summary_from_text(text),
        staff_contacts: staff_from_text(text),
        forms: forms_from_links(links, url),
        process_info: process_info_from_text(text),
        requirements: Default::default(),
        additional_info: additional_info_from_text(text),
        metadata: Default::default(),
    }
}

fn body_text(document: &Html) -> String {
    let body = Selector::parse("body").unwrap();
    document
        .select(&body)
        .next()
        .map(|el| {
            // Keep line structure: hours and fee parsing are line-based.
            el.text().collect::<Vec<_>>().join("\n")
        })
        .unwrap_or_default()
}

/// All anchors with text and title, for portal and form categorization.
pub fn collect_links(document: &Html) -> Vec<LinkInfo> {
    let selector = Selector::parse("a[href]").unwrap();
    document
        .select(&selector)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            Some(LinkInfo {
                href: href.to_string(),
                text: collapse_whitespace(&a.text().collect::<String>()),
                title: a.value().attr("title").unwrap_or_default().to_string(),
            })
        })
        .collect()
}

fn first_selector_text(document: &Html, selectors: &[&str]) -> Option<String> {
    for selector_str in selectors {
        let selector = match Selector::parse(selector_str) {
            Ok(s) => s,
            Err(_) => continue,
        };
        if let Some(el) = document.select(&selector).next() {
            let text = el.text().collect::<Vec<_>>().join("\n");
            if !text.trim().is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn office_name_from_document(document: &Html) -> String {
    for selector_str in OFFICE_NAME_SELECTORS {
        let selector = match Selector::parse(selector_str) {
            Ok(s) => s,
            Err(_) => continue,
        };
        if let Some(el) = document.select(&selector).next() {
            let text = collapse_whitespace(&el.text().collect::<String>());
            if text.len() > 3 && text.len() < 100 {
                return text;
            }
        }
    }
    String::new()
}

fn office_name_from_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| line.len() > 10 && line.len() < 100)
        .find(|line| {
            let lower = line.to_lowercase();
            lower.contains("department")
                || lower.contains("office")
                || lower.contains("building")
                || lower.contains("planning")
        })
        .unwrap_or_default()
        .to_string()
}

fn department_from_text(lower: &str) -> String {
    const DEPARTMENTS: &[(&str, &str)] = &[
        ("building department", "Building Department"),
        ("planning department", "Planning Department"),
        ("development services", "Development Services"),
        ("community development", "Community Development"),
        ("zoning department", "Zoning Department"),
    ];
    for &(needle, name) in DEPARTMENTS {
        if lower.contains(needle) {
            return name.to_string();
        }
    }
    String::new()
}

/// Per-weekday hours from line-oriented text. A line naming a day either
/// carries a time range or the word "closed".
pub fn hours_from_text(text: &str) -> BusinessHours {
    let mut hours = BusinessHours::default();

    for line in text.lines() {
        let lower = line.to_lowercase();
        for &(day, abbrev) in WEEKDAYS {
            if !(lower.contains(day) || lower.contains(abbrev)) {
                continue;
            }
            if let Some(m) = TIME_RANGE_RE.find(line) {
                hours.set(day, m.as_str().trim().to_string());
            } else if lower.contains("closed") {
                hours.set(day, "Closed".to_string());
            }
        }
    }

    hours
}

/// The 17-flag service map from keyword tables over lowercased text.
pub fn service_flags_from_text(lower: &str) -> ServiceFlags {
    let has = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    ServiceFlags {
        building_permits: has(&[
            "building permit",
            "construction permit",
            "new construction",
            "renovation",
            "remodel",
        ]),
        electrical_permits: has(&[
            "electrical permit",
            "electrical work",
            "wiring",
            "electrical service",
            "electrical installation",
        ]),
        plumbing_permits: has(&[
            "plumbing permit",
            "plumbing work",
            "water heater",
            "sewer",
            "water line",
        ]),
        mechanical_permits: has(&[
            "mechanical permit",
            "hvac",
            "heating",
            "cooling",
            "ventilation",
            "air conditioning",
        ]),
        zoning_permits: has(&[
            "zoning permit",
            "zoning application",
            "conditional use",
            "rezoning",
        ]),
        planning_review: has(&["planning review", "site plan", "planning approval"]),
        inspections: has(&[
            "building inspection",
            "final inspection",
            "rough inspection",
            "code compliance",
        ]),
        site_inspections: has(&[
            "site inspection",
            "grading inspection",
            "foundation inspection",
            "framing inspection",
        ]),
        land_development: has(&["land development", "site development", "infrastructure"]),
        subdivision_review: has(&["subdivision", "plat approval", "land division"]),
        variance_applications: has(&["variance", "zoning variance", "use variance"]),
        special_event_permits: has(&["special event", "event permit", "temporary use", "festival"]),
        sign_permits: has(&["sign permit", "signage permit", "billboard"]),
        demolition_permits: has(&["demolition", "structure removal"]),
        fire_department_review: has(&["fire department", "fire review", "fire safety", "fire code"]),
        health_department_review: has(&["health department", "health review", "septic", "well permit"]),
        environmental_review: has(&[
            "environmental review",
            "environmental impact",
            "stormwater",
            "wetlands",
        ]),
    }
}

/// The 8-flag online-service map.
pub fn online_service_flags_from_text(lower: &str) -> OnlineServiceFlags {
    let has = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    OnlineServiceFlags {
        online_applications: has(&[
            "online application",
            "apply online",
            "digital application",
            "e-permit",
        ]),
        online_payments: has(&["online payment", "pay online", "e-payment", "credit card"]),
        permit_tracking: has(&[
            "permit tracking",
            "track permit",
            "permit status",
            "application status",
        ]),
        scheduling_inspections: has(&[
            "schedule inspection",
            "inspection scheduling",
            "book inspection",
        ]),
        document_submission: has(&[
            "document upload",
            "file upload",
            "submit documents",
            "digital submission",
        ]),
        status_updates: has(&["status update", "email updates", "text alerts"]),
        renewals: has(&["permit renewal", "license renewal", "renew permit"]),
        appeals: has(&["appeal process", "board of appeals", "appeal a decision"]),
    }
}

/// Let the site-type vocabulary set flags the generic tables miss:
/// county sites talk about septic and wells, state sites about
/// environmental and fire-safety permits.
fn apply_service_vocabulary(flags: &mut ServiceFlags, pattern: &GovernmentPattern, text: &str) {
    let lower = text.to_lowercase();
    for service in pattern.service_vocabulary {
        if !lower.contains(service) {
            continue;
        }
        match *service {
            "building permits" => flags.building_permits = true,
            "electrical permits" => flags.electrical_permits = true,
            "plumbing permits" => flags.plumbing_permits = true,
            "mechanical permits" => flags.mechanical_permits = true,
            "zoning variances" => flags.variance_applications = true,
            "sign permits" => flags.sign_permits = true,
            "subdivision review" => flags.subdivision_review = true,
            "septic permits" | "well permits" => flags.health_department_review = true,
            "environmental review" | "environmental permits" => {
                flags.environmental_review = true
            }
            "fire safety permits" => flags.fire_department_review = true,
            _ => {}
        }
    }
}

/// Named portals recognized from link text.
pub fn portals_from_links(links: &[LinkInfo]) -> Portals {
    let mut portals = Portals::default();

    for link in links {
        let text = link.text.to_lowercase();
        let has_portal_word = text.contains("portal") || text.contains("system");
        if text.contains("permit") && has_portal_word {
            portals.permits.get_or_insert_with(|| link.href.clone());
        } else if text.contains("payment") && text.contains("portal") {
            portals.payments.get_or_insert_with(|| link.href.clone());
        } else if text.contains("inspection") && text.contains("portal") {
            portals.inspections.get_or_insert_with(|| link.href.clone());
        } else if text.contains("planning") && text.contains("portal") {
            portals.planning.get_or_insert_with(|| link.href.clone());
        } else if text.contains("citizen") && text.contains("portal") {
            portals.citizen.get_or_insert_with(|| link.href.clone());
        }
    }

    portals
}

/// Form links recognized by extension or wording, categorized by permit
/// type.
pub fn forms_from_links(links: &[LinkInfo], base: &Url) -> FormCategories {
    let mut forms = FormCategories::default();

    for link in links {
        if link.href.is_empty() {
            continue;
        }
        let text = link.text.to_lowercase();
        let title = link.title.to_lowercase();
        let href_lower = link.href.to_lowercase();

        let is_form = FORM_EXTENSIONS.iter().any(|ext| href_lower.contains(ext))
            || text.contains("form")
            || text.contains("application")
            || title.contains("form")
            || title.contains("application");
        if !is_form {
            continue;
        }

        let url = match base.join(&link.href) {
            Ok(u) => u.to_string(),
            Err(_) => continue,
        };

        let form = FormLink {
            name: if link.text.is_empty() {
                "Unknown Form".to_string()
            } else {
                link.text.clone()
            },
            url,
            file_type: file_type_of(&href_lower),
        };

        forms.push(categorize_form(&text), form);
    }

    forms
}

fn categorize_form(text: &str) -> &'static str {
    if text.contains("building") || text.contains("construction") {
        "building"
    } else if text.contains("electrical") {
        "electrical"
    } else if text.contains("plumbing") {
        "plumbing"
    } else if text.contains("mechanical") || text.contains("hvac") {
        "mechanical"
    } else if text.contains("zoning") || text.contains("variance") {
        "zoning"
    } else if text.contains("planning") || text.contains("development") {
        "planning"
    } else {
        "other"
    }
}

fn file_type_of(href_lower: &str) -> String {
    if href_lower.contains(".pdf") {
        "PDF"
    } else if href_lower.contains(".doc") {
        "DOC"
    } else if href_lower.contains(".xls") {
        "XLS"
    } else {
        "LINK"
    }
    .to_string()
}

/// Fee summary lines: any line naming a fee category alongside a dollar
/// amount.
pub fn fee_summary_from_text(text: &str) -> FeeSummary {
    let mut fees = FeeSummary::default();

    for line in text.lines() {
        if !line.contains('$') {
            continue;
        }
        let lower = line.to_lowercase();
        let line = line.trim().to_string();

        if lower.contains("building permit") {
            fees.building_permit_fees.get_or_insert(line);
        } else if lower.contains("inspection") {
            fees.inspection_fees.get_or_insert(line);
        } else if lower.contains("plan review") {
            fees.plan_review_fees.get_or_insert(line);
        } else if lower.contains("expedite") {
            fees.expedited_service_fees.get_or_insert(line);
        }
    }

    fees
}

/// Staff roles recognized from line wording, with any name/email/phone
/// found on the same line.
pub fn staff_from_text(text: &str) -> StaffContacts {
    let mut staff = StaffContacts::default();

    for line in text.lines() {
        let lower = line.to_lowercase();

        if lower.contains("building official") || lower.contains("chief building") {
            staff.building_official.get_or_insert_with(|| contact_from_line(line));
        } else if lower.contains("chief inspector") || lower.contains("inspector") {
            staff.chief_inspector.get_or_insert_with(|| contact_from_line(line));
        } else if lower.contains("plan review") || lower.contains("reviewer") {
            staff.plan_reviewer.get_or_insert_with(|| contact_from_line(line));
        } else if lower.contains("zoning") && lower.contains("administrator") {
            staff.zoning_administrator.get_or_insert_with(|| contact_from_line(line));
        } else if lower.contains("permit") && lower.contains("coordinator") {
            staff.permit_coordinator.get_or_insert_with(|| contact_from_line(line));
        }
    }

    staff
}

fn contact_from_line(line: &str) -> StaffContact {
    // Role titles are capitalized word pairs too; skip them when
    // hunting for the person's name.
    const ROLE_WORDS: &[&str] = &[
        "Building", "Official", "Chief", "Inspector", "Plan", "Reviewer", "Zoning",
        "Administrator", "Permit", "Coordinator", "Department", "Office",
    ];

    let name = PERSON_NAME_RE
        .find_iter(line)
        .map(|m| m.as_str())
        .find(|candidate| !ROLE_WORDS.iter().any(|w| candidate.contains(w)))
        .unwrap_or_default()
        .to_string();

    StaffContact {
        name,
        email: EMAIL_RE.find(line).map(|m| m.as_str().to_string()),
        phone: PHONE_RE.find(line).map(|m| m.as_str().to_string()),
    }
}

/// Processing time and numbered steps from free text.
pub fn process_info_from_text(text: &str) -> ProcessInfo {
    let mut info = ProcessInfo::default();

    if let Some(caps) = PROCESSING_TIME_RE.captures(text) {
        info.typical_processing_time = Some(caps[1].trim().to_string());
    }

    let steps: Vec<String> = PROCESS_STEP_RE
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if !steps.is_empty() {
        info.permit_process_steps = Some(steps);
    }

    info
}

/// Meeting schedules and similar loose ends.
pub fn additional_info_from_text(text: &str) -> AdditionalInfo {
    let mut info = AdditionalInfo::default();

    let meetings: Vec<String> = MEETING_RE
        .find_iter(text)
        .map(|m| collapse_whitespace(m.as_str()))
        .collect();
    if !meetings.is_empty() {
        info.meeting_schedules = Some(meetings.join("; "));
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_parse_day_lines() {
        let text = "Office Hours\nMonday: 8:00 am - 5:00 pm\nTuesday 8:00am-4:30pm\nSunday: Closed\n";
        let hours = hours_from_text(text);
        assert_eq!(hours.get("monday"), Some("8:00 am - 5:00 pm"));
        assert!(hours.get("tuesday").is_some());
        assert_eq!(hours.get("sunday"), Some("Closed"));
        assert_eq!(hours.get("wednesday"), None);
        assert_eq!(hours.days_set(), 3);
    }

    #[test]
    fn service_flags_hit_on_keywords() {
        let flags =
            service_flags_from_text("apply for an electrical permit or schedule a building inspection");
        assert!(flags.electrical_permits);
        assert!(flags.inspections);
        assert!(!flags.demolition_permits);
    }

    #[test]
    fn online_flags_hit_on_keywords() {
        let flags = online_service_flags_from_text("you can pay online and track permit status");
        assert!(flags.online_payments);
        assert!(flags.permit_tracking);
        assert!(!flags.renewals);
    }

    #[test]
    fn portals_matched_from_link_text() {
        let links = vec![
            LinkInfo {
                href: "https://permits.example.gov".into(),
                text: "Permit Portal".into(),
                title: String::new(),
            },
            LinkInfo {
                href: "https://pay.example.gov".into(),
                text: "Payment Portal".into(),
                title: String::new(),
            },
        ];
        let portals = portals_from_links(&links);
        assert_eq!(portals.permits.as_deref(), Some("https://permits.example.gov"));
        assert_eq!(portals.payments.as_deref(), Some("https://pay.example.gov"));
        assert!(portals.citizen.is_none());
    }

    #[test]
    fn forms_categorized_and_resolved() {
        let base = Url::parse("https://example.gov/permits/").unwrap();
        let links = vec![
            LinkInfo {
                href: "/forms/electrical-application.pdf".into(),
                text: "Electrical Permit Application".into(),
                title: String::new(),
            },
            LinkInfo {
                href: "/forms/misc.docx".into(),
                text: String::new(),
                title: String::new(),
            },
            LinkInfo {
                href: "/news".into(),
                text: "News".into(),
                title: String::new(),
            },
        ];
        let forms = forms_from_links(&links, &base);
        assert_eq!(forms.electrical.len(), 1);
        assert_eq!(
            forms.electrical[0].url,
            "https://example.gov/forms/electrical-application.pdf"
        );
        assert_eq!(forms.electrical[0].file_type, "PDF");
        assert_eq!(forms.other.len(), 1);
        assert_eq!(forms.other[0].name, "Unknown Form");
        assert_eq!(forms.total(), 2);
    }

    #[test]
    fn staff_roles_found_with_contact_details() {
        let text = "Building Official: Jane Smith, jsmith@example.gov, (404) 555-1234\n\
                    Permit Coordinator: Bob Jones 404-555-9999\n";
        let staff = staff_from_text(text);
        let official = staff.building_official.unwrap();
        assert_eq!(official.name, "Jane Smith");
        assert_eq!(official.email.as_deref(), Some("jsmith@example.gov"));
        assert!(official.phone.is_some());
        assert_eq!(staff.permit_coordinator.unwrap().name, "Bob Jones");
        assert!(staff.zoning_administrator.is_none());
    }

    #[test]
    fn process_info_captures_time_and_steps() {
        let text = "Processing time: 10 business days.\n\
                    Step 1: Submit your application\nStep 2: Pay the fee\n";
        let info = process_info_from_text(text);
        assert_eq!(info.typical_processing_time.as_deref(), Some("10 business days"));
        let steps = info.permit_process_steps.unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0], "Submit your application");
    }

    #[test]
    fn fee_lines_require_dollar_sign() {
        let text = "Building permit fees start at $150\nInspection scheduling is free\n";
        let fees = fee_summary_from_text(text);
        assert!(fees.building_permit_fees.is_some());
        assert!(fees.inspection_fees.is_none());
    }

    #[test]
    fn profile_from_text_fills_contact_block() {
        let url = Url::parse("https://example.gov/").unwrap();
        let text = "City of Example Building Department\n\
                    Call (404) 555-1234 or email permits@example.gov\n\
                    Monday: 8:00 am - 5:00 pm\n";
        let info = profile_from_text(text, &[], &url);
        assert_eq!(info.phone, "(404) 555-1234");
        assert_eq!(info.email, "permits@example.gov");
        assert_eq!(info.department, "Building Department");
        assert_eq!(info.business_hours.days_set(), 1);
        assert_eq!(info.website, "https://example.gov/");
    }

    #[test]
    fn example_com_emails_are_ignored() {
        let url = Url::parse("https://example.gov/").unwrap();
        let info = profile_from_text("write to test@example.com", &[], &url);
        assert!(info.email.is_empty());
    }
}
