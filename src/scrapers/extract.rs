//! Content extraction: one parsed page in, semantic blocks out.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::relevance::RELEVANCE_KEYWORDS;
use crate::models::{
    CrawlConfig, FieldDescriptor, FormDescriptor, PageRecord, TableRecord,
};

/// US phone number shapes: (404) 555-1234, 404-555-1234, 404.555.1234.
pub(crate) static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap());

pub(crate) static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap());

/// Regions tried, in order, for the main content of a page. Body is the
/// fallback.
const MAIN_CONTENT_SELECTORS: &[&str] =
    &["main", "article", ".content", ".main-content", "#content", "#main"];

/// Elements whose entire subtree is boilerplate.
const BOILERPLATE_TAGS: &[&str] = &["nav", "header", "footer", "aside", "script", "style", "noscript"];

/// Class/id substrings that mark a subtree as navigation or chrome.
const BOILERPLATE_MARKERS: &[&str] = &["nav", "menu", "sidebar", "advertisement", "breadcrumb"];

/// Combined text/title/href of a PDF link must NOT contain any of these.
/// Government sites link far more policy PDFs than application PDFs;
/// without the exclusion list the output is mostly noise.
const PDF_EXCLUSION_KEYWORDS: &[&str] = &[
    "ordinance",
    "code",
    "regulation",
    "policy",
    "manual",
    "checklist",
    "fee schedule",
    "fee-schedule",
    "calendar",
    "meeting",
    "minutes",
    "agenda",
    "report",
    "brochure",
];

/// Extract a full [`PageRecord`] from raw HTML.
///
/// Parsing failures on malformed markup do not surface here: the HTML
/// parser recovers, and a page that yields nothing simply produces an
/// empty record with a zero quality score.
pub fn extract_page(html: &str, url: &Url, depth: u32, config: &CrawlConfig) -> PageRecord {
    let document = Html::parse_document(html);

    let title = select_first_text(&document, "title").unwrap_or_default();
    let main_text = extract_main_text(&document);
    let outbound_links = extract_links(&document, url, config.follow_external_links);
    let pdf_links = if config.extract_pdfs {
        extract_pdf_links(&document)
    } else {
        Vec::new()
    };
    let forms = extract_forms(&document);
    let tables = extract_tables(&document);
    let lists = extract_lists(&document);
    let quality_score = assess_quality(&document, &main_text, &forms, &tables, &lists, &pdf_links);

    PageRecord {
        url: url.to_string(),
        title,
        main_text,
        outbound_links,
        pdf_links,
        forms,
        tables,
        lists,
        depth,
        fetched_at: Utc::now(),
        quality_score,
    }
}

fn select_first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

/// Main text with navigation, header/footer, and script/style subtrees
/// stripped.
pub fn extract_main_text(document: &Html) -> String {
    for selector_str in MAIN_CONTENT_SELECTORS {
        let selector = match Selector::parse(selector_str) {
            Ok(s) => s,
            Err(_) => continue,
        };
        if let Some(region) = document.select(&selector).next() {
            let text = text_without_boilerplate(region);
            if !text.is_empty() {
                return text;
            }
        }
    }

    let body = Selector::parse("body").unwrap();
    document
        .select(&body)
        .next()
        .map(text_without_boilerplate)
        .unwrap_or_default()
}

/// Collect text below `root`, skipping boilerplate subtrees. The DOM is
/// immutable, so removal is a walk that declines to descend.
fn text_without_boilerplate(root: ElementRef) -> String {
    let mut out = String::new();
    collect_text(root, &mut out);
    collapse_whitespace(&out)
}

fn collect_text(element: ElementRef, out: &mut String) {
    if is_boilerplate(element) {
        return;
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_el) = ElementRef::wrap(child) {
            collect_text(child_el, out);
        }
    }
}

fn is_boilerplate(element: ElementRef) -> bool {
    let name = element.value().name();
    if BOILERPLATE_TAGS.contains(&name) {
        return true;
    }
    let classes = element.value().attr("class").unwrap_or_default();
    let id = element.value().attr("id").unwrap_or_default();
    let combined = format!("{} {}", classes, id).to_lowercase();
    BOILERPLATE_MARKERS.iter().any(|m| combined.contains(m))
}

/// Outbound links resolved against the page URL, same-origin unless
/// external links are allowed, deduplicated in discovery order.
pub fn extract_links(document: &Html, base: &Url, follow_external: bool) -> Vec<String> {
    let selector = Selector::parse("a[href]").unwrap();
    let mut seen: HashSet<String> = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let href = element.value().attr("href").unwrap_or_default();
        if skip_href(href) {
            continue;
        }
        let resolved = match base.join(href) {
            Ok(u) => u,
            Err(_) => continue,
        };
        if !follow_external && resolved.origin() != base.origin() {
            continue;
        }
        let url = resolved.to_string();
        if seen.insert(url.clone()) {
            links.push(url);
        }
    }

    links
}

fn skip_href(href: &str) -> bool {
    href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
}

/// PDF links that look like permit applications.
///
/// Double filter: the combined link text/title/href must hit a domain
/// keyword AND miss every exclusion keyword. Exclusions win over
/// inclusions, so "Electrical Code Ordinance.pdf" never gets through.
pub fn extract_pdf_links(document: &Html) -> Vec<String> {
    let selector = Selector::parse("a[href]").unwrap();
    let mut seen: HashSet<String> = HashSet::new();
    let mut pdfs = Vec::new();

    for element in document.select(&selector) {
        let href = element.value().attr("href").unwrap_or_default();
        if !href.to_lowercase().ends_with(".pdf") {
            continue;
        }

        let text = element.text().collect::<String>();
        let title = element.value().attr("title").unwrap_or_default();
        let combined = format!("{} {} {}", text, title, href).to_lowercase();

        let relevant = RELEVANCE_KEYWORDS.iter().any(|kw| combined.contains(kw));
        let excluded = PDF_EXCLUSION_KEYWORDS.iter().any(|kw| combined.contains(kw));

        if relevant && !excluded && seen.insert(href.to_string()) {
            pdfs.push(href.to_string());
        }
    }

    pdfs
}

/// Every `<form>` with its action, method, and field descriptors.
pub fn extract_forms(document: &Html) -> Vec<FormDescriptor> {
    let form_selector = Selector::parse("form").unwrap();
    let field_selector = Selector::parse("input, select, textarea").unwrap();
    let option_selector = Selector::parse("option").unwrap();
    let labels = label_texts_by_target(document);

    let mut forms = Vec::new();

    for form in document.select(&form_selector) {
        let action = form.value().attr("action").unwrap_or_default().to_string();
        let method = form
            .value()
            .attr("method")
            .unwrap_or("get")
            .to_lowercase();

        let mut fields = Vec::new();
        for field in form.select(&field_selector) {
            let name = match field.value().attr("name") {
                Some(n) if !n.is_empty() => n.to_string(),
                _ => continue,
            };
            let tag = field.value().name();
            let field_type = field
                .value()
                .attr("type")
                .map(|t| t.to_lowercase())
                .unwrap_or_else(|| tag.to_string());
            let required = field.value().attr("required").is_some();
            let label = field
                .value()
                .attr("id")
                .and_then(|id| labels.get(id))
                .cloned();
            let options = (tag == "select").then(|| {
                field
                    .select(&option_selector)
                    .map(|opt| collapse_whitespace(&opt.text().collect::<String>()))
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
            });

            fields.push(FieldDescriptor {
                name,
                field_type,
                label,
                required,
                options,
            });
        }

        if !fields.is_empty() {
            forms.push(FormDescriptor {
                action,
                method,
                fields,
            });
        }
    }

    forms
}

/// Label text keyed by the `for` attribute, resolved once per page.
fn label_texts_by_target(document: &Html) -> HashMap<String, String> {
    let selector = Selector::parse("label[for]").unwrap();
    document
        .select(&selector)
        .filter_map(|label| {
            let target = label.value().attr("for")?;
            let text = collapse_whitespace(&label.text().collect::<String>());
            (!text.is_empty()).then(|| (target.to_string(), text))
        })
        .collect()
}

/// Header cells, body rows, and caption for every `<table>`.
pub fn extract_tables(document: &Html) -> Vec<TableRecord> {
    let table_selector = Selector::parse("table").unwrap();
    let caption_selector = Selector::parse("caption").unwrap();
    let thead_th = Selector::parse("thead th").unwrap();
    let first_row_th = Selector::parse("tr:first-child th").unwrap();
    let row_selector = Selector::parse("tr").unwrap();
    let cell_selector = Selector::parse("td").unwrap();

    let mut tables = Vec::new();

    for table in document.select(&table_selector) {
        let caption = table
            .select(&caption_selector)
            .next()
            .map(|c| collapse_whitespace(&c.text().collect::<String>()))
            .filter(|t| !t.is_empty());

        let mut headers: Vec<String> = table
            .select(&thead_th)
            .map(|th| collapse_whitespace(&th.text().collect::<String>()))
            .collect();
        if headers.is_empty() {
            headers = table
                .select(&first_row_th)
                .map(|th| collapse_whitespace(&th.text().collect::<String>()))
                .collect();
        }

        let mut rows = Vec::new();
        for row in table.select(&row_selector) {
            let cells: Vec<String> = row
                .select(&cell_selector)
                .map(|td| collapse_whitespace(&td.text().collect::<String>()))
                .collect();
            if !cells.is_empty() {
                rows.push(cells);
            }
        }

        if !headers.is_empty() || !rows.is_empty() {
            tables.push(TableRecord {
                headers,
                rows,
                caption,
            });
        }
    }

    tables
}

/// Item texts for every `<ul>`/`<ol>`, nested list markup stripped.
/// Empty lists are skipped.
pub fn extract_lists(document: &Html) -> Vec<Vec<String>> {
    let list_selector = Selector::parse("ul, ol").unwrap();
    let item_selector = Selector::parse("li").unwrap();

    let mut lists = Vec::new();

    for list in document.select(&list_selector) {
        let mut items = Vec::new();
        for item in list.select(&item_selector) {
            // Direct text nodes only; nested list text belongs to the
            // nested items.
            let text: String = item
                .children()
                .filter_map(|c| c.value().as_text().map(|t| t.to_string()))
                .collect();
            let text = collapse_whitespace(&text);
            if !text.is_empty() {
                items.push(text);
            }
        }
        if !items.is_empty() {
            lists.push(items);
        }
    }

    lists
}

/// Advisory content-richness score in [0, 1].
///
/// Fixed weights; stored on the record for the aggregator to break
/// conflicts with. Nothing in the crawl loop reads it.
fn assess_quality(
    document: &Html,
    main_text: &str,
    forms: &[FormDescriptor],
    tables: &[TableRecord],
    lists: &[Vec<String>],
    pdf_links: &[String],
) -> f64 {
    let mut score = 0u32;

    if !forms.is_empty() {
        score += 2;
    }
    if !tables.is_empty() {
        score += 2;
    }
    if !lists.is_empty() {
        score += 1;
    }
    if PHONE_RE.is_match(main_text) {
        score += 1;
    }
    if EMAIL_RE.is_match(main_text) {
        score += 1;
    }

    let any_pdf = !pdf_links.is_empty() || {
        let selector = Selector::parse("a[href]").unwrap();
        document.select(&selector).any(|a| {
            a.value()
                .attr("href")
                .is_some_and(|h| h.to_lowercase().ends_with(".pdf"))
        })
    };
    if any_pdf {
        score += 1;
    }

    let lower = main_text.to_lowercase();
    if RELEVANCE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        score += 2;
    }

    f64::from(score) / 10.0
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(html: &str) -> (Html, Url) {
        (
            Html::parse_document(html),
            Url::parse("https://example.gov/permits").unwrap(),
        )
    }

    #[test]
    fn main_text_prefers_main_region_and_strips_nav() {
        let (doc, _) = page(
            r#"<html><body>
            <nav>Home | About | Permits</nav>
            <main><p>Electrical permit applications are accepted daily.</p></main>
            <footer>Copyright</footer>
            </body></html>"#,
        );
        let text = extract_main_text(&doc);
        assert!(text.contains("Electrical permit applications"));
        assert!(!text.contains("Home | About"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn body_fallback_still_strips_boilerplate() {
        let (doc, _) = page(
            r#"<html><body>
            <div class="sidebar-menu">Quick links</div>
            <p>Visit the permit counter.</p>
            <script>var x = 1;</script>
            </body></html>"#,
        );
        let text = extract_main_text(&doc);
        assert!(text.contains("permit counter"));
        assert!(!text.contains("Quick links"));
        assert!(!text.contains("var x"));
    }

    #[test]
    fn links_are_same_origin_resolved_and_deduped() {
        let (doc, base) = page(
            r##"<a href="/permits/fees">Fees</a>
               <a href="/permits/fees">Fees again</a>
               <a href="https://other.example.com/page">External</a>
               <a href="mailto:x@example.gov">Mail</a>
               <a href="#section">Anchor</a>"##,
        );
        let links = extract_links(&doc, &base, false);
        assert_eq!(links, vec!["https://example.gov/permits/fees"]);
    }

    #[test]
    fn external_links_kept_when_allowed() {
        let (doc, base) = page(r#"<a href="https://other.example.com/page">External</a>"#);
        let links = extract_links(&doc, &base, true);
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn pdf_filter_requires_keyword() {
        let (doc, _) = page(
            r#"<a href="/files/budget.pdf">Annual budget</a>
               <a href="/files/electrical-permit-application.pdf">Electrical permit application</a>"#,
        );
        let pdfs = extract_pdf_links(&doc);
        assert_eq!(pdfs, vec!["/files/electrical-permit-application.pdf"]);
    }

    #[test]
    fn pdf_exclusion_beats_inclusion() {
        // "permit" appears, but so do exclusion keywords.
        let (doc, _) = page(
            r#"<a href="/files/permit-ordinance.pdf">Permit ordinance</a>
               <a href="/files/electrical-code.pdf">Electrical code</a>
               <a href="/files/permit-checklist.pdf">Permit checklist</a>"#,
        );
        assert!(extract_pdf_links(&doc).is_empty());
    }

    #[test]
    fn form_extraction_captures_fields() {
        let (doc, _) = page(
            r#"<form action="/apply" method="post">
                 <label for="an">Applicant name</label>
                 <input type="text" name="applicantName" id="an" required>
                 <select name="permitKind">
                   <option>Electrical</option>
                   <option>Solar</option>
                 </select>
                 <input type="submit" value="Go">
               </form>"#,
        );
        let forms = extract_forms(&doc);
        assert_eq!(forms.len(), 1);
        let form = &forms[0];
        assert_eq!(form.action, "/apply");
        assert_eq!(form.method, "post");

        let name_field = &form.fields[0];
        assert_eq!(name_field.name, "applicantName");
        assert_eq!(name_field.field_type, "text");
        assert!(name_field.required);
        assert_eq!(name_field.label.as_deref(), Some("Applicant name"));

        let select = &form.fields[1];
        assert_eq!(select.field_type, "select");
        assert_eq!(
            select.options.as_deref(),
            Some(&["Electrical".to_string(), "Solar".to_string()][..])
        );
    }

    #[test]
    fn unnamed_fields_are_skipped() {
        let (doc, _) = page(r#"<form action="/f"><input type="text"></form>"#);
        assert!(extract_forms(&doc).is_empty());
    }

    #[test]
    fn table_extraction_reads_thead_and_rows() {
        let (doc, _) = page(
            r#"<table>
                 <caption>Permit fees</caption>
                 <thead><tr><th>Permit Type</th><th>Fee</th></tr></thead>
                 <tbody><tr><td>Electrical</td><td>$150.00</td></tr></tbody>
               </table>"#,
        );
        let tables = extract_tables(&doc);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].headers, vec!["Permit Type", "Fee"]);
        assert_eq!(tables[0].rows, vec![vec!["Electrical", "$150.00"]]);
        assert_eq!(tables[0].caption.as_deref(), Some("Permit fees"));
    }

    #[test]
    fn headerless_table_uses_first_row_th() {
        let (doc, _) = page(
            r#"<table>
                 <tr><th>Day</th><th>Hours</th></tr>
                 <tr><td>Monday</td><td>8-5</td></tr>
               </table>"#,
        );
        let tables = extract_tables(&doc);
        assert_eq!(tables[0].headers, vec!["Day", "Hours"]);
    }

    #[test]
    fn list_extraction_skips_empty_and_strips_nesting() {
        let (doc, _) = page(
            r#"<ul>
                 <li>Submit application
                   <ul><li>Include site plan</li></ul>
                 </li>
                 <li>Pay fee</li>
               </ul>
               <ul></ul>"#,
        );
        let lists = extract_lists(&doc);
        // Outer list plus the nested list.
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0][0], "Submit application");
        assert_eq!(lists[0].last().unwrap(), "Pay fee");
        assert_eq!(lists[1], vec!["Include site plan"]);
    }

    #[test]
    fn quality_score_stays_in_unit_interval() {
        let (doc, base) = page(
            r#"<main>Electrical permits. Call (404) 555-1234 or permits@example.gov</main>
               <form action="/a"><input name="n"></form>
               <table><tr><td>x</td></tr></table>
               <ul><li>item</li></ul>
               <a href="/f/permit-application.pdf">permit application</a>"#,
        );
        let record = extract_page(&doc.root_element().html(), &base, 0, &CrawlConfig::default());
        assert!(record.quality_score > 0.0);
        assert!(record.quality_score <= 1.0);
    }

    #[test]
    fn empty_page_scores_zero() {
        let (doc, base) = page("<html><body></body></html>");
        let record = extract_page(&doc.root_element().html(), &base, 0, &CrawlConfig::default());
        assert_eq!(record.quality_score, 0.0);
        assert!(record.forms.is_empty());
        assert!(record.tables.is_empty());
    }
}
