//! Synthetic page layouts: cover, dividers, document covers, reference and
//! error pages, filler pages and the closing summary.
//!
//! Every builder takes the planned page number and stamps it into the footer,
//! so the printed numbers always come from the pagination plan.

use chrono::{DateTime, Utc};

use dossier_pdf::{PageSpec, TextStyle};
use dossier_shared::{CategoryEntry, CategoryId, DocumentEntry, InputDocument, PaginationPlan};

use crate::toc::truncate_name;

const GENERATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Failed documents named individually on the summary page.
pub const SUMMARY_FAILED_LIMIT: usize = 10;

/// Longest failed-document name printed on the summary page.
const SUMMARY_NAME_MAX_CHARS: usize = 60;

/// Footer text for page `n`.
pub fn page_footer(n: u32) -> String {
    format!("Page {n}")
}

/// Dossier cover (always page 1).
pub fn cover_page(
    title: &str,
    type_label: &str,
    document_count: usize,
    generated_at: DateTime<Utc>,
) -> PageSpec {
    PageSpec::new()
        .space(160.0)
        .title(title)
        .space(8.0)
        .text(TextStyle::Heading, type_label)
        .space(24.0)
        .rule()
        .space(12.0)
        .text(
            TextStyle::Body,
            format!("Documents included: {document_count}"),
        )
        .text(
            TextStyle::Body,
            format!("Generated: {}", generated_at.format(GENERATED_AT_FORMAT)),
        )
        .footer(page_footer(1))
}

/// One-page section divider opening a category.
pub fn divider_page(section: usize, category: &CategoryEntry) -> PageSpec {
    let count = category.documents.len();
    PageSpec::new()
        .space(200.0)
        .text(TextStyle::Muted, format!("Section {section}"))
        .title(&category.display_name)
        .space(6.0)
        .rule()
        .text(TextStyle::Body, documents_phrase(count))
        .footer(page_footer(category.start_page))
}

/// Synthetic cover preceding an embedded document's pages.
///
/// `note` describes any reconciliation applied to the document's page range.
pub fn document_cover_page(
    category: CategoryId,
    entry: &DocumentEntry,
    source: &InputDocument,
    note: Option<&str>,
) -> PageSpec {
    let first = entry.start_page + 1;
    let last = entry.start_page + entry.page_count.saturating_sub(1);

    let mut page = PageSpec::new()
        .text(TextStyle::Muted, category.display_name())
        .space(4.0)
        .heading(&entry.name)
        .rule()
        .space(6.0)
        .entry(TextStyle::Body, 0.0, "Pages", format!("{first}-{last}"))
        .entry(TextStyle::Body, 0.0, "File size", format_size(source.size_bytes));

    if let Some(note) = note {
        page = page.space(12.0).text(TextStyle::Strong, note);
    }
    page.footer(page_footer(entry.start_page))
}

/// Stand-in page for a document whose content is not embedded.
pub fn reference_page(category: CategoryId, entry: &DocumentEntry, source: &InputDocument) -> PageSpec {
    let kind = file_extension(&source.name)
        .map(|ext| format!("{} document", ext.to_uppercase()))
        .unwrap_or_else(|| "Document".to_string());

    PageSpec::new()
        .text(TextStyle::Muted, category.display_name())
        .space(4.0)
        .heading(&entry.name)
        .rule()
        .space(6.0)
        .entry(TextStyle::Body, 0.0, "Type", kind)
        .entry(TextStyle::Body, 0.0, "File size", format_size(source.size_bytes))
        .space(16.0)
        .text(
            TextStyle::Body,
            "The content of this document is not embedded in the dossier. \
             Refer to the original file submitted alongside it.",
        )
        .footer(page_footer(entry.start_page))
}

/// Page standing in for a document that could not be merged.
pub fn error_page(category: CategoryId, name: &str, reason: &str, page_number: u32) -> PageSpec {
    PageSpec::new()
        .text(TextStyle::Muted, category.display_name())
        .space(4.0)
        .heading(name)
        .rule()
        .space(6.0)
        .text(
            TextStyle::Strong,
            format!("The document '{name}' could not be merged into this dossier."),
        )
        .space(8.0)
        .text(TextStyle::Muted, format!("Reason: {reason}"))
        .footer(page_footer(page_number))
}

/// Blank continuation page keeping a document's planned page range.
pub fn filler_page(name: &str, page_number: u32) -> PageSpec {
    PageSpec::new()
        .space(320.0)
        .text(
            TextStyle::Muted,
            format!("This page is intentionally left blank ({name})."),
        )
        .footer(page_footer(page_number))
}

/// What actually happened to the documents during assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeTally {
    pub embedded: usize,
    pub referenced: usize,
    pub failed: Vec<String>,
}

/// Closing summary page.
pub fn summary_page(plan: &PaginationPlan, tally: &OutcomeTally, disclaimer: &str) -> PageSpec {
    let mut page = PageSpec::new()
        .heading("Compilation Summary")
        .rule()
        .space(6.0);

    for category in &plan.categories {
        page = page.entry(
            TextStyle::Body,
            0.0,
            &category.display_name,
            documents_phrase(category.documents.len()),
        );
    }

    page = page
        .space(10.0)
        .rule()
        .entry(TextStyle::Strong, 0.0, "Embedded", tally.embedded.to_string())
        .entry(TextStyle::Strong, 0.0, "Referenced", tally.referenced.to_string())
        .entry(TextStyle::Strong, 0.0, "Failed", tally.failed.len().to_string());

    if !tally.failed.is_empty() {
        page = page.space(6.0);
        for name in tally.failed.iter().take(SUMMARY_FAILED_LIMIT) {
            page = page.text(
                TextStyle::Muted,
                format!("Not merged: {}", truncate_name(name, SUMMARY_NAME_MAX_CHARS)),
            );
        }
        let hidden = tally.failed.len().saturating_sub(SUMMARY_FAILED_LIMIT);
        if hidden > 0 {
            page = page.text(TextStyle::Muted, format!("... and {hidden} more"));
        }
    }

    page.space(24.0)
        .text(TextStyle::Muted, disclaimer)
        .footer(page_footer(plan.summary_page))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn documents_phrase(count: usize) -> String {
    if count == 1 {
        "1 document".to_string()
    } else {
        format!("{count} documents")
    }
}

fn file_extension(name: &str) -> Option<&str> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.len() <= 5)
}

/// Human-readable size, e.g. `250.0 KB`.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dossier_pdf::Block;
    use dossier_shared::DocumentOutcome;

    fn texts(page: &PageSpec) -> Vec<String> {
        page.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Text { text, trailing, .. } => Some(match trailing {
                    Some(t) => format!("{text} | {t}"),
                    None => text.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn cover_lists_type_count_and_timestamp() {
        let at = Utc.with_ymd_and_hms(2026, 5, 4, 8, 30, 0).unwrap();
        let page = cover_page("Study ABC-123", "Clinical Trial Application (CTA)", 7, at);
        let lines = texts(&page);
        assert!(lines.contains(&"Study ABC-123".to_string()));
        assert!(lines.contains(&"Documents included: 7".to_string()));
        assert!(lines.contains(&"Generated: 2026-05-04 08:30:00 UTC".to_string()));
        assert_eq!(page.footer.as_deref(), Some("Page 1"));
    }

    #[test]
    fn error_page_names_document() {
        let page = error_page(CategoryId::Quality, "broken.pdf", "invalid xref", 6);
        let lines = texts(&page);
        assert!(lines.iter().any(|l| l.contains("'broken.pdf' could not be merged")));
        assert_eq!(page.footer.as_deref(), Some("Page 6"));
    }

    #[test]
    fn document_cover_shows_range_and_note() {
        let entry = DocumentEntry {
            name: "report.pdf".into(),
            start_page: 4,
            page_count: 4,
            outcome: DocumentOutcome::Embedded { content_pages: 3 },
        };
        let source = InputDocument::new("report.pdf", CategoryId::Clinical, vec![0; 2048]);
        let page = document_cover_page(
            CategoryId::Clinical,
            &entry,
            &source,
            Some("Showing 3 of 9 pages."),
        );
        let lines = texts(&page);
        assert!(lines.contains(&"Pages | 5-7".to_string()));
        assert!(lines.contains(&"File size | 2.0 KB".to_string()));
        assert!(lines.contains(&"Showing 3 of 9 pages.".to_string()));
    }

    #[test]
    fn reference_page_describes_file_type() {
        let entry = DocumentEntry {
            name: "brochure.docx".into(),
            start_page: 9,
            page_count: 1,
            outcome: DocumentOutcome::Referenced,
        };
        let source = InputDocument::new("brochure.docx", CategoryId::Ib, vec![0; 10]);
        let lines = texts(&reference_page(CategoryId::Ib, &entry, &source));
        assert!(lines.contains(&"Type | DOCX document".to_string()));
        assert!(lines.contains(&"File size | 10 B".to_string()));
    }

    #[test]
    fn summary_counts_outcomes() {
        let plan = PaginationPlan {
            toc_start_page: 2,
            toc_page_count: 1,
            body_start_page: 3,
            categories: vec![CategoryEntry {
                id: CategoryId::Other,
                display_name: "Other Documents".into(),
                start_page: 3,
                documents: vec![],
            }],
            summary_page: 4,
            total_pages: 4,
        };
        let tally = OutcomeTally {
            embedded: 2,
            referenced: 1,
            failed: vec!["bad.pdf".into()],
        };
        let page = summary_page(&plan, &tally, "Check everything.");
        let lines = texts(&page);
        assert!(lines.contains(&"Other Documents | 0 documents".to_string()));
        assert!(lines.contains(&"Embedded | 2".to_string()));
        assert!(lines.contains(&"Failed | 1".to_string()));
        assert!(lines.contains(&"Not merged: bad.pdf".to_string()));
        assert!(lines.contains(&"Check everything.".to_string()));
        assert_eq!(page.footer.as_deref(), Some("Page 4"));
    }

    #[test]
    fn summary_caps_failed_list_and_keeps_disclaimer() {
        use dossier_pdf::{LopdfRenderer, PageRenderer, page_text};
        use dossier_shared::LayoutConfig;

        let categories = [
            CategoryId::Protocol,
            CategoryId::Ib,
            CategoryId::Quality,
            CategoryId::Nonclinical,
            CategoryId::Clinical,
            CategoryId::Other,
        ]
        .into_iter()
        .enumerate()
        .map(|(i, id)| CategoryEntry {
            id,
            display_name: id.display_name().into(),
            start_page: 3 + i as u32,
            documents: vec![],
        })
        .collect();
        let plan = PaginationPlan {
            toc_start_page: 2,
            toc_page_count: 1,
            body_start_page: 3,
            categories,
            summary_page: 9,
            total_pages: 9,
        };
        let mut failed: Vec<String> = (0..80).map(|i| format!("corrupt-{i:02}.pdf")).collect();
        failed[0] = format!("{}.pdf", "x".repeat(200));
        let tally = OutcomeTally {
            embedded: 0,
            referenced: 0,
            failed,
        };

        let page = summary_page(&plan, &tally, "Verify against the source documents.");
        let lines = texts(&page);
        assert!(lines.contains(&"Failed | 80".to_string()));
        assert!(lines.contains(&"Not merged: corrupt-09.pdf".to_string()));
        assert!(!lines.contains(&"Not merged: corrupt-10.pdf".to_string()));
        assert!(lines.contains(&"... and 70 more".to_string()));
        assert_eq!(
            lines.last().map(String::as_str),
            Some("Verify against the source documents.")
        );
        let long = lines.iter().find(|l| l.starts_with("Not merged: xxx")).unwrap();
        assert!(long.chars().count() <= "Not merged: ".len() + SUMMARY_NAME_MAX_CHARS);

        let doc = LopdfRenderer::from_layout(&LayoutConfig::default())
            .render(&page)
            .unwrap();
        let text = page_text(&doc, 1).unwrap();
        assert!(text.contains("(... and 70 more)"));
        assert!(text.contains("(Verify against the source documents.)"));
    }

    #[test]
    fn sizes_are_humanized() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(250 * 1024), "250.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024 + 512 * 1024), "3.5 MB");
    }
}
