//! Table-of-contents renderer.
//!
//! Second pass of compilation: turns a [`PaginationPlan`] into the ToC
//! front-matter pages. Line capacity per page is fixed, and the page count is
//! shared with the planner through [`toc_page_count`], so the planner has
//! already reserved exactly as many pages as this module emits.
//!
//! [`check_capacity`] rejects layouts whose `toc_entries_per_page` would not
//! fit the page geometry.

use tracing::{debug, instrument};

use dossier_pdf::{PageSpec, RULE_HEIGHT, TextStyle};
use dossier_shared::{DossierError, LayoutConfig, PaginationPlan, Result};

/// Indentation of document lines under their category, in points.
const DOCUMENT_INDENT: f32 = 18.0;

/// Gap between the heading rule and the first entry.
const HEADER_GAP: f32 = 6.0;

/// Extra gap above every category line.
const CATEGORY_GAP: f32 = 4.0;

/// Marker appended to truncated document names.
const ELLIPSIS: &str = "...";

/// Kind of ToC line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TocLineKind {
    Category,
    Document,
}

/// One entry line: numbered label plus the page it points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocLine {
    pub kind: TocLineKind,
    pub label: String,
    pub page: u32,
}

impl TocLine {
    /// Right-aligned page reference, e.g. `Page 12`.
    pub fn page_label(&self) -> String {
        format!("Page {}", self.page)
    }
}

/// Number of ToC pages needed for `line_count` entry lines. Always at least one.
pub fn toc_page_count(line_count: usize, entries_per_page: u32) -> u32 {
    let per_page = entries_per_page.max(1) as usize;
    let pages = line_count.div_ceil(per_page).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Most entry lines one ToC page can hold with the page geometry of `layout`.
///
/// Every line is costed as a category line, the tallest kind, so any mix of
/// lines up to this count fits above the bottom margin.
pub fn max_entries_per_page(layout: &LayoutConfig) -> u32 {
    let header = TextStyle::Heading.leading() + RULE_HEIGHT + HEADER_GAP;
    let line = CATEGORY_GAP + TextStyle::Strong.leading().max(TextStyle::Body.leading());
    let usable = layout.page_height_pt - 2.0 * layout.margin_pt - header;
    if usable <= 0.0 {
        return 0;
    }
    (usable / line).floor() as u32
}

/// Fail with a configuration error when `toc_entries_per_page` exceeds what
/// the page geometry can hold.
pub fn check_capacity(layout: &LayoutConfig) -> Result<()> {
    let capacity = max_entries_per_page(layout);
    if layout.toc_entries_per_page > capacity {
        return Err(DossierError::configuration(format!(
            "layout.toc_entries_per_page = {} does not fit a {}x{} pt page with {} pt margins (at most {capacity})",
            layout.toc_entries_per_page,
            layout.page_width_pt,
            layout.page_height_pt,
            layout.margin_pt,
        )));
    }
    Ok(())
}

/// Build the numbered entry lines for a plan.
///
/// Categories are numbered `1.`, `2.`, ...; documents `<n>.<m>` with `m`
/// restarting in every category.
pub fn toc_lines(plan: &PaginationPlan, name_max_chars: usize) -> Vec<TocLine> {
    let mut lines = Vec::with_capacity(plan.categories.len() + plan.document_count());

    for (ci, category) in plan.categories.iter().enumerate() {
        let n = ci + 1;
        lines.push(TocLine {
            kind: TocLineKind::Category,
            label: format!("{n}. {}", category.display_name),
            page: category.start_page,
        });

        for (di, doc) in category.documents.iter().enumerate() {
            let m = di + 1;
            lines.push(TocLine {
                kind: TocLineKind::Document,
                label: format!("{n}.{m} {}", truncate_name(&doc.name, name_max_chars)),
                page: doc.start_page,
            });
        }
    }

    lines
}

/// Render the ToC pages for `plan`.
///
/// Always returns exactly `plan.toc_page_count` pages.
#[instrument(skip_all, fields(categories = plan.categories.len(), toc_pages = plan.toc_page_count))]
pub fn render_toc(plan: &PaginationPlan, layout: &LayoutConfig) -> Vec<PageSpec> {
    let lines = toc_lines(plan, layout.toc_name_max_chars);
    let per_page = layout.toc_entries_per_page.max(1) as usize;
    let page_total = plan.toc_page_count.max(1) as usize;

    let mut chunks: Vec<&[TocLine]> = lines.chunks(per_page).collect();
    // Pad so the output always matches the reservation made by the planner.
    while chunks.len() < page_total {
        chunks.push(&[]);
    }

    let pages: Vec<PageSpec> = chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let heading = if i == 0 {
                "Table of Contents"
            } else {
                "Table of Contents (continued)"
            };

            let mut page = PageSpec::new().heading(heading).rule().space(HEADER_GAP);
            for line in chunk {
                page = match line.kind {
                    TocLineKind::Category => page.space(CATEGORY_GAP).entry(
                        TextStyle::Strong,
                        0.0,
                        &line.label,
                        line.page_label(),
                    ),
                    TocLineKind::Document => page.entry(
                        TextStyle::Body,
                        DOCUMENT_INDENT,
                        &line.label,
                        line.page_label(),
                    ),
                };
            }
            page.footer(format!("Page {}", plan.toc_start_page + i as u32))
        })
        .collect();

    debug!(lines = lines.len(), pages = pages.len(), "table of contents rendered");
    pages
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Cut names longer than `max_chars` characters, ending them with `...`.
/// The result is at most `max_chars` characters long.
pub fn truncate_name(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let head: String = name.chars().take(keep).collect();
    format!("{head}{ELLIPSIS}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_shared::{CategoryEntry, CategoryId, DocumentEntry, DocumentOutcome};

    fn doc(name: &str, start_page: u32) -> DocumentEntry {
        DocumentEntry {
            name: name.into(),
            start_page,
            page_count: 1,
            outcome: DocumentOutcome::Referenced,
        }
    }

    fn make_plan() -> PaginationPlan {
        PaginationPlan {
            toc_start_page: 2,
            toc_page_count: 1,
            body_start_page: 3,
            categories: vec![
                CategoryEntry {
                    id: CategoryId::Protocol,
                    display_name: "Clinical Trial Protocol".into(),
                    start_page: 3,
                    documents: vec![doc("protocol.pdf", 4)],
                },
                CategoryEntry {
                    id: CategoryId::Quality,
                    display_name: "Quality Documentation".into(),
                    start_page: 5,
                    documents: vec![
                        doc("specification.docx", 6),
                        doc(
                            "Stability data for batches 001 through 017 - final report.pdf",
                            7,
                        ),
                    ],
                },
            ],
            summary_page: 8,
            total_pages: 8,
        }
    }

    #[test]
    fn lines_are_numbered_per_category() {
        let lines = toc_lines(&make_plan(), 40);
        let labels: Vec<_> = lines.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "1. Clinical Trial Protocol",
                "1.1 protocol.pdf",
                "2. Quality Documentation",
                "2.1 specification.docx",
                "2.2 Stability data for batches 001 throug...",
            ]
        );
        assert_eq!(lines[2].kind, TocLineKind::Category);
        assert_eq!(lines[2].page_label(), "Page 5");
        assert_eq!(lines[4].page, 7);
    }

    #[test]
    fn truncate_name_limits_length() {
        assert_eq!(truncate_name("short.pdf", 40), "short.pdf");
        let exactly_40 = "a".repeat(40);
        assert_eq!(truncate_name(&exactly_40, 40), exactly_40);

        let long = "b".repeat(41);
        let cut = truncate_name(&long, 40);
        assert_eq!(cut.chars().count(), 40);
        assert!(cut.ends_with("..."));

        // Multi-byte characters are counted as characters, not bytes.
        let accented = "é".repeat(45);
        assert_eq!(truncate_name(&accented, 40).chars().count(), 40);
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(toc_page_count(0, 32), 1);
        assert_eq!(toc_page_count(32, 32), 1);
        assert_eq!(toc_page_count(33, 32), 2);
        assert_eq!(toc_page_count(65, 32), 3);
        assert_eq!(toc_page_count(5, 0), 5);
    }

    #[test]
    fn renders_single_page_for_small_plan() {
        let pages = render_toc(&make_plan(), &LayoutConfig::default());
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].footer.as_deref(), Some("Page 2"));
    }

    #[test]
    fn overflow_continues_on_next_page() {
        let mut plan = make_plan();
        plan.toc_page_count = 3;
        let layout = LayoutConfig {
            toc_entries_per_page: 2,
            ..LayoutConfig::default()
        };

        let pages = render_toc(&plan, &layout);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2].footer.as_deref(), Some("Page 4"));

        let has_heading = |page: &PageSpec, text: &str| {
            page.blocks.iter().any(|b| {
                matches!(b, dossier_pdf::Block::Text { text: t, .. } if t == text)
            })
        };
        assert!(has_heading(&pages[0], "Table of Contents"));
        assert!(has_heading(&pages[1], "Table of Contents (continued)"));
    }

    #[test]
    fn capacity_follows_page_geometry() {
        let a4 = LayoutConfig::default();
        assert_eq!(max_entries_per_page(&a4), 34);
        assert!(check_capacity(&a4).is_ok());

        let crowded = LayoutConfig {
            toc_entries_per_page: 60,
            ..LayoutConfig::default()
        };
        assert!(check_capacity(&crowded).unwrap_err().is_configuration());

        let a5 = LayoutConfig {
            page_width_pt: 420.0,
            page_height_pt: 595.0,
            ..LayoutConfig::default()
        };
        assert_eq!(max_entries_per_page(&a5), 22);
        let err = check_capacity(&a5).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("at most 22"));
    }

    #[test]
    fn full_page_of_category_lines_renders() {
        use dossier_pdf::{LopdfRenderer, PageRenderer, page_text};

        let layout = LayoutConfig {
            toc_entries_per_page: max_entries_per_page(&LayoutConfig::default()),
            ..LayoutConfig::default()
        };
        let per_page = layout.toc_entries_per_page;
        let categories = (0..per_page)
            .map(|i| CategoryEntry {
                id: CategoryId::Other,
                display_name: format!("Section {i}"),
                start_page: 3 + i,
                documents: Vec::new(),
            })
            .collect();
        let plan = PaginationPlan {
            toc_start_page: 2,
            toc_page_count: 1,
            body_start_page: 3,
            categories,
            summary_page: 3 + per_page,
            total_pages: 3 + per_page,
        };

        let pages = render_toc(&plan, &layout);
        assert_eq!(pages.len(), 1);

        let doc = LopdfRenderer::from_layout(&layout).render(&pages[0]).unwrap();
        let text = page_text(&doc, 1).unwrap();
        assert!(text.contains(&format!("{per_page}. Section {}", per_page - 1)));
    }

    #[test]
    fn output_matches_reserved_page_count() {
        let mut plan = make_plan();
        plan.toc_page_count = 2;
        let pages = render_toc(&plan, &LayoutConfig::default());
        assert_eq!(pages.len(), 2);
    }
}
