//! Page-rendering primitive: structured layout instructions in, one-page PDF out.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, StringFormat, Stream, dictionary};

use dossier_shared::{DossierError, LayoutConfig, Result};

use crate::text::{encode_win_ansi, text_width, wrap_text};

// ---------------------------------------------------------------------------
// Layout instructions
// ---------------------------------------------------------------------------

/// Typographic role of a line of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    Title,
    Heading,
    Strong,
    Body,
    Muted,
}

impl TextStyle {
    pub fn size(self) -> f32 {
        match self {
            Self::Title => 24.0,
            Self::Heading => 16.0,
            Self::Strong | Self::Body => 11.0,
            Self::Muted => 9.0,
        }
    }

    pub fn bold(self) -> bool {
        matches!(self, Self::Title | Self::Heading | Self::Strong)
    }

    /// Vertical advance of one line in this style.
    pub fn leading(self) -> f32 {
        self.size() * 1.45
    }
}

/// Vertical space a [`Block::Rule`] takes, gap above and below included.
pub const RULE_HEIGHT: f32 = 12.0;

/// One element of a page, laid out top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Left-aligned text, wrapped to the printable width unless `trailing` is set.
    /// `trailing` is drawn right-aligned on the same baseline.
    Text {
        text: String,
        trailing: Option<String>,
        style: TextStyle,
        indent: f32,
    },
    /// Thin horizontal rule across the printable width.
    Rule,
    /// Vertical gap in points.
    Space(f32),
}

/// Structured description of a single page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSpec {
    pub blocks: Vec<Block>,
    /// Centered text at the bottom margin.
    pub footer: Option<String>,
}

impl PageSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(self, text: impl Into<String>) -> Self {
        self.text(TextStyle::Title, text)
    }

    pub fn heading(self, text: impl Into<String>) -> Self {
        self.text(TextStyle::Heading, text)
    }

    pub fn text(mut self, style: TextStyle, text: impl Into<String>) -> Self {
        self.blocks.push(Block::Text {
            text: text.into(),
            trailing: None,
            style,
            indent: 0.0,
        });
        self
    }

    /// A single line with a right-aligned trailing column (e.g. a page reference).
    pub fn entry(
        mut self,
        style: TextStyle,
        indent: f32,
        text: impl Into<String>,
        trailing: impl Into<String>,
    ) -> Self {
        self.blocks.push(Block::Text {
            text: text.into(),
            trailing: Some(trailing.into()),
            style,
            indent,
        });
        self
    }

    pub fn rule(mut self) -> Self {
        self.blocks.push(Block::Rule);
        self
    }

    pub fn space(mut self, points: f32) -> Self {
        self.blocks.push(Block::Space(points));
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Renders a [`PageSpec`] into a standalone single-page document.
pub trait PageRenderer: Send + Sync {
    fn render(&self, page: &PageSpec) -> Result<Document>;
}

/// [`PageRenderer`] drawing with the built-in Helvetica fonts via lopdf.
#[derive(Debug, Clone)]
pub struct LopdfRenderer {
    width: f32,
    height: f32,
    margin: f32,
}

impl LopdfRenderer {
    pub fn new(width: f32, height: f32, margin: f32) -> Self {
        Self {
            width,
            height,
            margin,
        }
    }

    pub fn from_layout(layout: &LayoutConfig) -> Self {
        Self::new(layout.page_width_pt, layout.page_height_pt, layout.margin_pt)
    }

    fn printable_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    /// Lay out blocks into content-stream operations.
    ///
    /// Content that would run past the bottom margin is a [`DossierError::Render`].
    fn operations(&self, page: &PageSpec) -> Result<Vec<Operation>> {
        let mut ops = Vec::new();
        let left = self.margin;
        let right = self.width - self.margin;
        let floor = self.margin;
        let mut y = self.height - self.margin;

        for block in &page.blocks {
            match block {
                Block::Space(points) => y -= points,
                Block::Rule => {
                    y -= RULE_HEIGHT / 2.0;
                    ops.push(Operation::new("w", vec![0.5_f32.into()]));
                    ops.push(Operation::new("m", vec![left.into(), y.into()]));
                    ops.push(Operation::new("l", vec![right.into(), y.into()]));
                    ops.push(Operation::new("S", vec![]));
                    y -= RULE_HEIGHT / 2.0;
                }
                Block::Text {
                    text,
                    trailing,
                    style,
                    indent,
                } => {
                    let size = style.size();
                    let bold = style.bold();
                    let x = left + indent;

                    let lines = match trailing {
                        Some(_) => vec![text.clone()],
                        None => wrap_text(text, self.printable_width() - indent, size, bold),
                    };

                    for (i, line) in lines.iter().enumerate() {
                        y -= style.leading();
                        if y < floor {
                            return Err(DossierError::render(format!(
                                "page content overflows the printable area: {} line(s) from {:?} do not fit",
                                lines.len() - i,
                                excerpt(line),
                            )));
                        }
                        ops.extend(show_text(line, x, y, size, bold));
                    }

                    if let Some(trailing) = trailing {
                        let tx = right - text_width(trailing, size, bold);
                        ops.extend(show_text(trailing, tx, y, size, bold));
                    }
                }
            }
        }

        if let Some(footer) = &page.footer {
            let size = TextStyle::Muted.size();
            let x = (self.width - text_width(footer, size, false)) / 2.0;
            ops.extend(show_text(footer, x, self.margin / 2.0, size, false));
        }

        Ok(ops)
    }
}

impl PageRenderer for LopdfRenderer {
    fn render(&self, page: &PageSpec) -> Result<Document> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = doc.add_object(font_dictionary("Helvetica"));
        let bold_id = doc.add_object(font_dictionary("Helvetica-Bold"));
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => regular_id,
                "F2" => bold_id,
            },
        });

        let content = Content {
            operations: self.operations(page)?,
        };
        let encoded = content
            .encode()
            .map_err(|e| DossierError::render(format!("failed to encode page content: {e}")))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), self.width.into(), self.height.into()],
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        Ok(doc)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn font_dictionary(base_font: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
        "Encoding" => "WinAnsiEncoding",
    }
}

fn excerpt(line: &str) -> String {
    line.chars().take(40).collect()
}

fn show_text(text: &str, x: f32, y: f32, size: f32, bold: bool) -> Vec<Operation> {
    let font = if bold { "F2" } else { "F1" };
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![font.into(), size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
    ]
}
