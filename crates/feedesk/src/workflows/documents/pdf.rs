use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use super::text::{latin1_bytes, pdf_safe};
use super::DocumentError;

/// A4 portrait, in points.
pub(crate) const PAGE_WIDTH: f32 = 595.0;
pub(crate) const PAGE_HEIGHT: f32 = 842.0;
pub(crate) const MARGIN: f32 = 28.0;

/// Average Helvetica advance as a fraction of the font size.
const AVERAGE_GLYPH_WIDTH: f32 = 0.5;

const FONT_KEY: &str = "F1";

/// Minimal text-and-rule page builder over lopdf using the built-in Helvetica font.
///
/// Output carries no timestamps or ids, so identical drawing calls give identical bytes.
#[derive(Debug, Default)]
pub(crate) struct PdfCanvas {
    pages: Vec<Vec<Operation>>,
}

impl PdfCanvas {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn new_page(&mut self) {
        self.pages.push(Vec::new());
    }

    fn current(&mut self) -> &mut Vec<Operation> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Writes one line of text with its baseline at `y` (measured from the page bottom).
    pub(crate) fn text(&mut self, x: f32, y: f32, size: f32, text: &str) {
        let encoded = latin1_bytes(&pdf_safe(text));
        self.current().extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(FONT_KEY.as_bytes().to_vec()), size.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(encoded)]),
            Operation::new("ET", vec![]),
        ]);
    }

    /// Text centred horizontally on the page, using the average glyph width.
    pub(crate) fn centered_text(&mut self, y: f32, size: f32, text: &str) {
        let width = text_width(&pdf_safe(text), size);
        let x = ((PAGE_WIDTH - width) / 2.0).max(MARGIN);
        self.text(x, y, size, text);
    }

    /// Stroked rectangle with its lower-left corner at (`x`, `y`).
    pub(crate) fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.current().extend([
            Operation::new("re", vec![x.into(), y.into(), width.into(), height.into()]),
            Operation::new("S", vec![]),
        ]);
    }

    pub(crate) fn finish(self) -> Result<Vec<u8>, DocumentError> {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let font_id = document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = document.add_object(dictionary! {
            "Font" => dictionary! { FONT_KEY => font_id },
        });

        let mut pages = self.pages;
        if pages.is_empty() {
            pages.push(Vec::new());
        }

        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
        for operations in pages {
            let content = Content { operations }
                .encode()
                .map_err(|err| DocumentError::Pdf(err.to_string()))?;
            let content_id = document.add_object(Stream::new(dictionary! {}, content));
            let page_id: ObjectId = document.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::from(PAGE_WIDTH),
                    Object::from(PAGE_HEIGHT),
                ],
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);
        document.compress();

        let mut bytes = Vec::new();
        document
            .save_to(&mut bytes)
            .map_err(|err| DocumentError::Pdf(err.to_string()))?;
        Ok(bytes)
    }
}

pub(crate) fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * AVERAGE_GLYPH_WIDTH
}

/// Cuts `text` so it fits in `width` points at `size`.
pub(crate) fn fit_to_width(text: &str, width: f32, size: f32) -> String {
    let max_chars = (width / (size * AVERAGE_GLYPH_WIDTH)).floor().max(0.0) as usize;
    text.chars().take(max_chars).collect()
}
