//! PDF export of generated documents
//!
//! Documents are laid out on A4 pages with the standard Helvetica fonts, so
//! no font data has to be embedded: the title is bold 16pt and centered, the
//! body is 12pt, word-wrapped and flows over as many pages as needed.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::workflow::Session;

/// Errors produced while exporting documents
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Nothing to export yet: {0}")]
    NotReady(&'static str),
}

fn pdf_error(e: impl fmt::Display) -> ExportError {
    ExportError::Pdf(e.to_string())
}

// Page geometry in millimetres
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 10.0;
const USABLE_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const TITLE_LINE_HEIGHT: f32 = 10.0;
const TITLE_GAP: f32 = 10.0;
const BODY_LINE_HEIGHT: f32 = 6.0;

// Font sizes in points
const TITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 12.0;

// Average advance of Helvetica glyphs in ems, used to size wrapped lines
const REGULAR_EM: f32 = 0.5;
const BOLD_EM: f32 = 0.56;

const PT_PER_MM: f32 = 72.0 / 25.4;
const LAYER: &str = "Text";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Title,
    Body,
}

impl Style {
    fn size(self) -> f32 {
        match self {
            Style::Title => TITLE_SIZE,
            Style::Body => BODY_SIZE,
        }
    }

    fn em(self) -> f32 {
        match self {
            Style::Title => BOLD_EM,
            Style::Body => REGULAR_EM,
        }
    }

    /// Characters that fit on one line
    fn columns(self) -> usize {
        ((USABLE_WIDTH * PT_PER_MM) / (self.size() * self.em())).floor() as usize
    }

    /// Estimated rendered width of `text` in millimetres
    fn width(self, text: &str) -> f32 {
        text.chars().count() as f32 * self.size() * self.em() / PT_PER_MM
    }
}

/// A line of text at its final position on a page
#[derive(Debug, Clone, PartialEq)]
struct PlacedLine {
    style: Style,
    x: f32,
    y: f32,
    text: String,
}

/// Stacks lines top to bottom, starting a new page when one fills up
struct Pages {
    pages: Vec<Vec<PlacedLine>>,
    y: f32,
}

impl Pages {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn place(&mut self, style: Style, x: f32, line_height: f32, text: String) {
        if self.y - line_height < MARGIN {
            self.pages.push(Vec::new());
            self.y = PAGE_HEIGHT - MARGIN;
        }
        self.y -= line_height;

        // Blank lines only take up space
        if text.trim().is_empty() {
            return;
        }
        if let Some(page) = self.pages.last_mut() {
            page.push(PlacedLine {
                style,
                x,
                y: self.y,
                text,
            });
        }
    }

    fn skip(&mut self, height: f32) {
        self.y = (self.y - height).max(MARGIN);
    }
}

/// Replace characters the standard fonts cannot show
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\t' => ' ',
            '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            ' '..='~' | '\u{A0}'..='\u{FF}' => c,
            _ => '?',
        })
        .collect()
}

fn layout(title: &str, body: &str) -> Vec<Vec<PlacedLine>> {
    let mut pages = Pages::new();

    for line in textwrap::wrap(&sanitize(title), Style::Title.columns()) {
        let x = MARGIN + ((USABLE_WIDTH - Style::Title.width(&line)) / 2.0).max(0.0);
        pages.place(Style::Title, x, TITLE_LINE_HEIGHT, line.into_owned());
    }
    pages.skip(TITLE_GAP);

    for paragraph in body.lines() {
        for line in textwrap::wrap(&sanitize(paragraph), Style::Body.columns()) {
            pages.place(Style::Body, MARGIN, BODY_LINE_HEIGHT, line.into_owned());
        }
    }

    pages.pages
}

/// Render a titled text document as PDF bytes
pub fn render_pdf(title: &str, body: &str) -> Result<Vec<u8>, ExportError> {
    let pages = layout(title, body);

    let (doc, first_page, first_layer) =
        PdfDocument::new(sanitize(title), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;

    let mut first = Some((first_page, first_layer));
    for lines in &pages {
        let (page, layer) = first
            .take()
            .unwrap_or_else(|| doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER));
        let layer = doc.get_page(page).get_layer(layer);

        for line in lines {
            let font: &IndirectFontRef = match line.style {
                Style::Title => &bold,
                Style::Body => &regular,
            };
            layer.use_text(
                line.text.as_str(),
                line.style.size(),
                Mm(line.x),
                Mm(line.y),
                font,
            );
        }
    }

    doc.save_to_bytes().map_err(pdf_error)
}

/// A document ready to be rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub body: String,
    pub file_name: &'static str,
}

impl Document {
    pub fn to_pdf(&self) -> Result<Vec<u8>, ExportError> {
        render_pdf(&self.title, &self.body)
    }

    /// Render and write the document into `dir`, returning the file path
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name);
        let bytes = self.to_pdf()?;
        fs::write(&path, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "Exported document");
        Ok(path)
    }
}

/// The literature summary of the approved idea
pub fn summary_document(session: &Session) -> Result<Document, ExportError> {
    let summary = session
        .literature_summary
        .as_ref()
        .ok_or(ExportError::NotReady("no literature summary has been generated"))?;

    Ok(Document {
        title: "Literature Summary".to_string(),
        body: summary.clone(),
        file_name: "literature_summary.pdf",
    })
}

/// The complete proposal: idea, summary, properties and overview
pub fn proposal_document(session: &Session) -> Result<Document, ExportError> {
    let not_ready = ExportError::NotReady("the proposal overview has not been compiled");
    let (Some(idea), Some(summary), Some(properties), Some(overview)) = (
        session.approved_idea.as_deref(),
        session.literature_summary.as_deref(),
        session.properties.as_deref(),
        session.final_response.as_deref(),
    ) else {
        return Err(not_ready);
    };

    Ok(Document {
        title: "Final Research Proposal".to_string(),
        body: format!(
            "Research Idea: {}\n\nLiterature Summary:\n{}\n\nProperties/Approach:\n{}\n\nFinal Proposal Overview:\n{}",
            idea, summary, properties, overview
        ),
        file_name: "research_proposal.pdf",
    })
}
