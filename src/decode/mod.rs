// src/decode/mod.rs
//! Binary résumé formats to plain text.
//!
//! PDF goes through pdf-extract, DOCX through docx-rs. Both libraries are
//! synchronous, so decoding runs on the blocking pool.

use crate::utils::error::DecodeError;
use docx_rs::{DocumentChild, ParagraphChild, RunChild, TableCellContent, TableChild, TableRowChild};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Picks the format from the file extension (case-insensitive).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "docx" => Ok(DocumentFormat::Docx),
            _ => Err(DecodeError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

/// Decodes document bytes into newline-separated text.
pub async fn decode_document(bytes: Vec<u8>, format: DocumentFormat) -> Result<String, DecodeError> {
    let size = bytes.len();
    let text = tokio::task::spawn_blocking(move || match format {
        DocumentFormat::Pdf => decode_pdf(&bytes),
        DocumentFormat::Docx => decode_docx(&bytes),
    })
    .await
    .map_err(|e| DecodeError::Task(e.to_string()))??;

    tracing::info!("Decoded {:?} document: {} bytes -> {} chars of text", format, size, text.chars().count());
    Ok(text)
}

fn decode_pdf(bytes: &[u8]) -> Result<String, DecodeError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| DecodeError::Pdf(e.to_string()))
}

fn decode_docx(bytes: &[u8]) -> Result<String, DecodeError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| DecodeError::Docx(e.to_string()))?;

    let mut lines: Vec<String> = Vec::new();
    for child in docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => lines.push(paragraph_text(&p)),
            DocumentChild::Table(t) => {
                for row in &t.rows {
                    let TableChild::TableRow(r) = row;
                    for cell in &r.cells {
                        let TableRowChild::TableCell(c) = cell;
                        for content in &c.children {
                            if let TableCellContent::Paragraph(p) = content {
                                lines.push(paragraph_text(p));
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    Ok(lines.join("\n"))
}

fn paragraph_text(p: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &p.children {
        match child {
            ParagraphChild::Run(r) => push_run(&mut text, r),
            ParagraphChild::Hyperlink(h) => {
                for inner in &h.children {
                    if let ParagraphChild::Run(r) = inner {
                        push_run(&mut text, r);
                    }
                }
            }
            _ => {}
        }
    }
    text
}

fn push_run(text: &mut String, run: &docx_rs::Run) {
    for child in &run.children {
        match child {
            RunChild::Text(t) => text.push_str(&t.text),
            RunChild::Tab(_) => text.push('\t'),
            RunChild::Break(_) => text.push('\n'),
            _ => {}
        }
    }
}
