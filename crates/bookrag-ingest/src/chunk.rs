//! Markdown-aware text chunking
//!
//! Splits a document into bounded-size chunks with overlap. Markdown
//! headings delimit sections, and each chunk carries the nearest
//! preceding heading as its section label. Within a section, chunks
//! prefer to break at paragraph or sentence boundaries.

use bookrag_core::{DocumentChunk, IngestConfig};

/// A section of a document delimited by headings
#[derive(Debug)]
struct Section {
    title: Option<String>,
    content: String,
}

/// Split a markdown document into chunks.
///
/// `default_section` labels content that appears before the first heading
/// (typically the file stem). Chunk indices are assigned across the whole
/// document, so chunk ids stay stable as long as the content does.
pub fn chunk_markdown(
    source_path: &str,
    text: &str,
    default_section: &str,
    config: &IngestConfig,
) -> Vec<DocumentChunk> {
    let mut chunks = Vec::new();
    let mut index = 0u32;

    for section in split_sections(text) {
        let label = section.title.as_deref().unwrap_or(default_section);

        for piece in chunk_text(&section.content, config) {
            chunks.push(DocumentChunk::new(source_path, index, piece, label));
            index += 1;
        }
    }

    chunks
}

/// Split text on markdown headings, keeping the heading text as the title
fn split_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = Section {
        title: None,
        content: String::new(),
    };

    for line in text.lines() {
        if let Some(title) = heading_title(line) {
            if !current.content.trim().is_empty() {
                sections.push(current);
            }
            current = Section {
                title: Some(title),
                content: String::new(),
            };
        } else {
            current.content.push_str(line);
            current.content.push('\n');
        }
    }

    if !current.content.trim().is_empty() {
        sections.push(current);
    }

    sections
}

/// Extract the title from an ATX heading line (`# Title` through `###### Title`)
fn heading_title(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();

    if (1..=6).contains(&hashes) {
        let rest = trimmed[hashes..].trim();
        if !rest.is_empty() {
            return Some(rest.to_string());
        }
    }
    None
}

/// Chunk a text string into bounded pieces with overlap
fn chunk_text(text: &str, config: &IngestConfig) -> Vec<String> {
    let text = text.trim();
    let mut pieces = Vec::new();

    if text.is_empty() {
        return pieces;
    }

    if text.len() <= config.chunk_size {
        if text.len() >= config.min_chunk_size {
            pieces.push(text.to_string());
        }
        return pieces;
    }

    let mut start = 0;

    while start < text.len() {
        let end = prev_char_boundary(text, (start + config.chunk_size).min(text.len()));
        let mut actual_end = find_break_point(text, start, end);

        // Degenerate sizes (or a boundary step-back) can pin the end to
        // the start; the scan must still advance at least one character
        if actual_end <= start {
            actual_end = next_char_boundary(text, start + 1);
        }

        let piece = text[start..actual_end].trim();
        if piece.len() >= config.min_chunk_size {
            pieces.push(piece.to_string());
        }

        if actual_end >= text.len() {
            break;
        }

        // Step back by the overlap for the next chunk
        let next = if actual_end > start + config.chunk_overlap {
            prev_char_boundary(text, actual_end - config.chunk_overlap)
        } else {
            actual_end
        };
        // The boundary adjustment must not stall the scan
        start = if next > start { next } else { actual_end };
    }

    pieces
}

/// Find a natural break point near the target position.
///
/// Prefers a paragraph break, then a sentence end, then a line break
/// within a small window behind the target.
fn find_break_point(text: &str, start: usize, target: usize) -> usize {
    if target >= text.len() {
        return text.len();
    }

    let window_start = prev_char_boundary(text, target.saturating_sub(100).max(start));
    let window = &text[window_start..target];

    if let Some(pos) = window.rfind("\n\n") {
        return window_start + pos + 2;
    }

    for pattern in [". ", "! ", "? "] {
        if let Some(pos) = window.rfind(pattern) {
            return window_start + pos + pattern.len();
        }
    }

    if let Some(pos) = window.rfind('\n') {
        return window_start + pos + 1;
    }

    target
}

/// Step an index back to the nearest char boundary
fn prev_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Step an index forward to the nearest char boundary
fn next_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index.min(text.len())
}
