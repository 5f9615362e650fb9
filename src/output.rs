//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Styles
//!
//! ```text
//! Mustaches
//! 001 ♛ Classic (classic)
//! 002 ★ Handlebar (handlebar)
//!
//! Accessories
//! 001 ◉ Monocle (monocle) [face]
//! ```
//!
//! ## Apply
//!
//! ```text
//! Photo 640x480, 2 face(s)
//! 001 face 1 at (212.0, 301.5) 96.0x38.4
//! 002 default at (272.0, 264.0) 96.0x38.4 rotated 15°
//! Wrote distinguished-photo.png
//! ```
//!
//! ## Batch
//!
//! ```text
//! Decorating 3 photos
//!     001 beach.jpg → beach-distinguished.png (1 face)
//!     002 party.webp → 2024/party-distinguished.png (no detector)
//!     003 broken.jpg failed: Decode failed: ...
//! Done: 2 decorated, 1 failed, 1 face
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects. Notices go to stderr so
//! stdout stays clean for JSON output.

use crate::batch::{BatchEvent, BatchSummary, DetectionStatus};
use crate::catalog::OverlayStyle;
use crate::editor::{Notice, NoticeLevel};
use crate::types::Placement;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// Styles
// ============================================================================

fn style_line(index: usize, style: &OverlayStyle) -> String {
    let mut line = format!(
        "{} {} {} ({})",
        format_index(index),
        style.icon_glyph,
        style.display_name,
        style.id
    );
    if let Some(category) = style.category {
        line.push_str(&format!(" [{category}]"));
    }
    line
}

/// Format both style catalogs.
pub fn format_styles(mustaches: &[OverlayStyle], accessories: &[OverlayStyle]) -> Vec<String> {
    let mut lines = vec!["Mustaches".to_string()];
    lines.extend(
        mustaches
            .iter()
            .enumerate()
            .map(|(i, s)| style_line(i + 1, s)),
    );
    lines.push(String::new());
    lines.push("Accessories".to_string());
    lines.extend(
        accessories
            .iter()
            .enumerate()
            .map(|(i, s)| style_line(i + 1, s)),
    );
    lines
}

pub fn print_styles(mustaches: &[OverlayStyle], accessories: &[OverlayStyle]) {
    for line in format_styles(mustaches, accessories) {
        println!("{}", line);
    }
}

// ============================================================================
// Apply
// ============================================================================

/// One line per placement.
pub fn format_placement(index: usize, placement: &Placement) -> String {
    let owner = match placement.face_index {
        Some(face) => format!("face {}", face + 1),
        None => "default".to_string(),
    };
    let mut line = format!(
        "{} {} at ({:.1}, {:.1}) {:.1}x{:.1}",
        format_index(index),
        owner,
        placement.x,
        placement.y,
        placement.width,
        placement.height
    );
    if placement.rotation != 0.0 {
        line.push_str(&format!(" rotated {}°", placement.rotation));
    }
    line
}

/// Summary of an `apply` run.
pub fn format_apply_output(
    dimensions: (u32, u32),
    faces: usize,
    placements: &[Placement],
    written: &Path,
) -> Vec<String> {
    let mut lines = vec![format!(
        "Photo {}x{}, {} face(s)",
        dimensions.0, dimensions.1, faces
    )];
    lines.extend(
        placements
            .iter()
            .enumerate()
            .map(|(i, p)| format_placement(i + 1, p)),
    );
    lines.push(format!("Wrote {}", written.display()));
    lines
}

pub fn print_apply_output(
    dimensions: (u32, u32),
    faces: usize,
    placements: &[Placement],
    written: &Path,
) {
    for line in format_apply_output(dimensions, faces, placements, written) {
        println!("{}", line);
    }
}

// ============================================================================
// Notices
// ============================================================================

pub fn format_notice(notice: &Notice) -> String {
    let marker = match notice.level {
        NoticeLevel::Info => "*",
        NoticeLevel::Error => "!",
    };
    format!("{marker} {} - {}", notice.title, notice.description)
}

/// Print notices to stderr.
pub fn print_notices(notices: &[Notice]) {
    for notice in notices {
        eprintln!("{}", format_notice(notice));
    }
}

// ============================================================================
// Batch
// ============================================================================

fn detection_label(status: DetectionStatus) -> String {
    match status {
        DetectionStatus::Found(n) => plural(n, "face"),
        DetectionStatus::Unavailable => "no detector".to_string(),
        DetectionStatus::Failed => "detection failed".to_string(),
    }
}

/// Format a single batch progress event as display lines.
///
/// Paths are shown relative to `output_dir` when possible.
pub fn format_batch_event(event: &BatchEvent, output_dir: &Path) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => vec![format!("Decorating {}", plural(*total, "photo"))],
        BatchEvent::ImageDone {
            index,
            source,
            output,
            detection,
            ..
        } => {
            let shown = output.strip_prefix(output_dir).unwrap_or(output);
            vec![format!(
                "{}{} {} \u{2192} {} ({})",
                indent(1),
                format_index(*index),
                file_name(source),
                shown.display(),
                detection_label(*detection)
            )]
        }
        BatchEvent::ImageFailed {
            index,
            source,
            error,
        } => vec![format!(
            "{}{} {} failed: {}",
            indent(1),
            format_index(*index),
            file_name(source),
            error
        )],
    }
}

pub fn format_batch_summary(summary: &BatchSummary) -> String {
    format!(
        "Done: {} decorated, {} failed, {}",
        summary.processed,
        summary.failed,
        plural(summary.faces, "face")
    )
}
