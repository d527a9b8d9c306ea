//! Plain-text rendering of a [`SessionView`].
//!
//! Every participant gets a letter in roster order. Confirmed marks show the
//! owner's letter, pending local intents show it in lowercase, and free cells
//! show a dot.

use std::collections::BTreeMap;
use std::fmt::Write;

use bingo_core::{CellView, Line, ParticipantId, SessionView};

fn glyphs(view: &SessionView) -> BTreeMap<ParticipantId, char> {
    view.participants
        .iter()
        .zip(('A'..='Z').cycle())
        .map(|(participant, glyph)| (participant.id, glyph))
        .collect()
}

fn cell_glyph(cell: &CellView, glyphs: &BTreeMap<ParticipantId, char>) -> char {
    match cell.owner {
        None if cell.pending => '_',
        None => '.',
        Some(owner) => {
            let glyph = glyphs.get(&owner).copied().unwrap_or('?');
            if cell.pending {
                glyph.to_ascii_lowercase()
            } else {
                glyph
            }
        }
    }
}

fn line_label(line: Line) -> String {
    match line {
        Line::Row(row) => format!("row {row}"),
        Line::Column(col) => format!("column {col}"),
        Line::Diagonal => "diagonal".to_string(),
        Line::AntiDiagonal => "anti-diagonal".to_string(),
    }
}

/// Renders the view as a multi-line string.
pub fn render(view: &SessionView) -> String {
    let glyphs = glyphs(view);
    let mut out = String::new();

    let _ = write!(
        out,
        "session {} | {} | {}",
        view.code, view.size, view.lifecycle
    );
    if view.stale {
        out.push_str(" | reconnecting");
    }
    out.push('\n');

    for row in &view.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| cell_glyph(cell, &glyphs).to_string())
            .collect();
        let _ = writeln!(out, "  {}", cells.join(" "));
    }

    for participant in &view.participants {
        let glyph = glyphs.get(&participant.id).copied().unwrap_or('?');
        let role: &str = participant.role.as_ref();
        let _ = writeln!(
            out,
            "  {glyph} {:<12} {:<9} {} marks={}{}",
            participant.display_name,
            role,
            participant.color,
            participant.marks,
            if participant.is_local { " (you)" } else { "" },
        );
    }

    for (owner, line) in &view.completed_lines {
        let glyph = glyphs.get(owner).copied().unwrap_or('?');
        let _ = writeln!(out, "  BINGO {glyph}: {}", line_label(*line));
    }

    let controls = view.controls;
    let enabled: Vec<&str> = [
        (controls.can_mark, "mark"),
        (controls.can_start, "start"),
        (controls.can_pause, "pause"),
        (controls.can_resume, "resume"),
        (controls.can_end, "end"),
    ]
    .into_iter()
    .filter_map(|(on, name)| on.then_some(name))
    .collect();
    let _ = writeln!(
        out,
        "  controls: {}",
        if enabled.is_empty() {
            "none".to_string()
        } else {
            enabled.join(", ")
        }
    );

    out
}
