use crate::output::Output;
use cinelist_core::{ItemSnapshot, MembershipState};
use comfy_table::{presets::UTF8_FULL, modifiers::UTF8_ROUND_CORNERS, Attribute, Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal() && std::io::stderr().is_terminal()
}

/// Spinner shown while a request is in flight. Without a terminal (or in
/// JSON/quiet mode) progress goes to the structured log instead.
pub struct PendingSpinner {
    bar: Option<ProgressBar>,
}

impl PendingSpinner {
    pub fn start(output: &Output, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if !(is_interactive() && output.is_human() && !output.is_quiet()) {
            tracing::info!(operation = "pending", message = %msg, "Waiting for the watchlist service");
            return Self { bar: None };
        }

        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }
        bar.set_message(msg);
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar: Some(bar) }
    }

    pub fn finish(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

fn state_color(state: MembershipState) -> Color {
    match state {
        MembershipState::Present => Color::Green,
        MembershipState::Absent => Color::Reset,
        MembershipState::Error => Color::Red,
        _ => Color::Yellow,
    }
}

pub fn state_marker(state: MembershipState) -> &'static str {
    match state {
        MembershipState::Present => "✓",
        MembershipState::Absent => " ",
        MembershipState::Error => "✗",
        _ => "…",
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.apply_modifier(UTF8_ROUND_CORNERS);
    table
}

pub fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).add_attribute(Attribute::Bold))
        .collect()
}

pub fn snapshot_table(snapshots: &[ItemSnapshot]) -> Table {
    let mut table = new_table();
    table.set_header(header(&["ID", "Title", "Status", "Notice"]));
    for snapshot in snapshots {
        table.add_row(vec![
            Cell::new(snapshot.movie_id),
            Cell::new(&snapshot.title),
            Cell::new(format!("{} {}", state_marker(snapshot.state), snapshot.state))
                .fg(state_color(snapshot.state)),
            Cell::new(snapshot.notice.as_ref().map(|n| n.message.as_str()).unwrap_or("")),
        ]);
    }
    table
}

pub fn list_table(columns: &[&str]) -> Table {
    let mut table = new_table();
    table.set_header(header(columns));
    table
}

pub fn render_snapshots(output: &Output, snapshots: &[ItemSnapshot]) {
    if !output.is_human() {
        output.data(&snapshots);
        return;
    }
    if output.is_quiet() {
        return;
    }
    println!("{}", snapshot_table(snapshots));
}

/// One-line label for the browse menu
pub fn menu_label(snapshot: &ItemSnapshot) -> String {
    let mut label = format!(
        "[{}] {} (#{}) {}",
        state_marker(snapshot.state),
        snapshot.title,
        snapshot.movie_id,
        snapshot.state
    );
    if let Some(notice) = &snapshot.notice {
        label.push_str(&format!(" - {}", notice.message));
    }
    label
}

/// Mask a secret for display, keeping two characters at each end
pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<not set>".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}
