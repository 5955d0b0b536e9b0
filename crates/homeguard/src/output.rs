//! Output formatting: table, JSON, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use homeguard_core::BridgeStatus;

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// One-word bridge status, colored when enabled.
pub fn status_label(status: &BridgeStatus, color: bool) -> String {
    let (word, paint): (&str, fn(&str) -> String) = match status {
        BridgeStatus::Uninitialized => ("UNKNOWN", |s| s.dimmed().to_string()),
        BridgeStatus::Online => ("ONLINE", |s| s.green().bold().to_string()),
        BridgeStatus::Offline { .. } => ("OFFLINE", |s| s.red().bold().to_string()),
    };
    if color { paint(word) } else { word.to_owned() }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item views don't use
/// the `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Plain => id_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.unwrap_or_else(|e| format!("{{\"error\":\"serialization failed: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Item {
        id: &'static str,
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "ID")]
        id: &'static str,
    }

    fn render(format: &OutputFormat) -> String {
        let items = [Item { id: "a" }, Item { id: "b" }];
        render_list(format, &items, |i| Row { id: i.id }, |i| i.id.to_owned())
    }

    #[test]
    fn plain_lists_one_id_per_line() {
        assert_eq!(render(&OutputFormat::Plain), "a\nb");
    }

    #[test]
    fn compact_json_is_single_line() {
        assert_eq!(render(&OutputFormat::JsonCompact), r#"[{"id":"a"},{"id":"b"}]"#);
    }

    #[test]
    fn table_has_header() {
        assert!(render(&OutputFormat::Table).contains("ID"));
    }

    #[test]
    fn status_label_without_color() {
        assert_eq!(status_label(&BridgeStatus::Online, false), "ONLINE");
        let offline = BridgeStatus::Offline {
            detail: homeguard_core::StatusDetail::CommunicationError,
            message: "down".into(),
        };
        assert_eq!(status_label(&offline, false), "OFFLINE");
    }
}
