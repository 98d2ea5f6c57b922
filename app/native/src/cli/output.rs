//! CLI output formatting.
//!
//! Tables for wallpaper listings, a compact theme summary and JSON syntax
//! highlighting for `--json` output.

use std::path::Path;

use colored::Colorize;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Modify, Style};
use tabled::{Table, Tabled};

use crate::wallpaper::{OverrideState, ThemeAnalysis, WallpaperEntry};

/// Widest display name shown in tables before truncation.
const NAME_WIDTH: usize = 40;

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Current")]
    current: String,
}

/// Prints entries as a table, marking the applied wallpaper.
pub fn print_entries(title: &str, entries: &[WallpaperEntry], current: Option<&Path>) {
    if entries.is_empty() {
        println!("{}", "No wallpapers found.".dimmed());
        return;
    }

    let rows: Vec<EntryRow> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| EntryRow {
            index: i + 1,
            name: truncate(&entry.display_name, NAME_WIDTH),
            path: entry.path().map(|p| p.display().to_string()).unwrap_or_default(),
            current: format_bool(current.is_some() && entry.path() == current),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::first()).with(Alignment::right()))
        .with(Modify::new(Columns::last()).with(Alignment::center()))
        .to_string();

    println!("{}", format!("{title} ({})", entries.len()).bold());
    println!("{table}");
}

/// Prints the effective theme of a wallpaper.
pub fn print_theme(path: &Path, analysis: &ThemeAnalysis, overrides: OverrideState) {
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());

    println!("{} {}", "Wallpaper:".bold(), name.green());
    println!(
        "  {:<8}{}",
        "Mode",
        annotate(analysis.mode.as_str(), overrides.mode.manual().is_some())
    );
    println!(
        "  {:<8}{}",
        "Scheme",
        annotate(analysis.scheme.as_str(), overrides.scheme.manual().is_some())
    );
    println!("  {:<8}{}", "Tone", analysis.tone.to_string().yellow());
    println!("  {:<8}{}", "Chroma", analysis.chroma.to_string().yellow());
}

fn annotate(value: &str, manual: bool) -> String {
    if manual {
        format!("{} {}", value.cyan(), "(manual)".dimmed())
    } else {
        value.cyan().to_string()
    }
}

/// Prints JSON with syntax highlighting.
///
/// Keys are cyan, strings green, numbers yellow, booleans and null magenta.
pub fn print_highlighted_json(value: &serde_json::Value) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    println!("{}", highlight_json(&json));
}

/// Colors a pretty-printed JSON document.
#[must_use]
pub fn highlight_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len() * 2);
    let mut token = String::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut is_key = false;
    let mut after_colon = false;

    for ch in json.chars() {
        if in_string {
            token.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                let colored = if is_key { token.cyan() } else { token.green() };
                out.push_str(&colored.to_string());
                token.clear();
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                push_scalar(&mut out, &mut token, after_colon);
                token.push(ch);
                in_string = true;
                is_key = !after_colon;
                after_colon = false;
            }
            ':' => {
                push_scalar(&mut out, &mut token, false);
                out.push(':');
                after_colon = true;
            }
            ',' => {
                push_scalar(&mut out, &mut token, after_colon);
                out.push(',');
                after_colon = false;
            }
            '{' | '}' | '[' | ']' => {
                push_scalar(&mut out, &mut token, after_colon);
                out.push_str(&ch.to_string().bold().to_string());
                after_colon = false;
            }
            _ => token.push(ch),
        }
    }

    push_scalar(&mut out, &mut token, after_colon);
    out
}

/// Appends a non-string token, coloring it when it is a value.
fn push_scalar(out: &mut String, token: &mut String, is_value: bool) {
    if token.is_empty() {
        return;
    }

    let value = token.trim();
    let start = token.len() - token.trim_start().len();
    let end = start + value.len();

    if !is_value || value.is_empty() {
        out.push_str(token);
    } else {
        out.push_str(&token[..start]);
        if matches!(value, "true" | "false" | "null") {
            out.push_str(&value.magenta().to_string());
        } else if value.parse::<f64>().is_ok() {
            out.push_str(&value.yellow().to_string());
        } else {
            out.push_str(value);
        }
        out.push_str(&token[end..]);
    }

    token.clear();
}

/// Truncates a string to a maximum number of characters, adding an ellipsis if needed.
#[must_use]
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars <= 1 {
        return "…".to_string();
    }

    let cut = s.char_indices().nth(max_chars - 1).map_or(s.len(), |(idx, _)| idx);
    format!("{}…", &s[..cut])
}

/// Formats a boolean as a check mark, or nothing.
#[must_use]
pub fn format_bool(value: bool) -> String {
    if value { "✓".green().to_string() } else { String::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate("forest", 10), "forest");
    }

    #[test]
    fn test_truncate_long_string() {
        assert_eq!(truncate("mountain lake", 8), "mountai…");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("été à la plage", 4), "été…");
        assert_eq!(truncate("abc", 1), "…");
    }

    #[test]
    fn test_highlight_json_keeps_content() {
        colored::control::set_override(false);
        let json = "{\n  \"name\": \"a.png\",\n  \"tone\": 80,\n  \"path\": null\n}";
        assert_eq!(highlight_json(json), json);
    }

    #[test]
    fn test_highlight_json_handles_escaped_quotes() {
        colored::control::set_override(false);
        let json = r#"{"name": "say \"hi\"", "ok": true}"#;
        assert_eq!(highlight_json(json), json);
    }

    #[test]
    fn test_format_bool() {
        assert!(format_bool(true).contains('✓'));
        assert!(format_bool(false).is_empty());
    }
}
