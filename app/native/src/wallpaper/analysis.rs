//! Theme resolution: tool output parsing and the filename/clock fallback.

use std::path::Path;

use chrono::Timelike;

use super::tool::ToolError;
use super::types::{ThemeAnalysis, ThemeMode, ThemeScheme};

/// Filename hints that classify a wallpaper as light.
const LIGHT_HINTS: &[&str] = &["light", "day", "bright"];

/// Filename hints that classify a wallpaper as dark.
const DARK_HINTS: &[&str] = &["dark", "night", "moon"];

/// Filename hints that select the neutral scheme.
const NEUTRAL_HINTS: &[&str] = &["neutral", "gray", "grey", "mono", "black", "white"];

/// First and last-exclusive local hours treated as daytime.
const DAYTIME_HOURS: std::ops::Range<u32> = 6..18;

/// Where a resolved analysis came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisSource {
    /// Parsed from the theme tool's output.
    Tool,
    /// Produced by the filename/clock heuristic; carries the reason the tool result was unusable.
    Fallback(String),
}

/// Parses the theme tool's free-text output.
///
/// Each line is checked for `light`/`dark` and `neutral`/`rainbow`; later lines
/// win. Returns `None` when no line carries any of those tokens.
#[must_use]
pub fn parse_theme_output(output: &str) -> Option<ThemeAnalysis> {
    let mut mode = None;
    let mut scheme = None;

    for line in output.trim().lines() {
        if line.contains("light") {
            mode = Some(ThemeMode::Light);
        } else if line.contains("dark") {
            mode = Some(ThemeMode::Dark);
        }

        if line.contains("neutral") {
            scheme = Some(ThemeScheme::Neutral);
        } else if line.contains("rainbow") {
            scheme = Some(ThemeScheme::Rainbow);
        }
    }

    if mode.is_none() && scheme.is_none() {
        return None;
    }

    Some(ThemeAnalysis::classified(
        mode.unwrap_or(ThemeMode::Dark),
        scheme.unwrap_or(ThemeScheme::Rainbow),
    ))
}

/// Classifies a wallpaper from its file name, using `hour` (local, 0-23) when
/// the name carries no light/dark hint.
#[must_use]
pub fn fallback_analysis(path: &Path, hour: u32) -> ThemeAnalysis {
    let basename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let has_hint = |hints: &[&str]| hints.iter().any(|hint| basename.contains(hint));

    let mode = if has_hint(LIGHT_HINTS) {
        ThemeMode::Light
    } else if has_hint(DARK_HINTS) {
        ThemeMode::Dark
    } else if DAYTIME_HOURS.contains(&hour) {
        ThemeMode::Light
    } else {
        ThemeMode::Dark
    };

    let scheme = if has_hint(NEUTRAL_HINTS) {
        ThemeScheme::Neutral
    } else {
        ThemeScheme::Rainbow
    };

    ThemeAnalysis::classified(mode, scheme)
}

/// Resolves the automatic analysis for `path` from a theme query result.
///
/// Never fails: unusable output or a failed query falls back to the heuristic.
pub fn resolve(path: &Path, output: Result<String, ToolError>) -> (ThemeAnalysis, AnalysisSource) {
    let reason = match output {
        Ok(text) => match parse_theme_output(&text) {
            Some(analysis) => return (analysis, AnalysisSource::Tool),
            None => "theme tool output had no recognizable theme".to_string(),
        },
        Err(err) => err.to_string(),
    };

    tracing::warn!(path = %path.display(), reason = %reason, "using fallback theme analysis");
    let hour = chrono::Local::now().hour();
    (fallback_analysis(path, hour), AnalysisSource::Fallback(reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_light_neutral() {
        let analysis = parse_theme_output("mode: light\nscheme: neutral\n").unwrap();
        assert_eq!(analysis.mode, ThemeMode::Light);
        assert_eq!(analysis.scheme, ThemeScheme::Neutral);
        assert_eq!(analysis.tone, 80);
        assert_eq!(analysis.chroma, 10);
    }

    #[test]
    fn test_parse_defaults_missing_half() {
        let analysis = parse_theme_output("scheme-rainbow").unwrap();
        assert_eq!(analysis.mode, ThemeMode::Dark);
        assert_eq!(analysis.scheme, ThemeScheme::Rainbow);
    }

    #[test]
    fn test_parse_later_lines_win() {
        let analysis = parse_theme_output("light\ndark").unwrap();
        assert_eq!(analysis.mode, ThemeMode::Dark);
    }

    #[test]
    fn test_parse_light_takes_precedence_on_same_line() {
        let analysis = parse_theme_output("light (was dark)").unwrap();
        assert_eq!(analysis.mode, ThemeMode::Light);
    }

    #[test]
    fn test_parse_rejects_unrecognized_output() {
        assert!(parse_theme_output("").is_none());
        assert!(parse_theme_output("error: no wallpaper cached").is_none());
    }

    #[test]
    fn test_fallback_dark_night() {
        let analysis = fallback_analysis(Path::new("/walls/dark-night.png"), 12);
        assert_eq!(analysis.mode, ThemeMode::Dark);
        assert_eq!(analysis.tone, 20);
    }

    #[test]
    fn test_fallback_bright_day() {
        let analysis = fallback_analysis(Path::new("/walls/bright-day.png"), 23);
        assert_eq!(analysis.mode, ThemeMode::Light);
        assert_eq!(analysis.tone, 80);
    }

    #[test]
    fn test_fallback_uses_hour_without_hint() {
        let path = Path::new("/walls/forest.jpg");
        assert_eq!(fallback_analysis(path, 6).mode, ThemeMode::Light);
        assert_eq!(fallback_analysis(path, 17).mode, ThemeMode::Light);
        assert_eq!(fallback_analysis(path, 18).mode, ThemeMode::Dark);
        assert_eq!(fallback_analysis(path, 2).mode, ThemeMode::Dark);
    }

    #[test]
    fn test_fallback_scheme_hints() {
        let mono = fallback_analysis(Path::new("/walls/Mono-City.PNG"), 12);
        assert_eq!(mono.scheme, ThemeScheme::Neutral);
        assert_eq!(mono.chroma, 10);

        let colorful = fallback_analysis(Path::new("/walls/sunset.png"), 12);
        assert_eq!(colorful.scheme, ThemeScheme::Rainbow);
        assert_eq!(colorful.chroma, 40);
    }

    #[test]
    fn test_fallback_only_inspects_file_name() {
        let analysis = fallback_analysis(Path::new("/home/light/walls/moon.png"), 12);
        assert_eq!(analysis.mode, ThemeMode::Dark);
    }

    #[test]
    fn test_resolve_prefers_tool_output() {
        let (analysis, source) =
            resolve(Path::new("/walls/bright-day.png"), Ok("dark\nneutral".to_string()));
        assert_eq!(source, AnalysisSource::Tool);
        assert_eq!(analysis.mode, ThemeMode::Dark);
    }

    #[test]
    fn test_resolve_falls_back_on_tool_error() {
        let err = ToolError::NotFound("chromash".into());
        let (analysis, source) = resolve(Path::new("/walls/dark-night.png"), Err(err));
        assert!(matches!(source, AnalysisSource::Fallback(_)));
        assert_eq!(analysis.mode, ThemeMode::Dark);
        assert_eq!(analysis.tone, 20);
    }

    #[test]
    fn test_resolve_falls_back_on_garbage_output() {
        let (analysis, source) =
            resolve(Path::new("/walls/bright-day.png"), Ok("???".to_string()));
        assert!(matches!(source, AnalysisSource::Fallback(_)));
        assert_eq!(analysis.mode, ThemeMode::Light);
    }
}
