use engine_logging::engine_debug;

pub const DEFAULT_HEADER_LINES: usize = 2;
pub const DEFAULT_MULTICAST_MARKER: &str = "-组播";

/// What to do with the multicast marker substring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerPolicy {
    /// Drop every line that contains the marker. A dropped group
    /// declaration takes its channel lines with it.
    #[default]
    DropLine,
    /// Remove the marker wherever it occurs and keep the line.
    Strip,
    /// Remove the marker from group declaration lines only.
    StripFromGroupNames,
    Keep,
}

#[derive(Debug, Clone)]
pub struct CleanOptions {
    pub header_lines: usize,
    pub marker: String,
    pub marker_policy: MarkerPolicy,
    /// Token identifying a group declaration, used by `StripFromGroupNames`.
    pub genre_marker: String,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            header_lines: DEFAULT_HEADER_LINES,
            marker: DEFAULT_MULTICAST_MARKER.to_string(),
            marker_policy: MarkerPolicy::default(),
            genre_marker: crate::parse::DEFAULT_GENRE_MARKER.to_string(),
        }
    }
}

/// Strip the header, apply the marker policy and drop blank lines.
///
/// A declaration is any line containing `genre_marker`.
///
/// Text shorter than the header yields no lines at all.
pub fn clean_lines(raw: &str, options: &CleanOptions) -> Vec<String> {
    let total = raw.lines().count();
    if total < options.header_lines {
        engine_debug!(
            "source has {} lines, fewer than the {} header lines",
            total,
            options.header_lines
        );
        return Vec::new();
    }

    let marker = options.marker.as_str();
    let genre = options.genre_marker.as_str();
    let is_declaration = |line: &str| !genre.is_empty() && line.contains(genre);
    let mut cleaned: Vec<String> = Vec::new();
    // Set while skipping the channels of a dropped multicast group.
    let mut in_dropped_group = false;

    for line in raw.lines().skip(options.header_lines) {
        if in_dropped_group && !is_declaration(line) {
            continue;
        }
        in_dropped_group = false;

        let kept = if marker.is_empty() {
            Some(line.to_string())
        } else {
            match options.marker_policy {
                MarkerPolicy::DropLine if line.contains(marker) => {
                    in_dropped_group = is_declaration(line);
                    None
                }
                MarkerPolicy::Strip => Some(line.replace(marker, "")),
                MarkerPolicy::StripFromGroupNames if is_declaration(line) => {
                    Some(line.replace(marker, ""))
                }
                _ => Some(line.to_string()),
            }
        };

        if let Some(line) = kept {
            let line = line.trim();
            if !line.is_empty() {
                cleaned.push(line.to_string());
            }
        }
    }

    engine_debug!(
        "cleaned {} raw lines down to {} content lines",
        total,
        cleaned.len()
    );
    cleaned
}
