use engine_logging::{engine_debug, engine_trace};
use regex::Regex;

use crate::channel::{has_allowed_scheme, Channel, GroupMap};

pub const DEFAULT_GENRE_MARKER: &str = "#genre#";
const FIELD_SEPARATOR: char = ',';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeclarationStyle {
    /// `<name>,#genre#` with the marker as the exact suffix.
    #[default]
    Suffix,
    /// Marker anywhere in the line; the name is the text around it.
    Embedded,
}

/// Behaviour when a group name is declared a second time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedeclarePolicy {
    /// Keep accumulating into the existing group.
    #[default]
    Merge,
    /// Discard what was collected so far under that name.
    Replace,
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub genre_marker: String,
    pub declaration_style: DeclarationStyle,
    pub redeclare: RedeclarePolicy,
    pub require_known_scheme: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            genre_marker: DEFAULT_GENRE_MARKER.to_string(),
            declaration_style: DeclarationStyle::default(),
            redeclare: RedeclarePolicy::default(),
            require_known_scheme: true,
        }
    }
}

enum Line<'a> {
    Declaration(&'a str),
    Channel { name: &'a str, url: &'a str },
    Noise,
}

struct LineClassifier<'o> {
    options: &'o ParseOptions,
    suffix: String,
    embedded: Option<Regex>,
}

impl<'o> LineClassifier<'o> {
    fn new(options: &'o ParseOptions) -> Self {
        let embedded = match options.declaration_style {
            DeclarationStyle::Embedded if !options.genre_marker.is_empty() => {
                let pattern = format!(r"^(.*?){}([^,]*)", regex::escape(&options.genre_marker));
                Regex::new(&pattern).ok()
            }
            _ => None,
        };
        Self {
            options,
            suffix: format!("{FIELD_SEPARATOR}{}", options.genre_marker),
            embedded,
        }
    }

    fn classify<'a>(&self, line: &'a str) -> Line<'a> {
        if let Some(name) = self.declaration_name(line) {
            return Line::Declaration(name);
        }
        match split_channel_line(line) {
            Some((name, url)) => Line::Channel { name, url },
            None => Line::Noise,
        }
    }

    fn declaration_name<'a>(&self, line: &'a str) -> Option<&'a str> {
        match &self.embedded {
            Some(regex) => {
                let captures = regex.captures(line)?;
                let before = captures
                    .get(1)
                    .map(|m| m.as_str().trim().trim_end_matches(FIELD_SEPARATOR).trim())
                    .unwrap_or_default();
                if !before.is_empty() {
                    return Some(before);
                }
                Some(captures.get(2).map(|m| m.as_str().trim()).unwrap_or_default())
            }
            None => line.strip_suffix(self.suffix.as_str()).map(str::trim),
        }
    }

    fn accepts_url(&self, url: &str) -> bool {
        !self.options.require_known_scheme || has_allowed_scheme(url)
    }
}

/// Split a channel line on the first comma only; the remainder is the URL
/// even if it contains further commas.
pub fn split_channel_line(line: &str) -> Option<(&str, &str)> {
    let (name, url) = line.split_once(FIELD_SEPARATOR)?;
    let (name, url) = (name.trim(), url.trim());
    if name.is_empty() || url.is_empty() {
        return None;
    }
    Some((name, url))
}

/// Build the group map from cleaned lines. Malformed lines, and channel lines
/// seen before any declaration, are dropped; this never fails.
pub fn parse_groups<I>(lines: I, options: &ParseOptions) -> GroupMap
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let classifier = LineClassifier::new(options);
    let mut groups = GroupMap::new();
    let mut current: Option<String> = None;
    let mut dropped = 0usize;

    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }
        match classifier.classify(line) {
            Line::Declaration(name) if name.is_empty() => {
                engine_trace!("declaration without a name: {}", line);
                current = None;
                dropped += 1;
            }
            Line::Declaration(name) => {
                match groups.get_mut(name) {
                    Some(existing) if options.redeclare == RedeclarePolicy::Replace => {
                        existing.clear();
                    }
                    Some(_) => {}
                    None => {
                        groups.insert(name.to_string(), Vec::new());
                    }
                }
                current = Some(name.to_string());
            }
            Line::Channel { name, url } => {
                let Some(group) = current.as_ref().and_then(|g| groups.get_mut(g)) else {
                    engine_trace!("channel line outside any group: {}", line);
                    dropped += 1;
                    continue;
                };
                if !classifier.accepts_url(url) {
                    engine_trace!("unsupported stream locator: {}", url);
                    dropped += 1;
                    continue;
                }
                group.push(Channel::new(name, url));
            }
            Line::Noise => {
                engine_trace!("unrecognised line: {}", line);
                dropped += 1;
            }
        }
    }

    groups.retain(|_, channels| !channels.is_empty());
    engine_debug!(
        "parsed {} groups, dropped {} lines",
        groups.len(),
        dropped
    );
    groups
}
