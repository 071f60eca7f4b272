use std::collections::HashSet;

use indexmap::IndexMap;

use crate::channel::{Channel, GroupMap};
use crate::parse::DEFAULT_GENRE_MARKER;
use crate::taxonomy::Taxonomy;

const TAG_SEPARATOR: char = '$';
const FULLWIDTH_COMMA: char = '，';
const FULLWIDTH_DOLLAR: char = '＄';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Flat,
    Reclassified,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FlatOptions {
    /// Emit each exact `(name, url)` pair once; first occurrence wins.
    pub dedupe: bool,
}

/// Replace separator characters in an origin tag with full-width lookalikes.
/// Lossy: the original characters cannot be recovered on read-back.
pub fn escape_group_tag(group: &str) -> String {
    group
        .chars()
        .map(|c| match c {
            ',' => FULLWIDTH_COMMA,
            TAG_SEPARATOR => FULLWIDTH_DOLLAR,
            other => other,
        })
        .collect()
}

fn push_channel_line(buffer: &mut String, channel: &Channel, tag: &str) {
    buffer.push_str(&channel.name);
    buffer.push(',');
    buffer.push_str(&channel.url);
    buffer.push(TAG_SEPARATOR);
    buffer.push_str(tag);
    buffer.push('\n');
}

/// One `name,url$group` line per channel, in group-then-channel order.
pub fn render_flat(groups: &GroupMap, options: &FlatOptions) -> String {
    let mut buffer = String::new();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    for (group, channels) in groups {
        let tag = escape_group_tag(group);
        for channel in channels {
            if options.dedupe && !seen.insert((channel.name.as_str(), channel.url.as_str())) {
                continue;
            }
            push_channel_line(&mut buffer, channel, &tag);
        }
    }
    buffer
}

/// Re-group channels by taxonomy category in the taxonomy's display order.
///
/// Empty categories are omitted. `generated_at`, when given, becomes a
/// leading comment line.
pub fn render_reclassified(
    groups: &GroupMap,
    taxonomy: &Taxonomy,
    generated_at: Option<&str>,
) -> String {
    let mut buckets: IndexMap<&str, Vec<(&Channel, String)>> = IndexMap::new();
    for (group, channels) in groups {
        let tag = escape_group_tag(group);
        for channel in channels {
            buckets
                .entry(taxonomy.category_for(&channel.name))
                .or_default()
                .push((channel, tag.clone()));
        }
    }

    let mut buffer = String::new();
    if let Some(stamp) = generated_at {
        buffer.push_str(&format!("# generated at {stamp}\n"));
    }
    for category in taxonomy.display_order() {
        let Some(entries) = buckets.get(category.as_str()) else {
            continue;
        };
        if !buffer.is_empty() {
            buffer.push('\n');
        }
        buffer.push_str(&format!("{category},{DEFAULT_GENRE_MARKER}\n"));
        for (channel, tag) in entries {
            push_channel_line(&mut buffer, channel, tag);
        }
    }
    buffer
}
