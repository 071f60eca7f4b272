//! Regroup core: channel model, list cleaning and parsing, taxonomy and output rendering.
mod channel;
mod clean;
mod format;
mod parse;
mod taxonomy;

pub use channel::{channel_count, has_allowed_scheme, Channel, GroupMap, ALLOWED_SCHEMES};
pub use clean::{clean_lines, CleanOptions, MarkerPolicy, DEFAULT_HEADER_LINES, DEFAULT_MULTICAST_MARKER};
pub use format::{escape_group_tag, render_flat, render_reclassified, FlatOptions, OutputMode};
pub use parse::{
    parse_groups, split_channel_line, DeclarationStyle, ParseOptions, RedeclarePolicy,
    DEFAULT_GENRE_MARKER,
};
pub use taxonomy::{Taxonomy, UNCATEGORIZED};
