use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::{AcceptanceSetting, ModeSetting, RedeclareSetting};

/// Probe every group of an IPTV channel list and keep only the live ones.
#[derive(Debug, Parser)]
#[command(name = "iptv-regroup", version)]
pub struct Cli {
    /// RON settings file; command line flags override its values.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Channel list URL (http/https) or local path.
    #[arg(long, value_name = "URL|PATH")]
    pub source: Option<String>,

    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Groups probed at the same time.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-attempt probe timeout.
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Extra attempts after a timed-out probe.
    #[arg(long)]
    pub retries: Option<u32>,

    /// Leading channels probed per group.
    #[arg(long)]
    pub candidates: Option<usize>,

    #[arg(long, value_enum)]
    pub mode: Option<ModeSetting>,

    /// Emit each name/url pair once (flat mode).
    #[arg(long, overrides_with = "no_dedupe")]
    pub dedupe: bool,

    /// Keep repeated name/url pairs, even if the config file enables dedupe.
    #[arg(long, overrides_with = "dedupe")]
    pub no_dedupe: bool,

    /// How a finished probe is judged live.
    #[arg(long, value_enum)]
    pub acceptance: Option<AcceptanceSetting>,

    /// Probe program to run.
    #[arg(long, value_name = "PROGRAM")]
    pub ffprobe: Option<String>,

    /// Leading lines of the source to ignore.
    #[arg(long)]
    pub header_lines: Option<usize>,

    /// What to do when a group name is declared again.
    #[arg(long, value_enum)]
    pub redeclare: Option<RedeclareSetting>,

    /// Give up on unfinished groups after this long.
    #[arg(long, value_name = "SECS")]
    pub overall_timeout_secs: Option<u64>,

    /// Also write logs to this file.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// More output; repeat for trace level.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only warnings and errors.
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the effective settings as RON and exit.
    #[arg(long)]
    pub print_config: bool,
}
