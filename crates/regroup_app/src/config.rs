//! Effective settings: built-in defaults, then an optional RON file, then
//! command line flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::ValueEnum;
use regroup_core::{
    CleanOptions, DeclarationStyle, FlatOptions, MarkerPolicy, OutputMode, ParseOptions,
    RedeclarePolicy, DEFAULT_GENRE_MARKER, DEFAULT_HEADER_LINES, DEFAULT_MULTICAST_MARKER,
};
use regroup_engine::{
    Acceptance, FetchSettings, ProbeSettings, RunConfig, SourceLocation, ValidityConfig,
    DEFAULT_PROBE_PROGRAM, DEFAULT_STREAM_TOKEN,
};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

pub const DEFAULT_SOURCE: &str = "https://raw.githubusercontent.com/q1017673817/iptvz/main/zubo_all.txt";
pub const DEFAULT_OUTPUT: &str = "reclassify.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeSetting {
    #[default]
    Flat,
    Reclassified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceSetting {
    /// Stdout contains the stream token.
    #[default]
    Token,
    /// Zero exit status.
    Exit,
    /// A parseable container duration.
    Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedeclareSetting {
    #[default]
    Merge,
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerSetting {
    #[default]
    DropLine,
    Strip,
    StripFromGroupNames,
    Keep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationSetting {
    #[default]
    Suffix,
    Embedded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source: String,
    pub output: PathBuf,
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub retries: u32,
    pub backoff_ms: u64,
    pub candidates: usize,
    pub overall_timeout_secs: Option<u64>,
    pub mode: ModeSetting,
    pub dedupe: bool,
    pub acceptance: AcceptanceSetting,
    pub stream_token: String,
    pub ffprobe: String,
    pub header_lines: usize,
    pub multicast_marker: String,
    pub marker_policy: MarkerSetting,
    pub genre_marker: String,
    pub declaration: DeclarationSetting,
    pub redeclare: RedeclareSetting,
    pub check_scheme: bool,
    pub fetch_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            concurrency: 10,
            timeout_secs: 5,
            retries: 1,
            backoff_ms: 1000,
            candidates: 1,
            overall_timeout_secs: None,
            mode: ModeSetting::default(),
            dedupe: false,
            acceptance: AcceptanceSetting::default(),
            stream_token: DEFAULT_STREAM_TOKEN.to_string(),
            ffprobe: DEFAULT_PROBE_PROGRAM.to_string(),
            header_lines: DEFAULT_HEADER_LINES,
            multicast_marker: DEFAULT_MULTICAST_MARKER.to_string(),
            marker_policy: MarkerSetting::default(),
            genre_marker: DEFAULT_GENRE_MARKER.to_string(),
            declaration: DeclarationSetting::default(),
            redeclare: RedeclareSetting::default(),
            check_scheme: true,
            fetch_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut settings = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_cli(cli);
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        Self::from_ron(&content).with_context(|| format!("invalid settings in {}", path.display()))
    }

    pub fn from_ron(content: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(content)?)
    }

    pub fn to_ron(&self) -> anyhow::Result<String> {
        let pretty = ron::ser::PrettyConfig::new();
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(source) = &cli.source {
            self.source = source.clone();
        }
        if let Some(output) = &cli.output {
            self.output = output.clone();
        }
        if let Some(concurrency) = cli.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(timeout) = cli.timeout_secs {
            self.timeout_secs = timeout;
        }
        if let Some(retries) = cli.retries {
            self.retries = retries;
        }
        if let Some(candidates) = cli.candidates {
            self.candidates = candidates;
        }
        if let Some(mode) = cli.mode {
            self.mode = mode;
        }
        if cli.dedupe {
            self.dedupe = true;
        }
        if cli.no_dedupe {
            self.dedupe = false;
        }
        if let Some(acceptance) = cli.acceptance {
            self.acceptance = acceptance;
        }
        if let Some(ffprobe) = &cli.ffprobe {
            self.ffprobe = ffprobe.clone();
        }
        if let Some(header_lines) = cli.header_lines {
            self.header_lines = header_lines;
        }
        if let Some(redeclare) = cli.redeclare {
            self.redeclare = redeclare;
        }
        if let Some(limit) = cli.overall_timeout_secs {
            self.overall_timeout_secs = Some(limit);
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.source.trim().is_empty() {
            bail!("source location is empty");
        }
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if self.candidates == 0 {
            bail!("candidates must be at least 1");
        }
        if self.genre_marker.is_empty() {
            bail!("genre marker is empty");
        }
        Ok(())
    }

    pub fn to_run_config(&self) -> RunConfig {
        let mut config = RunConfig::new(SourceLocation::parse(&self.source), self.output.clone());
        config.fetch = FetchSettings {
            request_timeout: Duration::from_secs(self.fetch_timeout_secs),
            ..FetchSettings::default()
        };
        config.clean = CleanOptions {
            header_lines: self.header_lines,
            marker: self.multicast_marker.clone(),
            marker_policy: match self.marker_policy {
                MarkerSetting::DropLine => MarkerPolicy::DropLine,
                MarkerSetting::Strip => MarkerPolicy::Strip,
                MarkerSetting::StripFromGroupNames => MarkerPolicy::StripFromGroupNames,
                MarkerSetting::Keep => MarkerPolicy::Keep,
            },
            genre_marker: self.genre_marker.clone(),
        };
        config.parse = ParseOptions {
            genre_marker: self.genre_marker.clone(),
            declaration_style: match self.declaration {
                DeclarationSetting::Suffix => DeclarationStyle::Suffix,
                DeclarationSetting::Embedded => DeclarationStyle::Embedded,
            },
            redeclare: match self.redeclare {
                RedeclareSetting::Merge => RedeclarePolicy::Merge,
                RedeclareSetting::Replace => RedeclarePolicy::Replace,
            },
            require_known_scheme: self.check_scheme,
        };
        config.probe = ProbeSettings {
            program: self.ffprobe.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.retries,
            backoff: Duration::from_millis(self.backoff_ms),
            acceptance: match self.acceptance {
                AcceptanceSetting::Token => Acceptance::OutputToken(self.stream_token.clone()),
                AcceptanceSetting::Exit => Acceptance::ExitStatus,
                AcceptanceSetting::Duration => Acceptance::Duration,
            },
        };
        config.validity = ValidityConfig {
            concurrency: self.concurrency,
            candidates_per_group: self.candidates,
            overall_timeout: self.overall_timeout_secs.map(Duration::from_secs),
        };
        config.mode = match self.mode {
            ModeSetting::Flat => OutputMode::Flat,
            ModeSetting::Reclassified => OutputMode::Reclassified,
        };
        config.flat = FlatOptions {
            dedupe: self.dedupe,
        };
        config
    }
}
