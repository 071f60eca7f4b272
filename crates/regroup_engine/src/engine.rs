use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use engine_logging::{engine_debug, engine_info, engine_warn};
use regroup_core::{
    channel_count, clean_lines, parse_groups, render_flat, render_reclassified, CleanOptions,
    FlatOptions, OutputMode, ParseOptions, Taxonomy,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::fetch::{FetchSettings, ProgressSink, ReqwestFetcher, SourceFetcher, SourceLocation};
use crate::persist::{AtomicFileWriter, PersistError};
use crate::probe::{FfprobeProber, ProbeError, ProbeSettings, Prober};
use crate::validity::{filter_valid, ValidityConfig};
use crate::{EngineEvent, FetchError, RunSummary, Stage};

/// Produces the timestamp written at the top of reclassified output.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Clone)]
pub struct RunConfig {
    pub source: SourceLocation,
    pub output: PathBuf,
    pub fetch: FetchSettings,
    pub clean: CleanOptions,
    pub parse: ParseOptions,
    pub probe: ProbeSettings,
    pub validity: ValidityConfig,
    pub mode: OutputMode,
    pub flat: FlatOptions,
    pub generated_at: Option<Clock>,
}

impl RunConfig {
    pub fn new(source: SourceLocation, output: impl Into<PathBuf>) -> Self {
        Self {
            source,
            output: output.into(),
            fetch: FetchSettings::default(),
            clean: CleanOptions::default(),
            parse: ParseOptions::default(),
            probe: ProbeSettings::default(),
            validity: ValidityConfig::default(),
            mode: OutputMode::default(),
            flat: FlatOptions::default(),
            generated_at: None,
        }
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("source", &self.source)
            .field("output", &self.output)
            .field("fetch", &self.fetch)
            .field("clean", &self.clean)
            .field("parse", &self.parse)
            .field("probe", &self.probe)
            .field("validity", &self.validity)
            .field("mode", &self.mode)
            .field("flat", &self.flat)
            .field("generated_at", &self.generated_at.is_some())
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to load channel list: {0}")]
    Fetch(#[from] FetchError),
    #[error("invalid probe settings: {0}")]
    Probe(#[from] ProbeError),
    #[error("failed to write output: {0}")]
    Persist(#[from] PersistError),
    #[error("failed to start async runtime: {0}")]
    Runtime(std::io::Error),
    #[error("run cancelled before completion")]
    Cancelled,
}

/// Owns the runtime and collaborators for one or more pipeline runs.
pub struct EngineHandle {
    runtime: tokio::runtime::Runtime,
    config: RunConfig,
    fetcher: Arc<dyn SourceFetcher>,
    prober: Arc<dyn Prober>,
    cancel: CancellationToken,
}

impl EngineHandle {
    pub fn new(config: RunConfig) -> Result<Self, RunError> {
        let prober = FfprobeProber::new(config.probe.clone())?;
        let fetcher = ReqwestFetcher::new(config.fetch.clone());
        Self::with_parts(config, Arc::new(fetcher), Arc::new(prober))
    }

    pub fn with_parts(
        config: RunConfig,
        fetcher: Arc<dyn SourceFetcher>,
        prober: Arc<dyn Prober>,
    ) -> Result<Self, RunError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("regroup-worker")
            .build()
            .map_err(RunError::Runtime)?;
        Ok(Self {
            runtime,
            config,
            fetcher,
            prober,
            cancel: CancellationToken::new(),
        })
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the run on the first Ctrl-C.
    pub fn cancel_on_ctrl_c(&self) {
        let token = self.cancel.clone();
        self.runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                engine_warn!("interrupt received, cancelling outstanding probes");
                token.cancel();
            }
        });
    }

    /// Run the full pipeline, blocking the calling thread until it finishes.
    pub fn run(&self, sink: &dyn ProgressSink) -> Result<RunSummary, RunError> {
        self.runtime.block_on(execute(
            &self.config,
            self.fetcher.as_ref(),
            self.prober.clone(),
            self.cancel.clone(),
            sink,
        ))
    }
}

/// fetch -> clean -> parse -> validate -> render -> write.
///
/// Fetch and write failures are fatal; an external cancellation aborts before
/// anything is written. The overall probe timeout only marks unfinished
/// groups invalid.
pub async fn execute(
    config: &RunConfig,
    fetcher: &dyn SourceFetcher,
    prober: Arc<dyn Prober>,
    cancel: CancellationToken,
    sink: &dyn ProgressSink,
) -> Result<RunSummary, RunError> {
    let started = Instant::now();

    sink.emit(EngineEvent::Progress {
        stage: Stage::Fetching,
    });
    let raw = fetcher.fetch(&config.source).await?;

    sink.emit(EngineEvent::Progress {
        stage: Stage::Cleaning,
    });
    let lines = clean_lines(&raw, &config.clean);

    sink.emit(EngineEvent::Progress {
        stage: Stage::Parsing,
    });
    let groups = parse_groups(&lines, &config.parse);
    let groups_parsed = groups.len();
    if groups.is_empty() {
        engine_warn!("no groups parsed from {}", config.source);
    } else {
        engine_info!(
            "parsed {} groups holding {} channels",
            groups_parsed,
            channel_count(&groups)
        );
    }

    sink.emit(EngineEvent::Progress {
        stage: Stage::Probing,
    });
    let report = filter_valid(
        Arc::new(groups),
        &config.validity,
        prober,
        cancel.clone(),
        sink,
    )
    .await;
    if cancel.is_cancelled() {
        return Err(RunError::Cancelled);
    }
    if report.valid.is_empty() {
        engine_warn!("no live groups found, output will be empty");
    }

    sink.emit(EngineEvent::Progress {
        stage: Stage::Rendering,
    });
    let (content, channels_written) = match config.mode {
        OutputMode::Flat => {
            let content = render_flat(&report.valid, &config.flat);
            let written = content.lines().count();
            (content, written)
        }
        OutputMode::Reclassified => {
            let stamp = config.generated_at.as_ref().map(|clock| clock());
            let content =
                render_reclassified(&report.valid, Taxonomy::builtin(), stamp.as_deref());
            (content, channel_count(&report.valid))
        }
    };

    sink.emit(EngineEvent::Progress {
        stage: Stage::Writing,
    });
    let output_path = AtomicFileWriter::new().write_to(&config.output, &content)?;

    let summary = RunSummary {
        groups_parsed,
        groups_valid: report.valid.len(),
        channels_written,
        output_path,
        elapsed: started.elapsed(),
    };
    engine_debug!(
        "wrote {} channels from {} live groups to {} in {:.2?}",
        summary.channels_written,
        summary.groups_valid,
        summary.output_path.display(),
        summary.elapsed
    );
    sink.emit(EngineEvent::Progress { stage: Stage::Done });
    Ok(summary)
}
