//! Regroup engine: source fetch, stream probing, group validation and output writing.
mod engine;
mod fetch;
mod persist;
mod probe;
mod types;
mod validity;

pub use engine::{execute, Clock, EngineHandle, RunConfig, RunError};
pub use fetch::{
    ChannelProgressSink, FetchSettings, NullProgressSink, ProgressSink, ReqwestFetcher,
    SourceFetcher, SourceLocation,
};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use probe::{
    Acceptance, FfprobeProber, ProbeError, ProbeSettings, Prober, DEFAULT_PROBE_PROGRAM,
    DEFAULT_STREAM_TOKEN,
};
pub use types::{
    EngineEvent, FailureKind, FetchError, GroupVerdict, RunSummary, Stage, VerdictOutcome,
};
pub use validity::{filter_valid, ValidityConfig, ValidityReport};
