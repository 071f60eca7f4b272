//! Stream liveness probing through an external media-inspection process.
//!
//! A probe never fails for network or tool problems: spawn errors, non-zero
//! exits, missing evidence and exhausted timeouts all collapse to `false`.
//! `ProbeError` is reserved for invalid settings.

use std::process::{Output, Stdio};
use std::time::Duration;

use engine_logging::{engine_debug, engine_trace};
use thiserror::Error;
use tokio::process::Command;

pub const DEFAULT_PROBE_PROGRAM: &str = "ffprobe";
/// Stream evidence printed by `ffprobe -show_streams`.
pub const DEFAULT_STREAM_TOKEN: &str = "codec_type";
const STDERR_SNIPPET: usize = 100;

/// How a finished probe process is judged live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acceptance {
    /// Stdout contains the token, whatever the exit status.
    OutputToken(String),
    /// The process exited with status zero.
    ExitStatus,
    /// Zero exit and a parseable, positive container duration.
    Duration,
}

impl Default for Acceptance {
    fn default() -> Self {
        Acceptance::OutputToken(DEFAULT_STREAM_TOKEN.to_string())
    }
}

impl Acceptance {
    fn program_args(&self) -> &'static [&'static str] {
        match self {
            Acceptance::OutputToken(_) => &["-show_streams"],
            Acceptance::ExitStatus => &[],
            Acceptance::Duration => &[
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ],
        }
    }

    fn accepts(&self, output: &Output) -> bool {
        match self {
            Acceptance::OutputToken(token) => {
                !token.is_empty() && String::from_utf8_lossy(&output.stdout).contains(token.as_str())
            }
            Acceptance::ExitStatus => output.status.success(),
            Acceptance::Duration => {
                output.status.success()
                    && String::from_utf8_lossy(&output.stdout)
                        .lines()
                        .filter_map(|line| line.trim().parse::<f64>().ok())
                        .any(|secs| secs.is_finite() && secs > 0.0)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub program: String,
    /// Wall-clock bound for a single attempt.
    pub timeout: Duration,
    /// Extra attempts after a timed-out one.
    pub max_retries: u32,
    pub backoff: Duration,
    pub acceptance: Acceptance,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROBE_PROGRAM.to_string(),
            timeout: Duration::from_secs(5),
            max_retries: 1,
            backoff: Duration::from_secs(1),
            acceptance: Acceptance::default(),
        }
    }
}

impl ProbeSettings {
    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.program.trim().is_empty() {
            return Err(ProbeError::EmptyProgram);
        }
        if self.timeout.is_zero() {
            return Err(ProbeError::ZeroTimeout);
        }
        if matches!(&self.acceptance, Acceptance::OutputToken(token) if token.is_empty()) {
            return Err(ProbeError::EmptyToken);
        }
        Ok(())
    }

    /// Worst-case time one URL can take, retries and backoff included.
    pub fn worst_case(&self) -> Duration {
        let attempts = self.max_retries.saturating_add(1);
        self.timeout.saturating_mul(attempts) + self.backoff.saturating_mul(self.max_retries)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("probe program name is empty")]
    EmptyProgram,
    #[error("probe timeout must be greater than zero")]
    ZeroTimeout,
    #[error("stream evidence token is empty")]
    EmptyToken,
    #[error("probe failed: {0}")]
    Other(String),
}

#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    /// `Ok(true)` when the stream at `url` is live.
    async fn probe(&self, url: &str) -> Result<bool, ProbeError>;
}

enum Attempt {
    Live,
    NotLive,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct FfprobeProber {
    settings: ProbeSettings,
}

impl FfprobeProber {
    pub fn new(settings: ProbeSettings) -> Result<Self, ProbeError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    fn command(&self, url: &str) -> Command {
        let mut cmd = Command::new(&self.settings.program);
        cmd.args(["-v", "error"])
            .arg("-rw_timeout")
            .arg(self.settings.timeout.as_micros().to_string())
            .args(self.settings.acceptance.program_args())
            .args(["-i", url])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let child = match self.command(url).spawn() {
            Ok(child) => child,
            Err(err) => {
                engine_debug!("could not start {}: {}", self.settings.program, err);
                return Attempt::NotLive;
            }
        };

        // Dropping the pending wait on timeout kills the child.
        match tokio::time::timeout(self.settings.timeout, child.wait_with_output()).await {
            Err(_) => Attempt::TimedOut,
            Ok(Err(err)) => {
                engine_debug!("waiting on probe for {} failed: {}", url, err);
                Attempt::NotLive
            }
            Ok(Ok(output)) if self.settings.acceptance.accepts(&output) => Attempt::Live,
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let snippet: String = stderr.trim().chars().take(STDERR_SNIPPET).collect();
                engine_debug!(
                    "no stream at {} (status {}): {}",
                    url,
                    output.status,
                    snippet
                );
                Attempt::NotLive
            }
        }
    }
}

#[async_trait::async_trait]
impl Prober for FfprobeProber {
    async fn probe(&self, url: &str) -> Result<bool, ProbeError> {
        let mut attempt_no: u32 = 0;
        loop {
            engine_trace!("probe attempt {} for {}", attempt_no + 1, url);
            match self.attempt(url).await {
                Attempt::Live => return Ok(true),
                Attempt::NotLive => return Ok(false),
                Attempt::TimedOut if attempt_no >= self.settings.max_retries => {
                    engine_debug!(
                        "probe for {} timed out {} times, giving up",
                        url,
                        attempt_no + 1
                    );
                    return Ok(false);
                }
                Attempt::TimedOut => {
                    attempt_no += 1;
                    tokio::time::sleep(self.settings.backoff).await;
                }
            }
        }
    }
}
