//! Group validity engine.
//!
//! One task per non-empty group probes up to `candidates_per_group` leading
//! channels in order and stops at the first live one. Tasks run concurrently,
//! bounded by a semaphore, and report a [`GroupVerdict`] over a single channel
//! that only the aggregating caller drains. The input map is shared read-only.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::FutureExt;
use regroup_core::{Channel, GroupMap};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::fetch::ProgressSink;
use crate::probe::{ProbeError, Prober};
use crate::{EngineEvent, GroupVerdict, VerdictOutcome};

#[derive(Debug, Clone)]
pub struct ValidityConfig {
    /// Upper bound on groups being probed at the same time. Clamped to
    /// `1..=Semaphore::MAX_PERMITS`.
    pub concurrency: usize,
    /// Leading channels tried per group before rejecting it.
    pub candidates_per_group: usize,
    /// Cancel whatever is still running once this much time has passed.
    pub overall_timeout: Option<Duration>,
}

impl Default for ValidityConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            candidates_per_group: 1,
            overall_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidityReport {
    /// Groups judged live, in input order, channels untouched.
    pub valid: GroupMap,
    /// One verdict per probed group, in input order.
    pub verdicts: Vec<GroupVerdict>,
}

impl ValidityReport {
    pub fn count(&self, predicate: impl Fn(&VerdictOutcome) -> bool) -> usize {
        self.verdicts.iter().filter(|v| predicate(&v.outcome)).count()
    }
}

/// Decide which groups are live. Never fails: a task that errors or panics
/// marks only its own group invalid.
pub async fn filter_valid(
    groups: Arc<GroupMap>,
    config: &ValidityConfig,
    prober: Arc<dyn Prober>,
    cancel: CancellationToken,
    sink: &dyn ProgressSink,
) -> ValidityReport {
    let concurrency = config.concurrency.clamp(1, Semaphore::MAX_PERMITS);
    let candidates = config.candidates_per_group.max(1);
    let cancel = cancel.child_token();
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let (tx, mut rx) = mpsc::unbounded_channel::<GroupVerdict>();

    let deadline = config.overall_timeout.map(|limit| {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            engine_warn!("overall probe timeout of {:?} reached, cancelling", limit);
            token.cancel();
        })
    });

    let mut pending: HashSet<String> = HashSet::new();
    for (name, channels) in groups.iter() {
        if channels.is_empty() {
            continue;
        }
        pending.insert(name.clone());
        let task = GroupTask {
            groups: groups.clone(),
            name: name.clone(),
            candidates,
            prober: prober.clone(),
            semaphore: semaphore.clone(),
            cancel: cancel.clone(),
        };
        let tx = tx.clone();
        tokio::spawn(async move {
            let verdict = task.run().await;
            let _ = tx.send(verdict);
        });
    }
    drop(tx);

    engine_info!(
        "probing {} groups with up to {} at a time, {} candidate(s) each",
        pending.len(),
        concurrency,
        candidates
    );

    let mut valid = GroupMap::new();
    let mut verdicts = Vec::with_capacity(pending.len());
    while let Some(verdict) = rx.recv().await {
        pending.remove(&verdict.group);
        log_verdict(&verdict);
        if verdict.is_valid() {
            if let Some(channels) = groups.get(&verdict.group) {
                valid.insert(verdict.group.clone(), channels.clone());
            }
        }
        sink.emit(EngineEvent::GroupChecked(verdict.clone()));
        verdicts.push(verdict);
    }

    // A task that died outside its own panic boundary never reported.
    for group in pending {
        let verdict = GroupVerdict {
            group,
            outcome: VerdictOutcome::Failed("task ended without a verdict".to_string()),
            probed: Vec::new(),
        };
        log_verdict(&verdict);
        sink.emit(EngineEvent::GroupChecked(verdict.clone()));
        verdicts.push(verdict);
    }

    if let Some(handle) = deadline {
        handle.abort();
    }

    let position = |name: &str| groups.get_index_of(name).unwrap_or(usize::MAX);
    valid.sort_by(|a, _, b, _| position(a.as_str()).cmp(&position(b.as_str())));
    verdicts.sort_by_key(|v| position(v.group.as_str()));

    engine_info!(
        "validity check finished: {} of {} groups live",
        valid.len(),
        verdicts.len()
    );
    ValidityReport { valid, verdicts }
}

struct GroupTask {
    groups: Arc<GroupMap>,
    name: String,
    candidates: usize,
    prober: Arc<dyn Prober>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl GroupTask {
    async fn run(self) -> GroupVerdict {
        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return self.verdict(VerdictOutcome::Cancelled, Vec::new()),
            permit = self.semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    return self.verdict(
                        VerdictOutcome::Failed("worker pool closed".to_string()),
                        Vec::new(),
                    )
                }
            },
        };

        let Some(channels) = self.groups.get(&self.name) else {
            return self.verdict(
                VerdictOutcome::Failed("group vanished from input".to_string()),
                Vec::new(),
            );
        };
        let limit = self.candidates.min(channels.len());
        let check = AssertUnwindSafe(check_candidates(&channels[..limit], self.prober.as_ref()));

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = check.catch_unwind() => Some(result),
        };

        match outcome {
            None => self.verdict(VerdictOutcome::Cancelled, Vec::new()),
            Some(Ok((Ok(true), probed))) => self.verdict(VerdictOutcome::Accepted, probed),
            Some(Ok((Ok(false), probed))) => self.verdict(VerdictOutcome::Rejected, probed),
            Some(Ok((Err(err), probed))) => {
                self.verdict(VerdictOutcome::Failed(err.to_string()), probed)
            }
            Some(Err(panic)) => self.verdict(
                VerdictOutcome::Failed(format!("probe panicked: {}", panic_message(panic.as_ref()))),
                Vec::new(),
            ),
        }
    }

    fn verdict(&self, outcome: VerdictOutcome, probed: Vec<String>) -> GroupVerdict {
        GroupVerdict {
            group: self.name.clone(),
            outcome,
            probed,
        }
    }
}

/// Probe candidates strictly in order, stopping at the first live one.
async fn check_candidates(
    channels: &[Channel],
    prober: &dyn Prober,
) -> (Result<bool, ProbeError>, Vec<String>) {
    let mut probed = Vec::with_capacity(channels.len());
    for channel in channels {
        probed.push(channel.url.clone());
        match prober.probe(&channel.url).await {
            Ok(true) => return (Ok(true), probed),
            Ok(false) => {}
            Err(err) => return (Err(err), probed),
        }
    }
    (Ok(false), probed)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = panic.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic".to_string()
}

fn log_verdict(verdict: &GroupVerdict) {
    match &verdict.outcome {
        VerdictOutcome::Accepted => engine_info!(
            "group '{}' is live ({} probe(s))",
            verdict.group,
            verdict.probed.len()
        ),
        VerdictOutcome::Rejected => engine_info!(
            "group '{}' dropped, no live stream among {} candidate(s)",
            verdict.group,
            verdict.probed.len()
        ),
        VerdictOutcome::Failed(reason) => {
            engine_warn!("group '{}' dropped after task failure: {}", verdict.group, reason)
        }
        VerdictOutcome::Cancelled => engine_debug!("group '{}' cancelled", verdict.group),
    }
}
