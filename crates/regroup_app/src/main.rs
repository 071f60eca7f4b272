mod cli;
mod config;
mod logging;

use std::process::ExitCode;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use clap::Parser;
use engine_logging::{
    engine_debug, engine_error, engine_info, engine_warn, level_for_verbosity,
};
use regroup_engine::{ChannelProgressSink, EngineEvent, EngineHandle, Stage};

use crate::cli::Cli;
use crate::config::Settings;
use crate::logging::LogDestination;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(
        LogDestination::from_log_file(cli.log_file.as_deref()),
        level_for_verbosity(cli.verbose, cli.quiet),
    );

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            engine_error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let settings = Settings::load(cli)?;
    if cli.print_config {
        println!("{}", settings.to_ron()?);
        return Ok(());
    }

    let mut config = settings.to_run_config();
    config.generated_at = Some(Arc::new(|| {
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }));
    engine_debug!("effective configuration: {config:?}");

    let engine = EngineHandle::new(config)?;
    engine.cancel_on_ctrl_c();

    let (tx, rx) = mpsc::channel();
    let reporter = thread::spawn(move || report_progress(rx));
    let result = engine.run(&ChannelProgressSink::new(tx));
    join_reporter(reporter);

    let summary = result?;
    engine_info!(
        "{} of {} groups live, {} channels written to {} in {:.1?}",
        summary.groups_valid,
        summary.groups_parsed,
        summary.channels_written,
        summary.output_path.display(),
        summary.elapsed
    );
    Ok(())
}

/// Returns false, after logging, when the reporter thread panicked.
fn join_reporter(reporter: JoinHandle<()>) -> bool {
    match reporter.join() {
        Ok(()) => true,
        Err(_) => {
            engine_warn!("progress reporter thread panicked");
            false
        }
    }
}

/// Drains engine events until the sink is dropped at the end of the run.
fn report_progress(rx: mpsc::Receiver<EngineEvent>) {
    let mut checked = 0usize;
    let mut live = 0usize;
    while let Ok(event) = rx.recv() {
        match event {
            EngineEvent::Progress { stage } => match stage {
                Stage::Probing => engine_info!("probing groups"),
                Stage::Done => engine_debug!("checked {checked} groups, {live} live"),
                other => engine_debug!("stage: {other:?}"),
            },
            EngineEvent::GroupChecked(verdict) => {
                checked += 1;
                if verdict.is_valid() {
                    live += 1;
                }
                if checked % 25 == 0 {
                    engine_info!("checked {checked} groups so far, {live} live");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reporter_panic_is_reported_not_swallowed() {
        let (tx, rx) = mpsc::channel::<EngineEvent>();
        let clean = thread::spawn(move || report_progress(rx));
        drop(tx);
        assert!(join_reporter(clean));

        let broken = thread::spawn(|| panic!("reporter failed"));
        assert!(!join_reporter(broken));
    }
}
