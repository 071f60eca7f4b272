use std::collections::HashSet;
use std::fs;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use regroup_core::OutputMode;
use regroup_engine::{
    execute, ChannelProgressSink, EngineEvent, EngineHandle, FailureKind, NullProgressSink,
    ProbeError, Prober, ReqwestFetcher, RunConfig, RunError, SourceLocation, Stage,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SOURCE: &str = "header1\nheader2\nNews,#genre#\nCNN,http://a/1\nBBC,http://b/2\nSports,#genre#\nESPN,http://c/3\n";

struct UrlProber {
    live: HashSet<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl UrlProber {
    fn new(live: &[&'static str]) -> Self {
        Self {
            live: live.iter().copied().collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl Prober for UrlProber {
    async fn probe(&self, url: &str) -> Result<bool, ProbeError> {
        self.calls.lock().unwrap().push(url.to_string());
        Ok(self.live.contains(url))
    }
}

#[tokio::test]
async fn flat_run_keeps_every_channel_of_live_groups() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SOURCE))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let output = temp.path().join("reclassify.txt");
    let config = RunConfig::new(
        SourceLocation::Url(format!("{}/list.txt", server.uri())),
        &output,
    );
    let prober = Arc::new(UrlProber::new(&["http://a/1", "http://c/3"]));
    let fetcher = ReqwestFetcher::new(config.fetch.clone());

    let summary = execute(
        &config,
        &fetcher,
        prober.clone(),
        CancellationToken::new(),
        &NullProgressSink,
    )
    .await
    .expect("run succeeds");

    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "CNN,http://a/1$News\nBBC,http://b/2$News\nESPN,http://c/3$Sports\n"
    );
    assert_eq!(summary.groups_parsed, 2);
    assert_eq!(summary.groups_valid, 2);
    assert_eq!(summary.channels_written, 3);
    assert_eq!(summary.output_path, output);

    let mut calls = prober.calls.lock().unwrap().clone();
    calls.sort();
    assert_eq!(calls, vec!["http://a/1", "http://c/3"]);
}

#[tokio::test]
async fn fetch_failure_aborts_before_writing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let output = temp.path().join("out.txt");
    let config = RunConfig::new(SourceLocation::Url(server.uri()), &output);
    let prober = Arc::new(UrlProber::new(&[]));

    let err = execute(
        &config,
        &ReqwestFetcher::new(config.fetch.clone()),
        prober.clone(),
        CancellationToken::new(),
        &NullProgressSink,
    )
    .await
    .unwrap_err();

    match err {
        RunError::Fetch(fetch) => assert_eq!(fetch.kind, FailureKind::HttpStatus(500)),
        other => panic!("unexpected error {other}"),
    }
    assert!(!output.exists());
    assert!(prober.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn cancelled_run_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("list.txt");
    fs::write(&source, SOURCE).unwrap();
    let output = temp.path().join("out.txt");
    let config = RunConfig::new(SourceLocation::Path(source), &output);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = execute(
        &config,
        &ReqwestFetcher::new(config.fetch.clone()),
        Arc::new(UrlProber::new(&["http://a/1"])),
        cancel,
        &NullProgressSink,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, RunError::Cancelled));
    assert!(!output.exists());
}

#[tokio::test]
async fn no_live_groups_still_writes_an_empty_file() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("list.txt");
    fs::write(&source, SOURCE).unwrap();
    let output = temp.path().join("out.txt");
    let config = RunConfig::new(SourceLocation::Path(source), &output);

    let summary = execute(
        &config,
        &ReqwestFetcher::new(config.fetch.clone()),
        Arc::new(UrlProber::new(&[])),
        CancellationToken::new(),
        &NullProgressSink,
    )
    .await
    .unwrap();

    assert_eq!(summary.groups_valid, 0);
    assert_eq!(fs::read_to_string(&output).unwrap(), "");
}

#[test]
fn engine_handle_runs_reclassified_pipeline_from_local_file() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("zubo_all.txt");
    fs::write(
        &source,
        "更新时间,#genre#\n2026-01-01,http://t/0\n北京-组播,#genre#\nCCTV-1综合,rtp://239.3.1.129:8008\n北京联通,#genre#\nCCTV-1综合,http://b/1\n北京卫视HD,http://b/2\n本地新闻,http://b/3\n上海联通,#genre#\nCCTV-1,http://s/1\n",
    )
    .unwrap();
    let output = temp.path().join("out").join("regrouped.txt");

    let mut config = RunConfig::new(SourceLocation::Path(source), &output);
    config.mode = OutputMode::Reclassified;
    config.generated_at = Some(Arc::new(|| "2026-01-01T08:00:00+08:00".to_string()));

    let (tx, rx) = std::sync::mpsc::channel();
    let engine = EngineHandle::with_parts(
        config.clone(),
        Arc::new(ReqwestFetcher::new(config.fetch.clone())),
        Arc::new(UrlProber::new(&["http://b/1", "http://s/1"])),
    )
    .unwrap();
    let summary = engine.run(&ChannelProgressSink::new(tx)).unwrap();

    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "# generated at 2026-01-01T08:00:00+08:00\n\
         \n\
         央视频道,#genre#\n\
         CCTV-1综合,http://b/1$北京联通\n\
         CCTV-1,http://s/1$上海联通\n\
         \n\
         卫视频道,#genre#\n\
         北京卫视HD,http://b/2$北京联通\n\
         \n\
         其他频道,#genre#\n\
         本地新闻,http://b/3$北京联通\n"
    );
    assert_eq!(summary.groups_parsed, 2);
    assert_eq!(summary.groups_valid, 2);
    assert_eq!(summary.channels_written, 4);

    let stages: Vec<Stage> = rx
        .try_iter()
        .filter_map(|event| match event {
            EngineEvent::Progress { stage } => Some(stage),
            EngineEvent::GroupChecked(_) => None,
        })
        .collect();
    assert_eq!(
        stages,
        vec![
            Stage::Fetching,
            Stage::Cleaning,
            Stage::Parsing,
            Stage::Probing,
            Stage::Rendering,
            Stage::Writing,
            Stage::Done,
        ]
    );
}

#[test]
fn engine_handle_cancel_token_aborts_before_writing() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("zubo_all.txt");
    fs::write(&source, SOURCE).unwrap();
    let output = temp.path().join("reclassify.txt");

    let config = RunConfig::new(SourceLocation::Path(source), &output);
    let prober = Arc::new(UrlProber::new(&["http://a/1", "http://c/3"]));
    let engine = EngineHandle::with_parts(
        config.clone(),
        Arc::new(ReqwestFetcher::new(config.fetch.clone())),
        prober.clone(),
    )
    .unwrap();
    engine.cancel_token().cancel();

    let result = engine.run(&NullProgressSink);

    assert!(matches!(result, Err(RunError::Cancelled)));
    assert!(prober.calls.lock().unwrap().is_empty());
    assert!(!output.exists());
}
