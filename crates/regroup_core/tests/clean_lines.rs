use pretty_assertions::assert_eq;
use regroup_core::{
    clean_lines, parse_groups, render_flat, Channel, CleanOptions, FlatOptions, MarkerPolicy,
    ParseOptions,
};

const RAW: &str = "header1\nheader2\n\nNews-组播,#genre#\nCNN,http://a/1\n  \nLocal,#genre#\nCam-组播,rtp://239.0.0.1:5000\nTV,http://t/1\n";

fn with_policy(policy: MarkerPolicy) -> CleanOptions {
    CleanOptions {
        marker_policy: policy,
        ..CleanOptions::default()
    }
}

#[test]
fn drops_header_blank_lines_and_marker_lines() {
    let lines = clean_lines(RAW, &CleanOptions::default());
    assert_eq!(lines, vec!["Local,#genre#", "TV,http://t/1"]);
}

#[test]
fn dropped_multicast_group_takes_its_channels_along() {
    let raw = "h1\nh2\n北京联通,#genre#\nA,http://a/1\n北京联通-组播,#genre#\nM,rtp://239.0.0.1:5000\nN,rtp://239.0.0.2:5000\n上海电信,#genre#\nB,http://b/1\n";
    let lines = clean_lines(raw, &CleanOptions::default());
    assert_eq!(
        lines,
        vec!["北京联通,#genre#", "A,http://a/1", "上海电信,#genre#", "B,http://b/1"]
    );

    let groups = parse_groups(&lines, &ParseOptions::default());
    assert_eq!(groups.len(), 2);
    assert_eq!(groups["北京联通"], vec![Channel::new("A", "http://a/1")]);
    assert_eq!(
        render_flat(&groups, &FlatOptions::default()),
        "A,http://a/1$北京联通\nB,http://b/1$上海电信\n"
    );
}

#[test]
fn dropped_channel_line_keeps_group_context() {
    let raw = "h1\nh2\nLocal,#genre#\nCam-组播,rtp://239.0.0.1:5000\nTV,http://t/1\n";
    let lines = clean_lines(raw, &CleanOptions::default());
    assert_eq!(lines, vec!["Local,#genre#", "TV,http://t/1"]);
}

#[test]
fn strip_policy_removes_marker_everywhere() {
    let lines = clean_lines(RAW, &with_policy(MarkerPolicy::Strip));
    assert_eq!(
        lines,
        vec![
            "News,#genre#",
            "CNN,http://a/1",
            "Local,#genre#",
            "Cam,rtp://239.0.0.1:5000",
            "TV,http://t/1",
        ]
    );
}

#[test]
fn strip_from_group_names_leaves_channel_lines() {
    let lines = clean_lines(RAW, &with_policy(MarkerPolicy::StripFromGroupNames));
    assert_eq!(lines[0], "News,#genre#");
    assert!(lines.contains(&"Cam-组播,rtp://239.0.0.1:5000".to_string()));
}

#[test]
fn short_input_yields_nothing() {
    assert!(clean_lines("only one line", &CleanOptions::default()).is_empty());
    assert!(clean_lines("", &CleanOptions::default()).is_empty());
}

#[test]
fn zero_header_lines_keeps_everything() {
    let options = CleanOptions {
        header_lines: 0,
        marker_policy: MarkerPolicy::Keep,
        ..CleanOptions::default()
    };
    let lines = clean_lines("a,#genre#\nb,http://b\n", &options);
    assert_eq!(lines, vec!["a,#genre#", "b,http://b"]);
}
