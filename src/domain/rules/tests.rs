// Unit tests for business rules

use super::*;
use std::path::Path;

fn candidate(
    id: ConverterId,
    extensions: &'static [&'static str],
    capabilities: &'static [Capability],
    rank: usize,
) -> ToolCandidate {
    ToolCandidate {
        id,
        executable: id.name().to_string(),
        extensions,
        capabilities,
        invocation: Invocation::SingleCommand,
        rank,
    }
}

fn selector() -> CandidateSelector {
    // Registered out of order on purpose; ranks decide
    CandidateSelector::new(vec![
        candidate(ConverterId::AsfBin, &[".WMV", ".ASF"], &[], 4),
        candidate(
            ConverterId::MkvMerge,
            &[".MKV", ".MP4"],
            &[Capability::FrameSplit, Capability::Chapters],
            0,
        ),
        candidate(
            ConverterId::FFmpeg,
            &[".MKV", ".MP4", ".WMV"],
            &[Capability::FrameSplit, Capability::Filters],
            1,
        ),
        candidate(ConverterId::Mp4Box, &[".MP4"], &[Capability::Chapters], 2),
    ])
}

fn request(path: &str) -> ConvertRequest {
    ConvertRequest::new(
        path,
        CutList::new(
            CutUnit::Seconds,
            vec![CutPoint::new(Some(10.0), Some(20.0)).unwrap()],
        )
        .unwrap(),
        ConvertOptions::default(),
    )
}

fn ids(candidates: &[ToolCandidate]) -> Vec<ConverterId> {
    candidates.iter().map(|c| c.id).collect()
}

#[test]
fn test_candidates_follow_rank_order() {
    let selected = selector().select(&request("movie.mp4"), None).unwrap();
    assert_eq!(
        ids(&selected),
        vec![ConverterId::MkvMerge, ConverterId::FFmpeg, ConverterId::Mp4Box]
    );
}

#[test]
fn test_unknown_extension_is_unsupported() {
    let selector = selector();
    assert!(selector.candidates(Path::new("x.xyz")).is_empty());
    let result = selector.select(&request("x.xyz"), None);
    assert!(matches!(result, Err(DomainError::UnsupportedFormat { .. })));
}

#[test]
fn test_filters_keep_only_filter_capable_tools() {
    let mut req = request("movie.mkv");
    req.options.filters = vec!["-vf".to_string(), "crop=720:352".to_string()];
    let selected = selector().select(&req, None).unwrap();
    assert_eq!(ids(&selected), vec![ConverterId::FFmpeg]);

    let mut wmv = request("clip.asf");
    wmv.options.filters = vec!["-an".to_string()];
    assert!(matches!(
        selector().select(&wmv, None),
        Err(DomainError::NoCapableConverter { .. })
    ));
}

#[test]
fn test_frame_cuts_without_fps_need_frame_split() {
    let mut req = request("clip.wmv");
    req.cuts = CutList::new(
        CutUnit::Frames,
        vec![CutPoint::new(Some(0.0), Some(250.0)).unwrap()],
    )
    .unwrap();
    let selected = selector().select(&req, None).unwrap();
    assert_eq!(ids(&selected), vec![ConverterId::FFmpeg]);

    req.options.frame_rate = Some(25.0);
    let selected = selector().select(&req, None).unwrap();
    assert_eq!(ids(&selected), vec![ConverterId::FFmpeg, ConverterId::AsfBin]);
}

#[test]
fn test_explicit_order_bypasses_extension_matching() {
    let order = [ConverterId::Mp4Box, ConverterId::AsfBin];
    let selected = selector().select(&request("x.xyz"), Some(&order)).unwrap();
    assert_eq!(ids(&selected), vec![ConverterId::Mp4Box, ConverterId::AsfBin]);
}

#[test]
fn test_retry_forces_universal_container_after_first_attempt() {
    let policy = RetryPolicy::default();
    let req = request("clip.wmv");
    let asf = candidate(ConverterId::AsfBin, &[".WMV"], &[], 4);

    let first = policy.adjust(&req, &asf, 0).unwrap();
    assert_eq!(first.options.container, None);

    let second = policy.adjust(&req, &asf, 1).unwrap();
    assert_eq!(second.options.container, Some(Container::Mkv));
    assert_eq!(second.cuts, req.cuts);

    let mut explicit = req.clone();
    explicit.options.container = Some(Container::Avi);
    let kept = policy.adjust(&explicit, &asf, 1).unwrap();
    assert_eq!(kept.options.container, Some(Container::Avi));

    let disabled = RetryPolicy {
        universal_container_on_retry: false,
    };
    assert_eq!(disabled.adjust(&req, &asf, 1).unwrap().options.container, None);
}

#[test]
fn test_retry_converts_frames_for_seconds_only_tools() {
    let mut req = request("clip.wmv");
    req.cuts = CutList::new(
        CutUnit::Frames,
        vec![
            CutPoint::new(Some(250.0), Some(500.0)).unwrap(),
            CutPoint::new(Some(750.0), None).unwrap(),
        ],
    )
    .unwrap();
    req.options.frame_rate = Some(25.0);

    let asf = candidate(ConverterId::AsfBin, &[".WMV"], &[], 4);
    let adjusted = RetryPolicy::default().adjust(&req, &asf, 0).unwrap();
    assert_eq!(adjusted.cuts.unit, CutUnit::Seconds);
    assert_eq!(adjusted.cuts.points[0].start, Some(10.0));
    assert_eq!(adjusted.cuts.points[1].start, Some(30.0));
    assert_eq!(adjusted.cuts.points[1].end, None);

    let ffmpeg = candidate(ConverterId::FFmpeg, &[".WMV"], &[Capability::FrameSplit], 1);
    let untouched = RetryPolicy::default().adjust(&req, &ffmpeg, 0).unwrap();
    assert_eq!(untouched.cuts.unit, CutUnit::Frames);
}

fn result(success: bool, failure: Option<&str>) -> RunResult {
    RunResult {
        command: "tool".to_string(),
        segment: None,
        exit_code: Some(if success { 0 } else { 1 }),
        stdout: String::new(),
        stderr: String::new(),
        success,
        failure: failure.map(str::to_string),
        warnings: Vec::new(),
        last_progress: None,
    }
}

#[test]
fn test_aggregate_is_strict_and() {
    let all = [result(true, None), result(true, None)];
    assert!(aggregate(&all).is_success());
    assert_eq!(aggregate(&all).successes, 2);

    let mixed = [result(true, None), result(false, Some("broken")), result(false, Some("later"))];
    let agg = aggregate(&mixed);
    assert_eq!(agg.successes, 1);
    assert_eq!(agg.total, 3);
    assert!(!agg.is_success());
    assert_eq!(first_failure(&mixed), Some("broken"));
}

#[test]
fn test_aggregate_of_nothing_is_vacuous_success() {
    let agg = aggregate(&[]);
    assert_eq!(agg.total, 0);
    assert!(agg.is_success());
}

#[test]
fn test_single_command_counts_every_segment() {
    let single = [result(true, None)];
    assert_eq!(
        aggregate_segments(&single, 2),
        AggregateResult { successes: 2, total: 2 }
    );
    assert_eq!(aggregate_segments(&single, 0).total, 1);

    let mut first = result(true, None);
    first.segment = Some(0);
    let mut second = result(false, Some("boom"));
    second.segment = Some(1);
    let per_segment = aggregate_segments(&[first, second], 2);
    assert!(per_segment.is_partial());
    assert_eq!(per_segment.to_string(), "1/2");
}
