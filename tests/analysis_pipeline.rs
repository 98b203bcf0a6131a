//! End-to-end pipeline scenarios with mock stage backends.
//!
//! Every scenario drives the full orchestrator (attribution, coherence,
//! report) and only replaces the media-bound stages.

use expoeval::coherence::{CoherenceJudge, MockJudge};
use expoeval::config::AnalysisConfig;
use expoeval::defaults;
use expoeval::error::ExpoError;
use expoeval::faces::MockFaceTracker;
use expoeval::liveness::MockLiveness;
use expoeval::media::MockAudioExtractor;
use expoeval::pipeline::{Analyzer, CollectingSink};
use expoeval::stt::MockTranscriber;
use expoeval::types::{
    Assignment, CoherenceLevel, LivenessVerdict, RecordingKind, Strictness, TranscriptSegment,
};
use std::path::Path;
use std::sync::Arc;

fn assignment() -> Assignment {
    Assignment {
        title: "Las derivadas".to_string(),
        description: "Definición de la derivada, reglas de derivación y aplicaciones".to_string(),
        max_score: 20.0,
        strictness: None,
    }
}

/// Two on-topic Spanish segments covering the first minute.
fn presentation_segments() -> Vec<TranscriptSegment> {
    vec![
        TranscriptSegment {
            start: 0.0,
            end: 30.0,
            text: "La derivada mide la razón de cambio instantánea de una función, \
                   porque representa la pendiente de la recta tangente. Por ejemplo, \
                   las reglas de derivación permiten calcular derivadas complejas."
                .to_string(),
        },
        TranscriptSegment {
            start: 30.0,
            end: 60.0,
            text: "Además, las aplicaciones de la derivada incluyen optimización y \
                   análisis de funciones. En conclusión, la definición formal es \
                   fundamental para el cálculo diferencial."
                .to_string(),
        },
    ]
}

fn analyzer(
    transcriber: MockTranscriber,
    tracker: MockFaceTracker,
    liveness: MockLiveness,
    judge: Arc<dyn CoherenceJudge>,
) -> Analyzer {
    Analyzer::with_stages(
        AnalysisConfig::default(),
        Arc::new(MockAudioExtractor::silence(60.0)),
        Arc::new(transcriber),
        Arc::new(tracker),
        Arc::new(liveness),
        Some(judge),
    )
}

#[test]
fn solo_speaker_gets_the_whole_transcript() {
    let analyzer = analyzer(
        MockTranscriber::new("mock").with_segments(presentation_segments()),
        MockFaceTracker::with_participants(vec![vec![(0.0, 60.0)]], 60.0),
        MockLiveness::no_verdict(),
        Arc::new(MockJudge::scoring(85.0)),
    );
    let sink = CollectingSink::new();
    let result = analyzer
        .analyze(Path::new("video.mp4"), &assignment(), &sink)
        .unwrap();

    assert_eq!(result.participants.len(), 1);
    let p = &result.participants[0];
    assert_eq!(p.attributed_text, result.transcript.full_text);
    assert_eq!(p.time_percentage, 100.0);
    assert_eq!(p.contribution_percentage, 100.0);
    assert!(!p.sin_rostro);

    // Grade derives from the coherence score alone.
    let expected = (p.coherence_score / 100.0 * 20.0 * 100.0).round() / 100.0;
    assert_eq!(p.final_grade, expected);
    assert_eq!(p.coherence_level, CoherenceLevel::from_score(p.coherence_score));
}

#[test]
fn balanced_pair_reads_as_equilibrada() {
    let analyzer = analyzer(
        MockTranscriber::new("mock").with_segments(presentation_segments()),
        MockFaceTracker::with_participants(vec![vec![(0.0, 30.0)], vec![(30.0, 60.0)]], 60.0),
        MockLiveness::no_verdict(),
        Arc::new(MockJudge::scoring(75.0)),
    );
    let sink = CollectingSink::new();
    let result = analyzer
        .analyze(Path::new("video.mp4"), &assignment(), &sink)
        .unwrap();

    assert_eq!(result.participants.len(), 2);
    assert!(result.aggregate_feedback.contains("muy equilibrada"));
    let total_contribution: f64 = result
        .participants
        .iter()
        .map(|p| p.contribution_percentage)
        .sum();
    assert!((total_contribution - 100.0).abs() < 1.0);
}

#[test]
fn unequal_trio_reads_as_desigual() {
    let analyzer = analyzer(
        MockTranscriber::new("mock").with_segments(presentation_segments()),
        MockFaceTracker::with_participants(
            vec![vec![(0.0, 42.0)], vec![(42.0, 54.0)], vec![(54.0, 60.0)]],
            60.0,
        ),
        MockLiveness::no_verdict(),
        Arc::new(MockJudge::scoring(70.0)),
    );
    let sink = CollectingSink::new();
    let result = analyzer
        .analyze(Path::new("video.mp4"), &assignment(), &sink)
        .unwrap();

    assert_eq!(result.participants.len(), 3);
    assert!(result.aggregate_feedback.contains("desigual"));
}

#[test]
fn silent_video_fails_with_no_audio() {
    let analyzer = analyzer(
        MockTranscriber::new("mock").with_text(""),
        MockFaceTracker::with_participants(vec![vec![(0.0, 60.0)]], 60.0),
        MockLiveness::no_verdict(),
        Arc::new(MockJudge::scoring(70.0)),
    );
    let sink = CollectingSink::new();
    let err = analyzer
        .analyze(Path::new("video.mp4"), &assignment(), &sink)
        .unwrap_err();

    assert!(matches!(err, ExpoError::NoAudioDetected));
    assert!(sink.failed());
    assert!(!sink.percentages().contains(&100));
}

#[test]
fn faceless_video_evaluates_a_synthetic_participant() {
    let analyzer = analyzer(
        MockTranscriber::new("mock").with_segments(presentation_segments()),
        MockFaceTracker::failing(),
        MockLiveness::no_verdict(),
        Arc::new(MockJudge::scoring(80.0)),
    );
    let sink = CollectingSink::new();
    let result = analyzer
        .analyze(Path::new("video.mp4"), &assignment(), &sink)
        .unwrap();

    assert_eq!(result.participants.len(), 1);
    let p = &result.participants[0];
    assert_eq!(p.participant, defaults::SIN_ROSTRO_LABEL);
    assert!(p.sin_rostro);
    assert_eq!(p.attributed_text, result.transcript.full_text);
    assert!(p.final_grade > 0.0);
}

#[test]
fn recorded_replay_adds_a_warning() {
    let verdict = LivenessVerdict {
        classification: RecordingKind::LikelyRecorded,
        liveness_score: 45.0,
        confidence: 55.0,
    };
    let analyzer = analyzer(
        MockTranscriber::new("mock").with_segments(presentation_segments()),
        MockFaceTracker::with_participants(vec![vec![(0.0, 60.0)]], 60.0),
        MockLiveness::with_verdict(verdict),
        Arc::new(MockJudge::scoring(70.0)),
    );
    let sink = CollectingSink::new();
    let result = analyzer
        .analyze(Path::new("video.mp4"), &assignment(), &sink)
        .unwrap();

    assert!(result.liveness.is_some());
    assert!(result.aggregate_feedback.contains("pregrabado"));
    // The verdict never changes the grade path.
    assert!(result.participants[0].final_grade > 0.0);
}

#[test]
fn unreachable_judge_marks_the_observation() {
    let analyzer = analyzer(
        MockTranscriber::new("mock").with_segments(presentation_segments()),
        MockFaceTracker::with_participants(vec![vec![(0.0, 60.0)]], 60.0),
        MockLiveness::no_verdict(),
        Arc::new(MockJudge::failing()),
    );
    let sink = CollectingSink::new();
    let result = analyzer
        .analyze(Path::new("video.mp4"), &assignment(), &sink)
        .unwrap();

    assert!(result.participants[0]
        .observation
        .contains(defaults::HEURISTIC_FALLBACK_MARKER));
}

#[test]
fn judge_score_replaces_the_semantic_component() {
    let analyzer = analyzer(
        MockTranscriber::new("mock").with_segments(presentation_segments()),
        MockFaceTracker::with_participants(vec![vec![(0.0, 60.0)]], 60.0),
        MockLiveness::no_verdict(),
        Arc::new(MockJudge::scoring(95.0).with_feedback("excelente dominio del tema")),
    );
    let sink = CollectingSink::new();
    let result = analyzer
        .analyze(Path::new("video.mp4"), &assignment(), &sink)
        .unwrap();

    let p = &result.participants[0];
    assert_eq!(p.semantic_coherence, 95.0);
    assert!(p.observation.contains("excelente dominio del tema"));
    assert!(!p.observation.contains(defaults::HEURISTIC_FALLBACK_MARKER));
}

#[test]
fn strictness_shifts_weight_onto_semantics() {
    let run = |strictness: Strictness| {
        let analyzer = analyzer(
            MockTranscriber::new("mock").with_segments(presentation_segments()),
            MockFaceTracker::with_participants(vec![vec![(0.0, 60.0)]], 60.0),
            MockLiveness::no_verdict(),
            Arc::new(MockJudge::scoring(100.0)),
        );
        let sink = CollectingSink::new();
        let mut assignment = assignment();
        assignment.strictness = Some(strictness);
        analyzer
            .analyze(Path::new("video.mp4"), &assignment, &sink)
            .unwrap()
            .participants[0]
            .coherence_score
    };

    let strict = run(Strictness::Strict);
    let lenient = run(Strictness::Lenient);
    // With semantics pinned to 100 and imperfect keyword/depth sub-scores,
    // the strict profile must come out ahead.
    assert!(strict > lenient, "strict {} <= lenient {}", strict, lenient);
}

#[test]
fn missing_timestamps_fall_back_to_annotated_proportional_split() {
    // Zero-duration segments leave no usable timeline, so the transcript
    // must be split by word count.
    let segments: Vec<TranscriptSegment> = presentation_segments()
        .into_iter()
        .map(|mut s| {
            s.start = 0.0;
            s.end = 0.0;
            s
        })
        .collect();
    let analyzer = analyzer(
        MockTranscriber::new("mock").with_segments(segments),
        MockFaceTracker::with_participants(vec![vec![(0.0, 30.0)], vec![(30.0, 60.0)]], 60.0),
        MockLiveness::no_verdict(),
        Arc::new(MockJudge::scoring(70.0)),
    );
    let sink = CollectingSink::new();
    let result = analyzer
        .analyze(Path::new("video.mp4"), &assignment(), &sink)
        .unwrap();

    assert_eq!(result.participants.len(), 2);
    for p in &result.participants {
        assert!(p.word_count > 0, "{} got no words", p.participant);
        assert!(
            p.observation.contains("atribuido proporcionalmente"),
            "missing annotation: {}",
            p.observation
        );
    }
}

#[test]
fn progress_protocol_is_exact_on_success() {
    let analyzer = analyzer(
        MockTranscriber::new("mock").with_segments(presentation_segments()),
        MockFaceTracker::with_participants(vec![vec![(0.0, 60.0)]], 60.0),
        MockLiveness::no_verdict(),
        Arc::new(MockJudge::scoring(70.0)),
    );
    let sink = CollectingSink::new();
    analyzer
        .analyze(Path::new("video.mp4"), &assignment(), &sink)
        .unwrap();

    assert_eq!(sink.percentages(), vec![0, 15, 30, 50, 70, 90, 100]);
    assert!(!sink.failed());
}

#[test]
fn repeated_runs_are_deterministic() {
    let analyzer = analyzer(
        MockTranscriber::new("mock").with_segments(presentation_segments()),
        MockFaceTracker::with_participants(vec![vec![(0.0, 30.0)], vec![(30.0, 60.0)]], 60.0),
        MockLiveness::no_verdict(),
        Arc::new(MockJudge::failing()),
    );

    let run = || {
        let sink = CollectingSink::new();
        analyzer
            .analyze(Path::new("video.mp4"), &assignment(), &sink)
            .unwrap()
    };
    let first = run();
    let second = run();

    assert_eq!(first.participants.len(), second.participants.len());
    for (a, b) in first.participants.iter().zip(&second.participants) {
        assert_eq!(a.participant, b.participant);
        assert_eq!(a.coherence_score, b.coherence_score);
        assert_eq!(a.final_grade, b.final_grade);
        assert_eq!(a.attributed_text, b.attributed_text);
    }
    assert_eq!(first.ai_score, second.ai_score);
}
