//! The orchestrator: runs the full analysis of one video.
//!
//! Stage layout per run: audio extraction feeding transcription on one
//! worker thread, liveness and face tracking on their own threads, a
//! barrier joining all three, then attribution and coherence sequentially.
//! Progress lands on the caller's sink at the fixed protocol percentages.

use crate::attribution::Attributor;
use crate::coherence::analyzer::ParticipantInput;
use crate::coherence::{CoherenceAnalyzer, CoherenceJudge, HttpJudge};
use crate::config::AnalysisConfig;
use crate::defaults;
use crate::error::{ExpoError, Result};
use crate::faces::{FaceTracker, ParticipantTracker, TrackingResult};
use crate::liveness::{LivenessDetector, LivenessProbe};
use crate::media::{AudioExtractor, AudioTrack, FfmpegAudioExtractor};
use crate::pipeline::progress::ProgressSink;
use crate::pipeline::report;
use crate::stt::Transcriber;
use crate::types::{
    Assignment, EvaluationResult, FaceAppearance, Participant, Transcript,
};
use crossbeam_channel::RecvTimeoutError;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Margin added to stage deadlines over the raw decoder timeout, covering
/// spawn and channel overhead.
const STAGE_DEADLINE_MARGIN_SECS: u64 = 30;

pub struct Analyzer {
    config: AnalysisConfig,
    extractor: Arc<dyn AudioExtractor>,
    transcriber: Arc<dyn Transcriber>,
    tracker: Arc<dyn FaceTracker>,
    liveness: Arc<dyn LivenessProbe>,
    judge: Option<Arc<dyn CoherenceJudge>>,
    /// Where participant photos are written, when set.
    photo_dir: Option<PathBuf>,
}

impl Analyzer {
    /// Build an analyzer with the production stage implementations.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        crate::media::init_decoder_env(config.media.ffmpeg_path.as_deref())?;

        let transcriber = crate::stt::shared(&config.stt)?;
        let judge: Option<Arc<dyn CoherenceJudge>> = if config.coherence.judge_enabled {
            let judge = HttpJudge::new(config.coherence.clone())?;
            judge.is_available().then(|| Arc::new(judge) as Arc<dyn CoherenceJudge>)
        } else {
            None
        };

        Ok(Self {
            extractor: Arc::new(FfmpegAudioExtractor::new(config.media.clone())),
            transcriber,
            tracker: Arc::new(ParticipantTracker::new(
                config.media.clone(),
                config.faces.clone(),
            )),
            liveness: Arc::new(LivenessDetector::new(config.media.clone())),
            judge,
            photo_dir: None,
            config,
        })
    }

    /// Build an analyzer from explicit stage implementations (tests, or
    /// hosts that bring their own backends).
    pub fn with_stages(
        config: AnalysisConfig,
        extractor: Arc<dyn AudioExtractor>,
        transcriber: Arc<dyn Transcriber>,
        tracker: Arc<dyn FaceTracker>,
        liveness: Arc<dyn LivenessProbe>,
        judge: Option<Arc<dyn CoherenceJudge>>,
    ) -> Self {
        Self {
            config,
            extractor,
            transcriber,
            tracker,
            liveness,
            judge,
            photo_dir: None,
        }
    }

    pub fn with_photo_dir(mut self, dir: PathBuf) -> Self {
        self.photo_dir = Some(dir);
        self
    }

    /// Run the full analysis of one video.
    ///
    /// Emits progress on `sink`; the terminal event is exactly one of
    /// `update(100, "complete")` or `fail(reason)`. Hard failures also
    /// return `Err`.
    pub fn analyze(
        &self,
        video: &Path,
        assignment: &Assignment,
        sink: &dyn ProgressSink,
    ) -> Result<EvaluationResult> {
        match self.run(video, assignment, sink) {
            Ok(result) => {
                sink.update(100, "complete");
                Ok(result)
            }
            Err(e) => {
                sink.fail(&e.user_message());
                Err(e)
            }
        }
    }

    fn run(
        &self,
        video: &Path,
        assignment: &Assignment,
        sink: &dyn ProgressSink,
    ) -> Result<EvaluationResult> {
        info!("analyzing {} against \"{}\"", video.display(), assignment.title);
        sink.update(0, "start");

        let stage_deadline = Duration::from_secs(
            self.config.media.decoder_timeout_secs + STAGE_DEADLINE_MARGIN_SECS,
        );

        // Stage A→B: audio extraction, then transcription, on one worker.
        // The audio track is reported back first so the transcription
        // deadline can scale with its duration.
        let (audio_tx, audio_rx) = crossbeam_channel::bounded::<Result<AudioTrack>>(1);
        let (transcript_tx, transcript_rx) = crossbeam_channel::bounded::<Result<Transcript>>(1);
        {
            let extractor = Arc::clone(&self.extractor);
            let transcriber = Arc::clone(&self.transcriber);
            let video = video.to_path_buf();
            std::thread::spawn(move || {
                let audio = match extractor.extract(&video) {
                    Ok(audio) => audio,
                    Err(e) => {
                        let _ = audio_tx.send(Err(e));
                        return;
                    }
                };
                let _ = audio_tx.send(Ok(audio.clone()));
                let _ = transcript_tx.send(transcriber.transcribe(&audio));
            });
        }

        // Stage C: liveness on its own thread.
        sink.update(15, "liveness begun");
        let (liveness_tx, liveness_rx) = crossbeam_channel::bounded(1);
        {
            let liveness = Arc::clone(&self.liveness);
            let video = video.to_path_buf();
            std::thread::spawn(move || {
                let _ = liveness_tx.send(liveness.analyze(&video));
            });
        }

        // Stage D: face tracking on its own thread.
        sink.update(30, "face detection begun");
        let (tracking_tx, tracking_rx) = crossbeam_channel::bounded::<Result<TrackingResult>>(1);
        {
            let tracker = Arc::clone(&self.tracker);
            let video = video.to_path_buf();
            std::thread::spawn(move || {
                let _ = tracking_tx.send(tracker.track(&video));
            });
        }

        // Barrier: audio first, so transcription progress can be reported.
        let audio = recv_stage(&audio_rx, stage_deadline, || ExpoError::AudioExtraction {
            message: "audio extraction timed out".to_string(),
        })??;

        sink.update(50, "transcription begun");
        let transcribe_deadline = Duration::from_secs(
            (audio.duration_secs() * defaults::TRANSCRIBE_TIMEOUT_FACTOR as f64) as u64,
        )
        .max(Duration::from_secs(defaults::TRANSCRIBE_TIMEOUT_FLOOR_SECS));
        let transcript = recv_stage(&transcript_rx, transcribe_deadline, || {
            ExpoError::Transcription {
                message: "transcription timed out".to_string(),
            }
        })??;

        if transcript.is_empty() {
            return Err(ExpoError::NoAudioDetected);
        }

        // Soft stages: a missing verdict or a tracking failure never stops
        // the run.
        let liveness = match liveness_rx.recv_timeout(stage_deadline) {
            Ok(verdict) => verdict,
            Err(_) => {
                warn!("liveness stage did not report in time");
                None
            }
        };
        let tracking = match tracking_rx.recv_timeout(stage_deadline) {
            Ok(Ok(tracking)) => tracking,
            Ok(Err(e)) => {
                warn!("face tracking failed: {}", e);
                TrackingResult::default()
            }
            Err(_) => {
                warn!("face tracking did not report in time");
                TrackingResult::default()
            }
        };

        let video_duration = if tracking.video_duration > 0.0 {
            tracking.video_duration
        } else {
            audio.duration_secs().max(transcript.duration)
        };

        sink.update(70, "coherence analysis begun");
        let (inputs, estimated) =
            self.attribute(&transcript, &tracking.participants, &audio, video_duration);

        let mut analyzer = CoherenceAnalyzer::new(self.config.coherence.clone());
        if let Some(judge) = &self.judge {
            analyzer = analyzer.with_judge(Box::new(Arc::clone(judge)));
        }
        let mut evaluations = analyzer.evaluate_group(&inputs, assignment, video_duration);
        if self.config.attribution.annotate_proportional {
            for (evaluation, estimated) in evaluations.iter_mut().zip(&estimated) {
                if *estimated {
                    evaluation
                        .observation
                        .push_str(" (texto atribuido proporcionalmente)");
                }
            }
        }

        sink.update(90, "feedback generation");
        self.write_photos(&tracking.participants);
        Ok(report::build_result(
            transcript,
            liveness,
            evaluations,
            assignment.max_score,
        ))
    }

    /// Attribute speech and shape the analyzer inputs, covering the
    /// synthetic no-face participant. The second vector flags inputs whose
    /// text came from the proportional word split.
    fn attribute(
        &self,
        transcript: &Transcript,
        participants: &[Participant],
        audio: &AudioTrack,
        video_duration: f64,
    ) -> (Vec<ParticipantInput>, Vec<bool>) {
        if participants.is_empty() {
            info!("no faces detected, attributing everything to a synthetic participant");
            let synthetic = Participant {
                id: defaults::SIN_ROSTRO_LABEL.to_string(),
                appearances: vec![FaceAppearance {
                    start: 0.0,
                    end: video_duration,
                }],
                total_time: video_duration,
                percentage_of_video: 100.0,
                photo: None,
            };
            return (
                vec![ParticipantInput {
                    label: synthetic.id,
                    attributed_text: transcript.full_text.clone(),
                    time_seconds: video_duration,
                    sin_rostro: true,
                }],
                vec![false],
            );
        }

        let attributor = Attributor::new(self.config.attribution.clone());
        let attributions = attributor.attribute(transcript, participants, Some(audio));

        let estimated: Vec<bool> = attributions.iter().map(|a| a.estimated).collect();
        let inputs = participants
            .iter()
            .zip(attributions)
            .map(|(participant, attribution)| ParticipantInput {
                label: participant.id.clone(),
                attributed_text: attribution.attributed_text,
                time_seconds: participant.total_time,
                sin_rostro: false,
            })
            .collect();
        (inputs, estimated)
    }

    fn write_photos(&self, participants: &[Participant]) {
        let Some(dir) = &self.photo_dir else {
            return;
        };
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!("could not create photo directory {}: {}", dir.display(), e);
            return;
        }
        for participant in participants {
            let Some(photo) = &participant.photo else {
                continue;
            };
            let name = format!("{}.jpg", participant.id.replace(' ', "_").to_lowercase());
            let path = dir.join(name);
            if let Err(e) = std::fs::write(&path, photo) {
                warn!("could not write {}: {}", path.display(), e);
            }
        }
    }
}

fn recv_stage<T>(
    rx: &crossbeam_channel::Receiver<T>,
    deadline: Duration,
    on_timeout: impl FnOnce() -> ExpoError,
) -> Result<T> {
    rx.recv_timeout(deadline).map_err(|e| match e {
        RecvTimeoutError::Timeout => on_timeout(),
        RecvTimeoutError::Disconnected => on_timeout(),
    })
}
