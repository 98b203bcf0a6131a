//! Per-participant competence evaluation: heuristic sub-scores, optional
//! LLM judge, strictness-weighted composite and the final grade.

use crate::coherence::heuristic;
use crate::coherence::judge::CoherenceJudge;
use crate::config::CoherenceConfig;
use crate::defaults;
use crate::types::{round2, Assignment, CoherenceLevel, ParticipantEvaluation};
use log::{info, warn};

/// One participant's input to the analyzer.
#[derive(Debug, Clone)]
pub struct ParticipantInput {
    pub label: String,
    pub attributed_text: String,
    /// Seconds of on-screen time.
    pub time_seconds: f64,
    /// True for the synthetic participant created when no face was found.
    pub sin_rostro: bool,
}

pub struct CoherenceAnalyzer {
    config: CoherenceConfig,
    judge: Option<Box<dyn CoherenceJudge>>,
}

impl CoherenceAnalyzer {
    pub fn new(config: CoherenceConfig) -> Self {
        Self {
            config,
            judge: None,
        }
    }

    pub fn with_judge(mut self, judge: Box<dyn CoherenceJudge>) -> Self {
        self.judge = Some(judge);
        self
    }

    /// Evaluate every participant against the assignment.
    ///
    /// `video_duration` drives `time_percentage`; word shares drive
    /// `contribution_percentage`.
    pub fn evaluate_group(
        &self,
        inputs: &[ParticipantInput],
        assignment: &Assignment,
        video_duration: f64,
    ) -> Vec<ParticipantEvaluation> {
        info!(
            "evaluating {} participant(s) against \"{}\"",
            inputs.len(),
            assignment.title
        );

        let mut evaluations: Vec<ParticipantEvaluation> = inputs
            .iter()
            .map(|input| self.evaluate_one(input, assignment, video_duration))
            .collect();

        let total_words: usize = evaluations.iter().map(|e| e.word_count).sum();
        for evaluation in &mut evaluations {
            evaluation.contribution_percentage = if total_words > 0 {
                round2(evaluation.word_count as f64 / total_words as f64 * 100.0)
            } else {
                0.0
            };
        }

        evaluations
    }

    fn evaluate_one(
        &self,
        input: &ParticipantInput,
        assignment: &Assignment,
        video_duration: f64,
    ) -> ParticipantEvaluation {
        let text = input.attributed_text.trim();
        let time_percentage = if video_duration > 0.0 {
            round2((input.time_seconds / video_duration * 100.0).min(100.0))
        } else {
            0.0
        };

        if text.chars().count() < defaults::MIN_SCORABLE_CHARS {
            return ParticipantEvaluation {
                participant: input.label.clone(),
                attributed_text: text.to_string(),
                word_count: text.split_whitespace().count(),
                semantic_coherence: 0.0,
                keyword_score: 0.0,
                depth_score: 0.0,
                coherence_score: 0.0,
                coherence_level: CoherenceLevel::Insuficiente,
                keywords_found: Vec::new(),
                time_percentage,
                contribution_percentage: 0.0,
                final_grade: 0.0,
                observation: "Participación muy breve o sin contenido relevante".to_string(),
                sin_rostro: input.sin_rostro,
            };
        }

        let keywords =
            heuristic::keyword_score(text, &assignment.title, &assignment.description);
        let depth = heuristic::depth_score(text);
        let heuristic_semantic =
            heuristic::semantic_coherence(text, &assignment.title, &assignment.description);

        // Judge replaces the semantic sub-score and observation when it
        // answers; any failure falls back to the heuristics.
        let (semantic, judge_feedback, judged) = match &self.judge {
            Some(judge) if self.config.judge_enabled => {
                match judge.evaluate(&input.label, text, assignment) {
                    Ok(verdict) => (verdict.coherence_score, Some(verdict.feedback), true),
                    Err(e) => {
                        warn!("judge unavailable for {}: {}", input.label, e);
                        (heuristic_semantic, None, false)
                    }
                }
            }
            _ => (heuristic_semantic, None, false),
        };

        let [w_semantic, w_keyword, w_depth] = self
            .config
            .weights
            .for_strictness(assignment.strictness());
        let coherence_score =
            (semantic * w_semantic + keywords.score * w_keyword + depth * w_depth)
                .clamp(0.0, 100.0);

        let level = CoherenceLevel::from_score(coherence_score);
        let observation = match judge_feedback {
            Some(feedback) => feedback,
            None => {
                let base = level_observation(level);
                if self.config.judge_enabled && self.judge.is_some() && !judged {
                    format!("{} ({})", base, defaults::HEURISTIC_FALLBACK_MARKER)
                } else {
                    base.to_string()
                }
            }
        };

        ParticipantEvaluation {
            participant: input.label.clone(),
            attributed_text: text.to_string(),
            word_count: text.split_whitespace().count(),
            semantic_coherence: round2(semantic),
            keyword_score: round2(keywords.score),
            depth_score: round2(depth),
            coherence_score: round2(coherence_score),
            coherence_level: level,
            keywords_found: keywords.found,
            time_percentage,
            contribution_percentage: 0.0,
            final_grade: round2(coherence_score / 100.0 * assignment.max_score),
            observation,
            sin_rostro: input.sin_rostro,
        }
    }
}

fn level_observation(level: CoherenceLevel) -> &'static str {
    match level {
        CoherenceLevel::Excelente => {
            "Discurso altamente coherente y bien estructurado con el tema asignado"
        }
        CoherenceLevel::MuyBuena => "Muy buena relación con el tema, aborda los puntos principales",
        CoherenceLevel::Buena => "Buena coherencia con el tema, cubre aspectos relevantes",
        CoherenceLevel::Regular => "Coherencia moderada, se desvía parcialmente del tema",
        CoherenceLevel::Baja => "Poca coherencia con el tema asignado, varios desvíos",
        CoherenceLevel::Insuficiente => {
            "Contenido insuficiente o muy poco relacionado con el tema"
        }
    }
}
