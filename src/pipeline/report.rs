//! Aggregate feedback: the Spanish text block summarizing the whole run.

use crate::types::{EvaluationResult, LivenessVerdict, ParticipantEvaluation, Transcript};

/// Build the group-level feedback text.
pub fn aggregate_feedback(
    transcript: &Transcript,
    liveness: Option<&LivenessVerdict>,
    evaluations: &[ParticipantEvaluation],
    max_score: f64,
) -> String {
    let mut out = String::new();

    if let Some(verdict) = liveness {
        out.push_str(&liveness_summary(verdict));
        out.push('\n');
    }

    out.push_str(&format!(
        "Transcripción: {} palabras en {:.0} segundos de audio.\n\n",
        transcript.word_count(),
        transcript.duration
    ));

    if evaluations.is_empty() {
        out.push_str("No hay resultados para mostrar.");
        return out;
    }

    out.push_str(&format!(
        "EVALUACIÓN GRUPAL - {} participante(s)\n\n",
        evaluations.len()
    ));

    // Ranking, best grade first.
    let mut ranked: Vec<&ParticipantEvaluation> = evaluations.iter().collect();
    ranked.sort_by(|a, b| b.final_grade.total_cmp(&a.final_grade));

    for (i, e) in ranked.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}\n   Calificación: {:.2}/{} ({})\n   Tiempo: {:.1}% · Aporte: {:.1}% · Coherencia: {:.1}/100 · {} palabras\n",
            i + 1,
            e.participant,
            e.final_grade,
            max_score,
            e.coherence_level.display_es(),
            e.time_percentage,
            e.contribution_percentage,
            e.coherence_score,
            e.word_count
        ));
    }
    out.push('\n');

    let avg_coherence: f64 =
        evaluations.iter().map(|e| e.coherence_score).sum::<f64>() / evaluations.len() as f64;
    let avg_grade: f64 =
        evaluations.iter().map(|e| e.final_grade).sum::<f64>() / evaluations.len() as f64;
    out.push_str("Estadísticas del grupo:\n");
    out.push_str(&format!("   Coherencia promedio: {:.1}/100\n", avg_coherence));
    out.push_str(&format!(
        "   Calificación promedio: {:.2}/{}\n",
        avg_grade, max_score
    ));
    out.push_str(&format!("   {}\n", equity_line(evaluations)));

    out
}

fn liveness_summary(verdict: &LivenessVerdict) -> String {
    let mut s = format!(
        "Autenticidad de la grabación: {} (score {:.1}/100, confianza {:.1}%).\n",
        verdict.classification.display_es(),
        verdict.liveness_score,
        verdict.confidence
    );
    if verdict.classification.is_suspect() {
        s.push_str(
            "Advertencia: el video muestra características de material pregrabado; \
             se recomienda verificar la autenticidad de la exposición.\n",
        );
    }
    s
}

/// Group equity judged from the spread of time shares.
fn equity_line(evaluations: &[ParticipantEvaluation]) -> &'static str {
    let stddev = time_percentage_stddev(evaluations);
    if stddev < 10.0 {
        "Participación muy equilibrada"
    } else if stddev < 20.0 {
        "Participación moderadamente equilibrada"
    } else {
        "Participación desigual"
    }
}

fn time_percentage_stddev(evaluations: &[ParticipantEvaluation]) -> f64 {
    if evaluations.is_empty() {
        return 0.0;
    }
    let n = evaluations.len() as f64;
    let mean = evaluations.iter().map(|e| e.time_percentage).sum::<f64>() / n;
    let var = evaluations
        .iter()
        .map(|e| (e.time_percentage - mean).powi(2))
        .sum::<f64>()
        / n;
    var.sqrt()
}

/// Assemble the final result, including `ai_score`.
pub fn build_result(
    transcript: Transcript,
    liveness: Option<LivenessVerdict>,
    evaluations: Vec<ParticipantEvaluation>,
    max_score: f64,
) -> EvaluationResult {
    let ai_score = if evaluations.is_empty() {
        0.0
    } else {
        crate::types::round2(
            evaluations.iter().map(|e| e.coherence_score).sum::<f64>() / evaluations.len() as f64,
        )
    };
    let aggregate = aggregate_feedback(&transcript, liveness.as_ref(), &evaluations, max_score);

    EvaluationResult {
        transcript,
        liveness,
        participants: evaluations,
        aggregate_feedback: aggregate,
        ai_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CoherenceLevel, RecordingKind, TranscriptSegment};

    fn evaluation(label: &str, grade: f64, time_pct: f64, score: f64) -> ParticipantEvaluation {
        ParticipantEvaluation {
            participant: label.to_string(),
            attributed_text: "texto".to_string(),
            word_count: 10,
            semantic_coherence: score,
            keyword_score: score,
            depth_score: score,
            coherence_score: score,
            coherence_level: CoherenceLevel::from_score(score),
            keywords_found: vec![],
            time_percentage: time_pct,
            contribution_percentage: 50.0,
            final_grade: grade,
            observation: String::new(),
            sin_rostro: false,
        }
    }

    fn transcript() -> Transcript {
        Transcript::from_segments(
            vec![TranscriptSegment {
                start: 0.0,
                end: 60.0,
                text: "una exposición de prueba".to_string(),
            }],
            "es",
        )
    }

    #[test]
    fn balanced_group_is_equilibrada() {
        let evals = vec![
            evaluation("Persona 1", 15.0, 52.0, 75.0),
            evaluation("Persona 2", 14.0, 48.0, 70.0),
        ];
        let text = aggregate_feedback(&transcript(), None, &evals, 20.0);
        assert!(text.contains("muy equilibrada"));
    }

    #[test]
    fn moderate_spread_is_moderada() {
        let evals = vec![
            evaluation("Persona 1", 15.0, 65.0, 75.0),
            evaluation("Persona 2", 14.0, 35.0, 70.0),
        ];
        let text = aggregate_feedback(&transcript(), None, &evals, 20.0);
        assert!(text.contains("moderadamente equilibrada"));
    }

    #[test]
    fn unequal_group_is_desigual() {
        let evals = vec![
            evaluation("Persona 1", 15.0, 70.0, 75.0),
            evaluation("Persona 2", 10.0, 20.0, 60.0),
            evaluation("Persona 3", 5.0, 10.0, 40.0),
        ];
        let text = aggregate_feedback(&transcript(), None, &evals, 20.0);
        assert!(text.contains("desigual"));
    }

    #[test]
    fn ranking_sorts_by_grade_desc() {
        let evals = vec![
            evaluation("Persona 1", 10.0, 50.0, 50.0),
            evaluation("Persona 2", 18.0, 50.0, 90.0),
        ];
        let text = aggregate_feedback(&transcript(), None, &evals, 20.0);
        let first = text.find("1. Persona 2").expect("best participant ranked first");
        let second = text.find("2. Persona 1").expect("other participant ranked second");
        assert!(first < second);
    }

    #[test]
    fn suspect_liveness_adds_pregrabado_warning() {
        let verdict = LivenessVerdict {
            classification: RecordingKind::LikelyRecorded,
            liveness_score: 45.0,
            confidence: 55.0,
        };
        let evals = vec![evaluation("Persona 1", 15.0, 100.0, 75.0)];
        let text = aggregate_feedback(&transcript(), Some(&verdict), &evals, 20.0);
        assert!(text.contains("pregrabado"));
    }

    #[test]
    fn live_verdict_has_no_warning() {
        let verdict = LivenessVerdict {
            classification: RecordingKind::Live,
            liveness_score: 88.0,
            confidence: 88.0,
        };
        let evals = vec![evaluation("Persona 1", 15.0, 100.0, 75.0)];
        let text = aggregate_feedback(&transcript(), Some(&verdict), &evals, 20.0);
        assert!(!text.contains("Advertencia"));
        assert!(text.contains("Autenticidad"));
    }

    #[test]
    fn ai_score_is_mean_of_coherence() {
        let result = build_result(
            transcript(),
            None,
            vec![
                evaluation("Persona 1", 15.0, 50.0, 80.0),
                evaluation("Persona 2", 10.0, 50.0, 60.0),
            ],
            20.0,
        );
        assert_eq!(result.ai_score, 70.0);
    }

    #[test]
    fn empty_group_scores_zero() {
        let result = build_result(transcript(), None, vec![], 20.0);
        assert_eq!(result.ai_score, 0.0);
        assert!(result.aggregate_feedback.contains("No hay resultados"));
    }
}
