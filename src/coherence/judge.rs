//! External LLM judge for semantic coherence and observation text.
//!
//! Talks to an OpenAI-compatible chat completions endpoint. The judge is
//! strictly optional: the analyzer falls back to heuristic scores whenever
//! it is unreachable, rate-limited or returns garbage.

use crate::config::CoherenceConfig;
use crate::coherence::keys::KeyPool;
use crate::error::{ExpoError, Result};
use crate::types::Assignment;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Judge output for one participant.
#[derive(Debug, Clone)]
pub struct JudgeVerdict {
    /// 0-100.
    pub coherence_score: f64,
    /// Spanish feedback paragraph.
    pub feedback: String,
}

/// Trait seam so the analyzer can be tested without network access.
pub trait CoherenceJudge: Send + Sync {
    /// Score one participant's attributed text against the assignment.
    fn evaluate(&self, label: &str, text: &str, assignment: &Assignment) -> Result<JudgeVerdict>;
}

/// Implement CoherenceJudge for Arc<T> to allow sharing across runs.
impl<T: CoherenceJudge + ?Sized> CoherenceJudge for std::sync::Arc<T> {
    fn evaluate(&self, label: &str, text: &str, assignment: &Assignment) -> Result<JudgeVerdict> {
        (**self).evaluate(label, text, assignment)
    }
}

/// Per-criterion scores the model is asked to emit.
#[derive(Debug, Deserialize)]
struct JudgeResponse {
    #[serde(default = "default_criterion")]
    thematic_coherence: f64,
    #[serde(default = "default_criterion")]
    depth_understanding: f64,
    #[serde(default = "default_criterion")]
    content_relevance: f64,
    #[serde(default = "default_criterion")]
    structure_clarity: f64,
    #[serde(default)]
    feedback: String,
}

fn default_criterion() -> f64 {
    70.0
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Production judge over HTTP with credential rotation and bounded retry.
pub struct HttpJudge {
    client: reqwest::blocking::Client,
    config: CoherenceConfig,
    pool: &'static KeyPool,
    max_attempts: usize,
}

impl HttpJudge {
    pub fn new(config: CoherenceConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.judge_timeout_secs))
            .build()
            .map_err(|e| ExpoError::CoherenceJudge {
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            config,
            pool: KeyPool::shared(),
            max_attempts: crate::defaults::JUDGE_MAX_ATTEMPTS,
        })
    }

    /// True when the judge can be used at all.
    pub fn is_available(&self) -> bool {
        self.config.judge_enabled && !self.pool.is_empty()
    }

    fn request_once(&self, key: &str, prompt: &str) -> Result<JudgeVerdict> {
        let body = json!({
            "model": self.config.judge_model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "temperature": 0.3,
            "max_tokens": 1024,
        });

        let response = self
            .client
            .post(&self.config.judge_url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .map_err(|e| ExpoError::CoherenceJudge {
                message: format!("judge request failed: {}", e),
            })?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            self.pool.mark_rate_limited(key);
            return Err(ExpoError::CoherenceJudge {
                message: "judge rate limited".to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(ExpoError::CoherenceJudge {
                message: format!("judge returned HTTP {}", response.status()),
            });
        }

        let completion: ChatCompletion =
            response.json().map_err(|e| ExpoError::CoherenceJudge {
                message: format!("malformed judge response: {}", e),
            })?;
        let content = completion
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ExpoError::CoherenceJudge {
                message: "judge response had no choices".to_string(),
            })?;

        parse_verdict(content)
    }
}

impl CoherenceJudge for HttpJudge {
    fn evaluate(&self, label: &str, text: &str, assignment: &Assignment) -> Result<JudgeVerdict> {
        if !self.is_available() {
            return Err(ExpoError::CoherenceJudge {
                message: "judge disabled or no API keys configured".to_string(),
            });
        }

        let prompt = build_prompt(label, text, assignment);
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                // 1s, 2s, 4s, …
                std::thread::sleep(Duration::from_secs(1 << (attempt - 1)));
            }

            let Some(key) = self.pool.acquire() else {
                return Err(ExpoError::CoherenceJudge {
                    message: "all judge API keys are cooling down".to_string(),
                });
            };

            match self.request_once(&key, &prompt) {
                Ok(verdict) => {
                    debug!("judge scored {} at {:.1}", label, verdict.coherence_score);
                    return Ok(verdict);
                }
                Err(e) => {
                    warn!("judge attempt {} for {} failed: {}", attempt + 1, label, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ExpoError::CoherenceJudge {
            message: "judge exhausted all attempts".to_string(),
        }))
    }
}

const SYSTEM_PROMPT: &str = "Eres un evaluador académico experto en exposiciones orales. \
Evalúa objetivamente si lo que el estudiante dijo (según la transcripción) es coherente \
con las instrucciones de la asignación. Sé justo pero exigente, y proporciona \
retroalimentación específica y constructiva.";

fn build_prompt(label: &str, text: &str, assignment: &Assignment) -> String {
    // Keep the prompt under the model's context budget.
    let text = if text.len() > 4000 {
        let mut cut = 4000;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &text[..cut])
    } else {
        text.to_string()
    };

    let description = if assignment.description.is_empty() {
        "No se proporcionó descripción específica"
    } else {
        &assignment.description
    };

    format!(
        "Evalúa la coherencia entre lo que el estudiante dijo y las instrucciones.\n\n\
         ASIGNACIÓN\n\
         Título: {title}\n\
         Instrucciones: {description}\n\n\
         PARTICIPANTE: {label}\n\
         TRANSCRIPCIÓN:\n\"{text}\"\n\n\
         Evalúa de 0 a 100 cada criterio: coherencia temática (40%), comprensión y \
         profundidad (30%), relevancia del contenido (20%), estructura y claridad (10%).\n\n\
         Responde EXACTAMENTE en este formato JSON, sin texto adicional:\n\
         {{\n\
           \"thematic_coherence\": 85.0,\n\
           \"depth_understanding\": 75.0,\n\
           \"content_relevance\": 90.0,\n\
           \"structure_clarity\": 80.0,\n\
           \"feedback\": \"Análisis breve que explique la calificación.\"\n\
         }}",
        title = assignment.title,
        description = description,
        label = label,
        text = text,
    )
}

/// Extract the JSON object from the model output and fold the per-criterion
/// scores into one weighted coherence score.
fn parse_verdict(content: &str) -> Result<JudgeVerdict> {
    let start = content.find('{');
    let end = content.rfind('}');
    let (Some(start), Some(end)) = (start, end) else {
        return Err(ExpoError::CoherenceJudge {
            message: "no JSON object in judge output".to_string(),
        });
    };
    if end < start {
        return Err(ExpoError::CoherenceJudge {
            message: "malformed JSON object in judge output".to_string(),
        });
    }

    let parsed: JudgeResponse =
        serde_json::from_str(&content[start..=end]).map_err(|e| ExpoError::CoherenceJudge {
            message: format!("judge output is not valid JSON: {}", e),
        })?;

    let score = (parsed.thematic_coherence * 0.40
        + parsed.depth_understanding * 0.30
        + parsed.content_relevance * 0.20
        + parsed.structure_clarity * 0.10)
        .clamp(0.0, 100.0);

    Ok(JudgeVerdict {
        coherence_score: score,
        feedback: if parsed.feedback.is_empty() {
            "Análisis completado".to_string()
        } else {
            parsed.feedback
        },
    })
}

/// Mock judge for analyzer and orchestrator tests.
pub struct MockJudge {
    score: f64,
    feedback: String,
    should_fail: bool,
}

impl MockJudge {
    pub fn scoring(score: f64) -> Self {
        Self {
            score,
            feedback: "evaluación simulada".to_string(),
            should_fail: false,
        }
    }

    pub fn with_feedback(mut self, feedback: &str) -> Self {
        self.feedback = feedback.to_string();
        self
    }

    pub fn failing() -> Self {
        Self {
            score: 0.0,
            feedback: String::new(),
            should_fail: true,
        }
    }
}

impl CoherenceJudge for MockJudge {
    fn evaluate(&self, _label: &str, _text: &str, _assignment: &Assignment) -> Result<JudgeVerdict> {
        if self.should_fail {
            return Err(ExpoError::CoherenceJudge {
                message: "mock judge failure".to_string(),
            });
        }
        Ok(JudgeVerdict {
            coherence_score: self.score,
            feedback: self.feedback.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment() -> Assignment {
        Assignment {
            title: "El cambio climático".to_string(),
            description: "Causas y consecuencias".to_string(),
            max_score: 20.0,
            strictness: None,
        }
    }

    #[test]
    fn parse_verdict_weighs_criteria() {
        let content = r#"{"thematic_coherence": 100.0, "depth_understanding": 100.0,
            "content_relevance": 100.0, "structure_clarity": 0.0,
            "feedback": "muy bien"}"#;
        let verdict = parse_verdict(content).unwrap();
        assert!((verdict.coherence_score - 90.0).abs() < 1e-9);
        assert_eq!(verdict.feedback, "muy bien");
    }

    #[test]
    fn parse_verdict_extracts_json_from_prose() {
        let content = "Claro, aquí está la evaluación:\n```json\n{\"thematic_coherence\": 80.0, \
            \"depth_understanding\": 80.0, \"content_relevance\": 80.0, \
            \"structure_clarity\": 80.0, \"feedback\": \"ok\"}\n```";
        let verdict = parse_verdict(content).unwrap();
        assert!((verdict.coherence_score - 80.0).abs() < 1e-9);
    }

    #[test]
    fn parse_verdict_defaults_missing_criteria() {
        let verdict = parse_verdict(r#"{"feedback": "sin desglose"}"#).unwrap();
        assert!((verdict.coherence_score - 70.0).abs() < 1e-9);
    }

    #[test]
    fn parse_verdict_rejects_non_json() {
        assert!(parse_verdict("no hay nada estructurado aquí").is_err());
    }

    #[test]
    fn prompt_includes_assignment_and_text() {
        let prompt = build_prompt("Persona 1", "hablamos del clima", &assignment());
        assert!(prompt.contains("El cambio climático"));
        assert!(prompt.contains("Persona 1"));
        assert!(prompt.contains("hablamos del clima"));
    }

    #[test]
    fn prompt_truncates_very_long_text() {
        let long = "palabra ".repeat(2000);
        let prompt = build_prompt("Persona 1", &long, &assignment());
        assert!(prompt.len() < long.len());
        assert!(prompt.contains("..."));
    }

    #[test]
    fn mock_judge_scores_and_fails() {
        let good = MockJudge::scoring(88.0).with_feedback("excelente");
        let verdict = good.evaluate("Persona 1", "texto", &assignment()).unwrap();
        assert_eq!(verdict.coherence_score, 88.0);
        assert_eq!(verdict.feedback, "excelente");

        let bad = MockJudge::failing();
        assert!(bad.evaluate("Persona 1", "texto", &assignment()).is_err());
    }
}
