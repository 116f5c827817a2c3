//! ScriptedGenerator - deterministic canned question generation.
//!
//! No network, no API key. Used by tests and by `--offline` server runs to
//! exercise the full session lifecycle without an upstream model.

use async_trait::async_trait;
use mockview_core::generation::{
    GeneratedOpening, GeneratedSummary, GeneratedTurn, GenerationError, InterviewContext,
    QuestionGenerator,
};
use mockview_core::session::Turn;

const QUESTION_BANK: &[&str] = &[
    "What project are you most proud of, and what was your role in it?",
    "Walk me through a technical decision you made that you would revisit today.",
    "How do you approach debugging a problem you have never seen before?",
    "Tell me about a time you disagreed with a teammate on a design.",
    "What would you want to learn in your first three months in this role?",
];

/// Deterministic generator: the same history always yields the same question.
#[derive(Default)]
pub struct ScriptedGenerator;

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl QuestionGenerator for ScriptedGenerator {
    async fn generate_opening(
        &self,
        context: &InterviewContext,
    ) -> Result<GeneratedOpening, GenerationError> {
        Ok(GeneratedOpening {
            question: format!(
                "Welcome to your {} interview. To start, tell me a bit about yourself and why this role interests you.",
                context.title
            ),
        })
    }

    async fn generate_next(
        &self,
        _context: &InterviewContext,
        history: &[Turn],
        answer: &str,
    ) -> Result<GeneratedTurn, GenerationError> {
        // One question per stored non-terminal turn so far; pick the next.
        let asked = history.iter().filter(|turn| !turn.is_terminal()).count();
        let question = QUESTION_BANK[asked.saturating_sub(1) % QUESTION_BANK.len()];
        Ok(GeneratedTurn {
            question: question.to_string(),
            feedback: Some(format!(
                "Noted ({} words). Consider adding a concrete example.",
                answer.split_whitespace().count()
            )),
        })
    }

    async fn generate_summary(
        &self,
        context: &InterviewContext,
        history: &[Turn],
    ) -> Result<GeneratedSummary, GenerationError> {
        let exchanges = history
            .iter()
            .filter(|turn| !turn.is_terminal() && !turn.is_opening())
            .count();
        Ok(GeneratedSummary {
            summary: format!(
                "Mock interview '{}' covered {} exchange(s). Review your answers and tighten the weakest one.",
                context.title, exchanges
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockview_core::session::RUN_STARTED;

    fn ctx() -> InterviewContext {
        InterviewContext {
            title: "Backend Engineer".to_string(),
            duration_minutes: 30,
            job_description: None,
            cv_summary: None,
        }
    }

    #[tokio::test]
    async fn test_opening_is_deterministic() {
        let generator = ScriptedGenerator::new();
        let a = generator.generate_opening(&ctx()).await.unwrap();
        let b = generator.generate_opening(&ctx()).await.unwrap();
        assert_eq!(a.question, b.question);
        assert!(a.question.contains("Backend Engineer"));
    }

    #[tokio::test]
    async fn test_next_depends_only_on_history_length() {
        let generator = ScriptedGenerator::new();
        let history = vec![Turn::new("run-1", 0, "opening q", RUN_STARTED, None)];

        let first = generator
            .generate_next(&ctx(), &history, "an answer")
            .await
            .unwrap();
        let again = generator
            .generate_next(&ctx(), &history, "a different answer")
            .await
            .unwrap();
        assert_eq!(first.question, again.question);
        assert!(first.feedback.is_some());
    }
}
