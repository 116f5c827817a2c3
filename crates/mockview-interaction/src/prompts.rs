//! Prompt rendering for the interviewer persona.
//!
//! Templates are rendered with minijinja. The stage ladder paces the
//! interview through intro, technical, behavioral, and closing phases based
//! on how many questions have been asked relative to the duration budget.

use minijinja::{context, Environment};
use mockview_core::generation::{GenerationError, InterviewContext};
use mockview_core::session::{reconstruct_transcript, Turn, TranscriptRole};
use std::sync::OnceLock;

const OPENING_TEMPLATE: &str = r#"You are a professional interviewer conducting a mock interview titled "{{ title }}" ({{ duration_minutes }} minutes).
{% if cv_summary %}Candidate CV summary:
{{ cv_summary }}
{% endif %}{% if job_description %}Job description summary:
{{ job_description }}
{% endif %}
Greet the candidate briefly and ask one opening question inviting them to introduce themselves in relation to the role. Respond with the question only, no preamble."#;

const NEXT_TEMPLATE: &str = r#"You are a professional interviewer conducting a mock interview titled "{{ title }}" ({{ duration_minutes }} minutes). The interview is in its {{ stage }} stage.
{% if cv_summary %}Candidate CV summary:
{{ cv_summary }}
{% endif %}{% if job_description %}Job description summary:
{{ job_description }}
{% endif %}
Conversation so far:
{{ transcript }}

The candidate just answered:
{{ answer }}

Ask the next question, adapted to the stage and the candidate's answer. Optionally give one sentence of constructive feedback on the answer.
Respond with a JSON object: {"question": "...", "feedback": "..." } where "feedback" may be omitted."#;

const SUMMARY_TEMPLATE: &str = r#"You are a professional interviewer wrapping up a mock interview titled "{{ title }}".

Conversation:
{{ transcript }}

Write a short closing summary (3-5 sentences) of the candidate's performance: strengths, gaps, and one concrete suggestion. Respond with the summary only."#;

/// Interview stage for a given question count, paced by the duration budget.
///
/// Assumes roughly one exchange per two minutes; the thresholds follow the
/// intro (30%), technical (70%), behavioral (90%), closing ladder.
pub fn stage(question_count: usize, duration_minutes: u32) -> &'static str {
    let total_questions = (duration_minutes / 2).max(1) as f64;
    let ratio = question_count as f64 / total_questions;
    if question_count == 0 || ratio <= 0.3 {
        "intro"
    } else if ratio <= 0.7 {
        "technical"
    } else if ratio <= 0.9 {
        "behavioral"
    } else {
        "closing"
    }
}

fn environment() -> &'static Environment<'static> {
    static ENV: OnceLock<Environment<'static>> = OnceLock::new();
    ENV.get_or_init(|| {
        let mut env = Environment::new();
        env.add_template("opening", OPENING_TEMPLATE)
            .expect("static template");
        env.add_template("next", NEXT_TEMPLATE)
            .expect("static template");
        env.add_template("summary", SUMMARY_TEMPLATE)
            .expect("static template");
        env
    })
}

fn render(name: &str, ctx: minijinja::Value) -> Result<String, GenerationError> {
    environment()
        .get_template(name)
        .and_then(|template| template.render(ctx))
        .map_err(|e| GenerationError::permanent(format!("prompt render failed: {e}")))
}

/// Renders the visible transcript as alternating labeled lines.
fn render_transcript(history: &[Turn]) -> String {
    reconstruct_transcript(history)
        .into_iter()
        .map(|entry| {
            let label = match entry.role {
                TranscriptRole::Interviewer => "Interviewer",
                TranscriptRole::Candidate => "Candidate",
            };
            format!("{label}: {}", entry.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_opening(ctx: &InterviewContext) -> Result<String, GenerationError> {
    render(
        "opening",
        context! {
            title => ctx.title,
            duration_minutes => ctx.duration_minutes,
            cv_summary => ctx.cv_summary,
            job_description => ctx.job_description,
        },
    )
}

pub fn render_next(
    ctx: &InterviewContext,
    history: &[Turn],
    answer: &str,
) -> Result<String, GenerationError> {
    // Questions asked so far = non-terminal stored turns (each carries one).
    let question_count = history.iter().filter(|turn| !turn.is_terminal()).count();
    render(
        "next",
        context! {
            title => ctx.title,
            duration_minutes => ctx.duration_minutes,
            cv_summary => ctx.cv_summary,
            job_description => ctx.job_description,
            stage => stage(question_count, ctx.duration_minutes),
            transcript => render_transcript(history),
            answer => answer,
        },
    )
}

pub fn render_summary(
    ctx: &InterviewContext,
    history: &[Turn],
) -> Result<String, GenerationError> {
    render(
        "summary",
        context! {
            title => ctx.title,
            transcript => render_transcript(history),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockview_core::session::RUN_STARTED;

    fn ctx() -> InterviewContext {
        InterviewContext {
            title: "Backend Engineer".to_string(),
            duration_minutes: 30,
            job_description: Some("Rust services".to_string()),
            cv_summary: Some("Five years of systems work".to_string()),
        }
    }

    #[test]
    fn test_stage_ladder() {
        // 30 minutes -> 15 questions budget.
        assert_eq!(stage(0, 30), "intro");
        assert_eq!(stage(4, 30), "intro");
        assert_eq!(stage(5, 30), "technical");
        assert_eq!(stage(10, 30), "technical");
        assert_eq!(stage(12, 30), "behavioral");
        assert_eq!(stage(14, 30), "closing");
        assert_eq!(stage(20, 30), "closing");
    }

    #[test]
    fn test_opening_includes_context() {
        let prompt = render_opening(&ctx()).unwrap();
        assert!(prompt.contains("Backend Engineer"));
        assert!(prompt.contains("Rust services"));
        assert!(prompt.contains("Five years of systems work"));
    }

    #[test]
    fn test_next_includes_transcript_and_answer() {
        let history = vec![Turn::new(
            "run-1",
            0,
            "Tell me about yourself.",
            RUN_STARTED,
            None,
        )];
        let prompt = render_next(&ctx(), &history, "I build storage engines").unwrap();
        assert!(prompt.contains("Interviewer: Tell me about yourself."));
        assert!(prompt.contains("I build storage engines"));
        assert!(prompt.contains("intro stage"));
    }

    #[test]
    fn test_opening_omits_missing_documents() {
        let mut bare = ctx();
        bare.cv_summary = None;
        bare.job_description = None;
        let prompt = render_opening(&bare).unwrap();
        assert!(!prompt.contains("CV summary"));
        assert!(!prompt.contains("Job description"));
    }
}
