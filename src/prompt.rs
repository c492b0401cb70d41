//! Retrieval-query formation and prompt assembly.
//!
//! Both halves of the orchestrator's text handling live here as pure
//! functions over structured inputs, so the history-folding rule and the
//! truncation policy are unit-testable without any backend.
//!
//! Truncation order under budget pressure: lowest-similarity evidence
//! first, then oldest history, never the current question.

use crate::models::{ScoredChunk, Turn};

/// Fixed system instruction sent with every generation request.
pub const SYSTEM_PROMPT: &str = "You are a helpful legal assistant specializing in human rights law. \
Use the provided context to answer questions accurately and cite relevant information when possible. \
If the context doesn't contain relevant information, say so clearly. \
Keep your responses professional and helpful.";

/// The assembled prompt plus a record of what was included or dropped.
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub system: String,
    pub user: String,
    /// Ids of the chunks whose text made it into the prompt, in
    /// descending similarity order.
    pub evidence_ids: Vec<String>,
    pub dropped_evidence: usize,
    pub dropped_turns: usize,
}

/// Fold the recent conversation tail into the retrieval query so that
/// follow-up questions ("what about its exceptions?") resolve against
/// prior turns. With no history, the query is the question alone.
pub fn build_retrieval_query(history: &[Turn], question: &str) -> String {
    if history.is_empty() {
        return question.to_string();
    }

    let mut parts = Vec::with_capacity(history.len() * 2 + 1);
    for turn in history {
        parts.push(format!("User: {}", turn.question));
        parts.push(format!("Assistant: {}", turn.answer));
    }
    parts.push(question.to_string());
    parts.join("\n")
}

/// Assemble the generation prompt from bounded history, scored evidence
/// (descending similarity), and the new question.
///
/// If the rendered prompt exceeds `budget_chars`, evidence is shed from
/// the low-similarity end first, then history from the oldest turn. The
/// question always survives, even when it alone exceeds the budget.
pub fn build_prompt(
    history: &[Turn],
    evidence: &[ScoredChunk],
    question: &str,
    budget_chars: usize,
) -> AssembledPrompt {
    let mut kept_evidence = evidence.len();
    let mut skipped_turns = 0usize;

    loop {
        let user = render_user_prompt(&history[skipped_turns..], &evidence[..kept_evidence], question);
        let fits = user.chars().count() <= budget_chars;
        let nothing_left_to_drop = kept_evidence == 0 && skipped_turns == history.len();

        if fits || nothing_left_to_drop {
            return AssembledPrompt {
                system: SYSTEM_PROMPT.to_string(),
                user,
                evidence_ids: evidence[..kept_evidence]
                    .iter()
                    .map(|e| e.chunk.id.clone())
                    .collect(),
                dropped_evidence: evidence.len() - kept_evidence,
                dropped_turns: skipped_turns,
            };
        }

        if kept_evidence > 0 {
            kept_evidence -= 1;
        } else {
            skipped_turns += 1;
        }
    }
}

fn render_user_prompt(history: &[Turn], evidence: &[ScoredChunk], question: &str) -> String {
    let mut sections = Vec::new();

    if !history.is_empty() {
        let mut lines = vec!["Previous conversation:".to_string()];
        for turn in history {
            lines.push(format!("User: {}", turn.question));
            lines.push(format!("Assistant: {}", turn.answer));
        }
        sections.push(lines.join("\n"));
    }

    if !evidence.is_empty() {
        let mut lines = vec!["Relevant context:".to_string()];
        for scored in evidence {
            lines.push(format!("[{}] {}", scored.chunk.id, scored.chunk.text));
        }
        sections.push(lines.join("\n"));
    }

    sections.push(format!("Current question: {}", question));
    sections.push(
        "Please provide a helpful response based on the context and conversation history."
            .to_string(),
    );

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;

    fn turn(q: &str, a: &str) -> Turn {
        Turn::new(q, a, Vec::new())
    }

    fn scored(id: &str, text: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                id: id.to_string(),
                document_id: "doc".to_string(),
                chunk_index: 0,
                text: text.to_string(),
                hash: String::new(),
            },
            score,
        }
    }

    #[test]
    fn single_turn_query_is_the_question() {
        assert_eq!(build_retrieval_query(&[], "What is Article 3?"), "What is Article 3?");
    }

    #[test]
    fn follow_up_query_folds_prior_turns() {
        let history = vec![turn("What is Article 3?", "It prohibits torture.")];
        let query = build_retrieval_query(&history, "What about its exceptions?");
        assert!(query.contains("What is Article 3?"));
        assert!(query.contains("It prohibits torture."));
        assert!(query.ends_with("What about its exceptions?"));
    }

    #[test]
    fn everything_fits_under_a_large_budget() {
        let history = vec![turn("q1", "a1")];
        let evidence = vec![scored("d#0", "first passage", 0.9), scored("d#1", "second", 0.5)];
        let assembled = build_prompt(&history, &evidence, "q2", 100_000);
        assert_eq!(assembled.evidence_ids, vec!["d#0", "d#1"]);
        assert_eq!(assembled.dropped_evidence, 0);
        assert_eq!(assembled.dropped_turns, 0);
        assert!(assembled.user.contains("Previous conversation:"));
        assert!(assembled.user.contains("[d#0] first passage"));
        assert!(assembled.user.contains("Current question: q2"));
    }

    #[test]
    fn evidence_is_dropped_before_history() {
        let history = vec![turn("earlier question", "earlier answer")];
        let evidence = vec![
            scored("d#0", &"x".repeat(200), 0.9),
            scored("d#1", &"y".repeat(200), 0.5),
        ];
        // Budget fits history + question + one chunk, not both chunks
        let assembled = build_prompt(&history, &evidence, "q", 400);
        assert_eq!(assembled.dropped_evidence, 1);
        assert_eq!(assembled.dropped_turns, 0);
        assert_eq!(assembled.evidence_ids, vec!["d#0"]);
    }

    #[test]
    fn oldest_history_goes_after_evidence_is_exhausted() {
        let history = vec![
            turn(&"old ".repeat(50), &"old ".repeat(50)),
            turn("recent q", "recent a"),
        ];
        let evidence = vec![scored("d#0", &"z".repeat(300), 0.9)];
        let assembled = build_prompt(&history, &evidence, "q", 200);
        assert_eq!(assembled.dropped_evidence, 1);
        assert_eq!(assembled.dropped_turns, 1);
        assert!(assembled.user.contains("recent q"));
        assert!(!assembled.user.contains("old old"));
    }

    #[test]
    fn question_survives_an_impossible_budget() {
        let assembled = build_prompt(&[], &[], "an unavoidably present question", 5);
        assert!(assembled.user.contains("an unavoidably present question"));
        assert!(assembled.evidence_ids.is_empty());
    }

    #[test]
    fn empty_evidence_omits_the_context_section() {
        let assembled = build_prompt(&[], &[], "q", 10_000);
        assert!(!assembled.user.contains("Relevant context:"));
        assert!(assembled.evidence_ids.is_empty());
    }
}
