//! Prompt construction for the study assistant.
//!
//! Every prompt embeds (a possibly truncated copy of) the document text and
//! asks for a strict output shape so `logic::parse` can read it back.

use crate::model::{ChatMessage, Difficulty};

const TRUNCATION_MARKER: &str = "\n\n[... document truncated ...]";

pub const SYSTEM_TUTOR: &str = "You are a patient study tutor. Base every answer on the \
provided study material. If the material does not cover something, say so plainly \
instead of inventing facts.";

/// Cut `text` to at most `max_chars` characters, never splitting a UTF-8 sequence
pub fn truncate_for_context(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_index, _)) => {
            let mut cut = text[..byte_index].trim_end().to_string();
            cut.push_str(TRUNCATION_MARKER);
            cut
        }
    }
}

pub fn summary_prompt(title: &str, text: &str) -> String {
    format!(
        r#"Summarize the study material titled "{title}".

Write the summary in Markdown with:
- a one-paragraph overview
- a "Key points" bullet list (5-10 bullets)
- a "Key terms" list with a short definition for each

Study material:
"""
{text}
""""#
    )
}

pub fn flashcards_prompt(text: &str, count: usize) -> String {
    format!(
        r#"Create exactly {count} flashcards from the study material below.
Each flashcard tests one fact or concept. Keep answers under 40 words.

Respond with ONLY a JSON array, no commentary, in this shape:
[{{"question": "...", "answer": "..."}}]

Study material:
"""
{text}
""""#
    )
}

pub fn quiz_prompt(text: &str, count: usize, difficulty: Difficulty) -> String {
    let guidance = match difficulty {
        Difficulty::Easy => "Ask about definitions and directly stated facts.",
        Difficulty::Medium => "Mix factual recall with questions that need some understanding.",
        Difficulty::Hard => "Ask questions that require applying or connecting several ideas.",
    };
    format!(
        r#"Write a {difficulty} multiple-choice quiz with exactly {count} questions about the study material below.
{guidance}
Every question has exactly 4 options and one correct option.

Respond with ONLY a JSON array, no commentary, in this shape:
[{{"question": "...", "options": ["...", "...", "...", "..."], "correct_index": 0, "explanation": "..."}}]
"correct_index" is the zero-based index of the correct option.

Study material:
"""
{text}
""""#,
        difficulty = difficulty.as_str(),
    )
}

/// System instruction for a document chat; the conversation itself goes in as turns
pub fn chat_system_prompt(title: &str, text: &str) -> String {
    format!(
        r#"{SYSTEM_TUTOR}
You are helping a learner study the document "{title}". Answer their questions
using this material, quoting short passages where useful.

Study material:
"""
{text}
""""#
    )
}

pub fn explain_prompt(concept: &str, text: &str) -> String {
    format!(
        r#"Explain the concept "{concept}" as it is used in the study material below.
Start with a simple explanation a beginner can follow, then give one concrete
example, then note any related concepts from the material.

Study material:
"""
{text}
""""#
    )
}

/// Keep only the most recent `limit` messages of a conversation, oldest first
pub fn recent_history(history: &[ChatMessage], limit: usize) -> &[ChatMessage] {
    let start = history.len().saturating_sub(limit);
    &history[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChatRole;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "héllo wörld";
        assert_eq!(truncate_for_context(text, 100), text);

        let cut = truncate_for_context(text, 7);
        assert!(cut.starts_with("héllo w"));
        assert!(cut.ends_with("[... document truncated ...]"));
    }

    #[test]
    fn test_prompts_embed_parameters() {
        let prompt = quiz_prompt("Mitochondria make ATP.", 7, Difficulty::Hard);
        assert!(prompt.contains("hard multiple-choice quiz with exactly 7 questions"));
        assert!(prompt.contains("Mitochondria make ATP."));
        assert!(prompt.contains("\"correct_index\": 0"));

        let prompt = flashcards_prompt("text", 12);
        assert!(prompt.contains("exactly 12 flashcards"));
        assert!(prompt.contains("[{\"question\": \"...\", \"answer\": \"...\"}]"));
    }

    #[test]
    fn test_recent_history_keeps_tail() {
        let msgs: Vec<ChatMessage> = (0..5)
            .map(|i| {
                ChatMessage::new(
                    &"u".to_string(),
                    &"d".to_string(),
                    ChatRole::User,
                    format!("m{}", i),
                )
            })
            .collect();
        let tail = recent_history(&msgs, 2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].content, "m3");
        assert_eq!(recent_history(&msgs, 10).len(), 5);
    }
}
