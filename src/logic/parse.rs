//! Reading structured records back out of model output.
//!
//! Models wrap JSON in code fences, add a sentence before it, rename fields
//! and give the correct answer as a letter or as the option text. All of that
//! is accepted here; items that still don't make sense are dropped.

use crate::model::{FlashcardDraft, QuizQuestion};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("response contains no JSON array")]
    NoJsonArray,
    #[error("response JSON is malformed: {0}")]
    InvalidJson(String),
    #[error("response contained no usable items")]
    NoValidItems,
}

/// Locate and parse the JSON array in a model response.
///
/// A fenced code block is tried first. Otherwise every `[` is tried in turn,
/// so brackets in a sentence before or after the array don't get in the way.
pub fn extract_json_array(response: &str) -> Result<Vec<Value>, ParseError> {
    if let Some(block) = fenced_block(response) {
        if let Ok(values) = first_array(block) {
            return Ok(values);
        }
    }
    first_array(response)
}

/// Contents of the first ``` fence, without the language tag line
fn fenced_block(response: &str) -> Option<&str> {
    let open = response.find("```")?;
    let after = &response[open + 3..];
    let body = &after[after.find('\n')? + 1..];
    let close = body.find("```")?;
    Some(&body[..close])
}

/// First array that holds at least one object, else the first array at all
fn first_array(text: &str) -> Result<Vec<Value>, ParseError> {
    let mut fallback = None;
    let mut first_error = None;

    for (start, _) in text.match_indices('[') {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Vec<Value>>();
        match stream.next() {
            Some(Ok(values)) if values.iter().any(Value::is_object) => return Ok(values),
            Some(Ok(values)) => {
                fallback.get_or_insert(values);
            }
            Some(Err(e)) => {
                first_error.get_or_insert_with(|| e.to_string());
            }
            None => {}
        }
    }

    match (fallback, first_error) {
        (Some(values), _) => Ok(values),
        (None, Some(message)) => Err(ParseError::InvalidJson(message)),
        (None, None) => Err(ParseError::NoJsonArray),
    }
}

pub fn parse_flashcards(response: &str, limit: usize) -> Result<Vec<FlashcardDraft>, ParseError> {
    let cards: Vec<FlashcardDraft> = extract_json_array(response)?
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|item| {
            let question = string_field(item, &["question", "front", "q", "term"])?;
            let answer = string_field(item, &["answer", "back", "a", "definition"])?;
            Some(FlashcardDraft { question, answer })
        })
        .take(limit)
        .collect();

    if cards.is_empty() {
        return Err(ParseError::NoValidItems);
    }
    Ok(cards)
}

pub fn parse_quiz_questions(response: &str, limit: usize) -> Result<Vec<QuizQuestion>, ParseError> {
    let questions: Vec<QuizQuestion> = extract_json_array(response)?
        .iter()
        .filter_map(Value::as_object)
        .filter_map(parse_quiz_item)
        .take(limit)
        .collect();

    if questions.is_empty() {
        return Err(ParseError::NoValidItems);
    }
    Ok(questions)
}

fn parse_quiz_item(item: &Map<String, Value>) -> Option<QuizQuestion> {
    let question = string_field(item, &["question", "prompt"])?;
    // One unusable option drops the question; skipping it would shift the answer key
    let options: Vec<String> = ["options", "choices"]
        .iter()
        .find_map(|key| item.get(*key).and_then(Value::as_array))?
        .iter()
        .map(|option| {
            option
                .as_str()
                .map(strip_option_label)
                .filter(|option| !option.is_empty())
        })
        .collect::<Option<_>>()?;
    if options.len() < 2 {
        return None;
    }

    let correct_index = ["correct_index", "correctIndex", "answer_index"]
        .iter()
        .find_map(|key| item.get(*key).and_then(Value::as_u64))
        .map(|index| index as usize)
        .or_else(|| {
            ["answer", "correct_answer", "correctAnswer"]
                .iter()
                .find_map(|key| item.get(*key))
                .and_then(|value| resolve_answer(value, &options))
        })?;
    if correct_index >= options.len() {
        return None;
    }

    let explanation = string_field(item, &["explanation", "rationale"]);

    Some(QuizQuestion {
        question,
        options,
        correct_index,
        explanation,
    })
}

/// Turn an answer given as an index, a letter or the option text into an index
fn resolve_answer(value: &Value, options: &[String]) -> Option<usize> {
    if let Some(index) = value.as_u64() {
        return Some(index as usize);
    }
    let answer = value.as_str()?.trim();

    let mut chars = answer.chars();
    if let (Some(letter), None) = (chars.next(), chars.next()) {
        if letter.is_ascii_alphabetic() {
            return Some((letter.to_ascii_uppercase() as u8 - b'A') as usize);
        }
    }

    let answer = strip_option_label(answer);
    options
        .iter()
        .position(|option| option.eq_ignore_ascii_case(&answer))
}

/// Remove "A) ", "b. " or "C: " style labels from the front of an option
fn strip_option_label(option: &str) -> String {
    let trimmed = option.trim();
    let mut chars = trimmed.chars();
    if let (Some(letter), Some(sep)) = (chars.next(), chars.next()) {
        if letter.is_ascii_alphabetic() && matches!(sep, ')' | '.' | ':') {
            let rest = chars.as_str();
            if rest.starts_with(' ') {
                return rest.trim().to_string();
            }
        }
    }
    trimmed.to_string()
}

fn string_field(item: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flashcards_from_fenced_response_with_aliases() {
        let response = r#"Here are your flashcards:
```json
[
  {"question": "What is osmosis?", "answer": "Diffusion of water across a membrane"},
  {"front": "ATP", "back": "Adenosine triphosphate"},
  {"question": "", "answer": "dropped"},
  "not an object"
]
```"#;
        let cards = parse_flashcards(response, 10).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].question, "ATP");
        assert_eq!(cards[1].answer, "Adenosine triphosphate");
    }

    #[test]
    fn test_flashcards_limit_and_errors() {
        let response = r#"[{"q":"1","a":"1"},{"q":"2","a":"2"},{"q":"3","a":"3"}]"#;
        assert_eq!(parse_flashcards(response, 2).unwrap().len(), 2);

        assert_eq!(parse_flashcards("no json here", 5), Err(ParseError::NoJsonArray));
        assert_eq!(parse_flashcards("[]", 5), Err(ParseError::NoValidItems));
        assert!(matches!(
            parse_flashcards("[{\"q\": }]", 5),
            Err(ParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_quiz_answer_forms() {
        let response = r#"[
  {"question": "Q1", "options": ["A) Red", "B) Green", "C) Blue"], "correct_index": 2, "explanation": "Sky"},
  {"question": "Q2", "choices": ["one", "two"], "answer": "B"},
  {"question": "Q3", "options": ["Paris", "Rome"], "correctAnswer": "rome"},
  {"question": "Q4", "options": ["x", "y"], "answer": 1},
  {"question": "Q5", "options": ["x", "y"], "correct_index": 5},
  {"question": "Q6", "options": ["only"], "correct_index": 0},
  {"question": "Q7", "options": ["x", "y"], "answer": "z"}
]"#;
        let questions = parse_quiz_questions(response, 10).unwrap();
        assert_eq!(questions.len(), 4);

        assert_eq!(questions[0].options, vec!["Red", "Green", "Blue"]);
        assert_eq!(questions[0].correct_index, 2);
        assert_eq!(questions[0].explanation.as_deref(), Some("Sky"));
        assert_eq!(questions[1].correct_index, 1);
        assert_eq!(questions[2].correct_index, 1);
        assert_eq!(questions[3].correct_index, 1);
        assert_eq!(questions[3].explanation, None);
    }

    #[test]
    fn test_array_found_past_brackets_in_surrounding_text() {
        let fenced = "Here are [2] flashcards:\n```json\n[{\"question\":\"Q\",\"answer\":\"A\"}]\n```";
        let cards = parse_flashcards(fenced, 5).unwrap();
        assert_eq!(cards[0].question, "Q");

        let preamble = r#"Sure [see below]: [{"question":"Q1","answer":"A1"}]"#;
        assert_eq!(parse_flashcards(preamble, 5).unwrap()[0].answer, "A1");

        let trailing = r#"[{"question":"Q2","answer":"A2"}] Hope that helps [1]."#;
        assert_eq!(parse_flashcards(trailing, 5).unwrap()[0].answer, "A2");
    }

    #[test]
    fn test_quiz_question_with_unusable_option_is_dropped() {
        let response = r#"[
  {"question": "Sky colour?", "options": ["Red", "", "Blue", "Green"], "correct_index": 2},
  {"question": "Grass colour?", "options": ["Red", 7, "Green"], "answer": "Green"},
  {"question": "Sea colour?", "options": ["Blue", "Red"], "correct_index": 0}
]"#;
        let questions = parse_quiz_questions(response, 10).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "Sea colour?");

        let only_bad = r#"[{"question":"Sky colour?","options":["Red","","Blue","Green"],"correct_index":2}]"#;
        assert_eq!(parse_quiz_questions(only_bad, 10), Err(ParseError::NoValidItems));
    }

    #[test]
    fn test_strip_option_label_leaves_plain_text() {
        assert_eq!(strip_option_label("  d. Mitochondria "), "Mitochondria");
        assert_eq!(strip_option_label("e.g. an example"), "e.g. an example");
        assert_eq!(strip_option_label("3.14"), "3.14");
    }
}
