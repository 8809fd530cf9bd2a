use crate::model::{generate_id, Difficulty, Id, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Id,
    pub user_id: Id,
    pub document_id: Id,
    pub title: String,
    pub difficulty: Difficulty,
    pub questions: Vec<QuizQuestion>,
    /// Selected option per question; `None` means skipped
    pub answers: Option<Vec<Option<usize>>>,
    pub score: Option<i32>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionResult {
    pub index: usize,
    pub selected: Option<usize>,
    pub correct_index: usize,
    pub is_correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizResult {
    pub quiz_id: Id,
    pub score: usize,
    pub total: usize,
    pub percentage: u32,
    pub results: Vec<QuestionResult>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum QuizSubmissionError {
    #[error("Quiz has already been completed")]
    AlreadyCompleted,
    #[error("Expected {expected} answers, got {actual}")]
    WrongAnswerCount { expected: usize, actual: usize },
    #[error("Answer for question {question} is out of range")]
    OptionOutOfRange { question: usize },
}

impl Quiz {
    pub fn new(
        user_id: &Id,
        document_id: &Id,
        title: String,
        difficulty: Difficulty,
        questions: Vec<QuizQuestion>,
    ) -> Self {
        Self {
            id: generate_id(),
            user_id: user_id.clone(),
            document_id: document_id.clone(),
            title,
            difficulty,
            questions,
            answers: None,
            score: None,
            completed_at: None,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Score a set of answers and mark the quiz completed.
    ///
    /// A quiz can be submitted once; answers must line up one-to-one with
    /// the questions and every selected option must exist.
    pub fn submit(
        &mut self,
        answers: Vec<Option<usize>>,
    ) -> Result<QuizResult, QuizSubmissionError> {
        if self.is_completed() {
            return Err(QuizSubmissionError::AlreadyCompleted);
        }
        if answers.len() != self.questions.len() {
            return Err(QuizSubmissionError::WrongAnswerCount {
                expected: self.questions.len(),
                actual: answers.len(),
            });
        }
        for (index, (question, answer)) in self.questions.iter().zip(&answers).enumerate() {
            if let Some(selected) = answer {
                if *selected >= question.options.len() {
                    return Err(QuizSubmissionError::OptionOutOfRange { question: index });
                }
            }
        }

        let result = grade(&self.id, &self.questions, &answers);
        self.answers = Some(answers);
        self.score = Some(result.score as i32);
        self.completed_at = Some(chrono::Utc::now());
        Ok(result)
    }

    /// Graded view of a completed quiz
    pub fn result(&self) -> Option<QuizResult> {
        let answers = self.answers.as_ref()?;
        Some(grade(&self.id, &self.questions, answers))
    }

    pub fn percentage(&self) -> Option<u32> {
        self.score
            .map(|score| percentage(score.max(0) as usize, self.questions.len()))
    }
}

fn grade(quiz_id: &Id, questions: &[QuizQuestion], answers: &[Option<usize>]) -> QuizResult {
    let results: Vec<QuestionResult> = questions
        .iter()
        .zip(answers)
        .enumerate()
        .map(|(index, (question, selected))| QuestionResult {
            index,
            selected: *selected,
            correct_index: question.correct_index,
            is_correct: *selected == Some(question.correct_index),
            explanation: question.explanation.clone(),
        })
        .collect();

    let score = results.iter().filter(|r| r.is_correct).count();
    QuizResult {
        quiz_id: quiz_id.clone(),
        score,
        total: questions.len(),
        percentage: percentage(score, questions.len()),
        results,
    }
}

pub fn percentage(score: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((score as f64 / total as f64) * 100.0).round() as u32
}

/// Question as shown to the learner before the quiz is completed
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub question: String,
    pub options: Vec<String>,
}

/// Response shape for GET /quizzes/:id
///
/// Correct answers and explanations are only revealed once the quiz is completed.
#[derive(Debug, Clone, Serialize)]
pub struct QuizView {
    pub id: Id,
    pub document_id: Id,
    pub title: String,
    pub difficulty: Difficulty,
    pub question_count: usize,
    pub questions: Vec<QuestionView>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<QuizResult>,
}

impl From<&Quiz> for QuizView {
    fn from(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id.clone(),
            document_id: quiz.document_id.clone(),
            title: quiz.title.clone(),
            difficulty: quiz.difficulty,
            question_count: quiz.questions.len(),
            questions: quiz
                .questions
                .iter()
                .map(|q| QuestionView {
                    question: q.question.clone(),
                    options: q.options.clone(),
                })
                .collect(),
            completed_at: quiz.completed_at,
            created_at: quiz.created_at,
            result: quiz.result(),
        }
    }
}

/// Input model for POST /documents/:id/quizzes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateQuizRequest {
    pub count: Option<usize>,
    pub difficulty: Option<Difficulty>,
    pub title: Option<String>,
}

/// Input model for POST /quizzes/:id/submit
#[derive(Debug, Clone, Deserialize)]
pub struct QuizSubmission {
    pub answers: Vec<Option<usize>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_quiz() -> Quiz {
        let question = |text: &str, correct: usize| QuizQuestion {
            question: text.to_string(),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_index: correct,
            explanation: Some(format!("Because {}", correct)),
        };
        Quiz::new(
            &"u1".to_string(),
            &"d1".to_string(),
            "Cells".to_string(),
            Difficulty::Medium,
            vec![question("q1", 0), question("q2", 2), question("q3", 3)],
        )
    }

    #[test]
    fn test_submit_scores_and_completes() {
        let mut quiz = sample_quiz();
        let result = quiz.submit(vec![Some(0), Some(1), None]).unwrap();

        assert_eq!(result.score, 1);
        assert_eq!(result.total, 3);
        assert_eq!(result.percentage, 33);
        assert!(result.results[0].is_correct);
        assert!(!result.results[1].is_correct);
        assert_eq!(result.results[2].selected, None);
        assert!(quiz.is_completed());
        assert_eq!(quiz.score, Some(1));
        assert_eq!(quiz.percentage(), Some(33));
    }

    #[test]
    fn test_submit_rejects_bad_input_and_resubmission() {
        let mut quiz = sample_quiz();
        assert_eq!(
            quiz.submit(vec![Some(0)]),
            Err(QuizSubmissionError::WrongAnswerCount {
                expected: 3,
                actual: 1
            })
        );
        assert_eq!(
            quiz.submit(vec![Some(0), Some(9), None]),
            Err(QuizSubmissionError::OptionOutOfRange { question: 1 })
        );
        assert!(!quiz.is_completed());

        quiz.submit(vec![Some(0), Some(2), Some(3)]).unwrap();
        assert_eq!(
            quiz.submit(vec![Some(0), Some(2), Some(3)]),
            Err(QuizSubmissionError::AlreadyCompleted)
        );
        assert_eq!(quiz.percentage(), Some(100));
    }

    #[test]
    fn test_view_hides_answers_until_completed() {
        let mut quiz = sample_quiz();
        let view = serde_json::to_value(QuizView::from(&quiz)).unwrap();
        let rendered = view.to_string();
        assert!(!rendered.contains("correct_index"));
        assert!(!rendered.contains("Because"));
        assert!(view.get("result").is_none());

        quiz.submit(vec![Some(0), Some(2), Some(0)]).unwrap();
        let view = serde_json::to_value(QuizView::from(&quiz)).unwrap();
        assert_eq!(view["result"]["score"], 2);
        assert_eq!(view["result"]["results"][2]["correct_index"], 3);
    }

    #[test]
    fn test_percentage_of_empty_quiz_is_zero() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(2, 3), 67);
    }
}
