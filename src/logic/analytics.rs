use crate::logic::achievements::study_days;
use crate::logic::gamification::LevelProgress;
use crate::logic::streak::compute_streak;
use crate::model::{Activity, ActivityKind, Document, Flashcard, Id, Quiz, Timestamp};
use chrono::{Duration, NaiveDate};
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;

pub const WEEKLY_WINDOW_DAYS: i64 = 7;
pub const RECENT_QUIZ_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub activities: u32,
    pub xp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizResultSummary {
    pub quiz_id: Id,
    pub document_id: Id,
    pub title: String,
    pub score: i32,
    pub total: usize,
    pub percentage: u32,
    pub completed_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_documents: usize,
    pub total_words: i64,
    pub total_flashcards: usize,
    pub flashcards_known: usize,
    pub starred_flashcards: usize,
    pub total_quizzes: usize,
    pub quizzes_completed: usize,
    pub average_score: Option<u32>,
    pub best_score: Option<u32>,
    pub study_days: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub level: LevelProgress,
    pub weekly_activity: Vec<DailyActivity>,
    pub activity_breakdown: BTreeMap<ActivityKind, usize>,
    pub recent_quizzes: Vec<QuizResultSummary>,
}

pub fn build_dashboard(
    documents: &[Document],
    flashcards: &[Flashcard],
    quizzes: &[Quiz],
    activities: &[Activity],
    today: NaiveDate,
) -> DashboardStats {
    let completed: Vec<&Quiz> = quizzes
        .iter()
        .filter(|quiz| quiz.is_completed())
        .sorted_by(|a, b| b.completed_at.cmp(&a.completed_at))
        .collect();

    let percentages: Vec<u32> = completed.iter().filter_map(|q| q.percentage()).collect();
    let average_score = if percentages.is_empty() {
        None
    } else {
        let sum: u32 = percentages.iter().sum();
        Some((sum as f64 / percentages.len() as f64).round() as u32)
    };

    let streak = compute_streak(study_days(activities), today);
    let total_xp: i64 = activities.iter().map(|a| a.xp).sum();

    DashboardStats {
        total_documents: documents.len(),
        total_words: documents.iter().map(|d| d.word_count).sum(),
        total_flashcards: flashcards.len(),
        flashcards_known: flashcards.iter().filter(|c| c.known).count(),
        starred_flashcards: flashcards.iter().filter(|c| c.starred).count(),
        total_quizzes: quizzes.len(),
        quizzes_completed: completed.len(),
        average_score,
        best_score: percentages.iter().copied().max(),
        study_days: streak.active_days,
        current_streak: streak.current,
        longest_streak: streak.longest,
        level: LevelProgress::from_xp(total_xp),
        weekly_activity: weekly_activity(activities, today),
        activity_breakdown: activities.iter().map(|a| a.kind).counts().into_iter().collect(),
        recent_quizzes: completed
            .iter()
            .take(RECENT_QUIZ_LIMIT)
            .filter_map(|quiz| {
                Some(QuizResultSummary {
                    quiz_id: quiz.id.clone(),
                    document_id: quiz.document_id.clone(),
                    title: quiz.title.clone(),
                    score: quiz.score?,
                    total: quiz.questions.len(),
                    percentage: quiz.percentage()?,
                    completed_at: quiz.completed_at?,
                })
            })
            .collect(),
    }
}

/// Activity count and XP for each of the last seven days, oldest first, zero-filled
pub fn weekly_activity(activities: &[Activity], today: NaiveDate) -> Vec<DailyActivity> {
    let window_start = today - Duration::days(WEEKLY_WINDOW_DAYS - 1);
    let by_day = activities
        .iter()
        .filter(|a| {
            let day = a.created_at.date_naive();
            day >= window_start && day <= today
        })
        .into_group_map_by(|a| a.created_at.date_naive());

    (0..WEEKLY_WINDOW_DAYS)
        .map(|offset| {
            let date = window_start + Duration::days(offset);
            let day_activities = by_day.get(&date);
            DailyActivity {
                date,
                activities: day_activities.map_or(0, |list| list.len() as u32),
                xp: day_activities.map_or(0, |list| list.iter().map(|a| a.xp).sum()),
            }
        })
        .collect()
}
