use crate::logic::gamification::level_for_xp;
use crate::logic::streak::compute_streak;
use crate::model::{
    Activity, ActivityKind, AchievementDef, AchievementProgress, AchievementRule,
    AchievementStatus, UserAchievement,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// Built-in achievement catalog
pub static ACHIEVEMENTS: &[AchievementDef] = &[
    AchievementDef {
        id: "first-upload",
        title: "First Steps",
        description: "Upload your first document",
        rule: AchievementRule::DocumentsUploaded(1),
        xp_reward: 25,
    },
    AchievementDef {
        id: "librarian",
        title: "Librarian",
        description: "Upload 10 documents",
        rule: AchievementRule::DocumentsUploaded(10),
        xp_reward: 100,
    },
    AchievementDef {
        id: "summarizer",
        title: "In a Nutshell",
        description: "Generate 5 summaries",
        rule: AchievementRule::SummariesGenerated(5),
        xp_reward: 50,
    },
    AchievementDef {
        id: "quiz-rookie",
        title: "Quiz Rookie",
        description: "Complete your first quiz",
        rule: AchievementRule::QuizzesCompleted(1),
        xp_reward: 25,
    },
    AchievementDef {
        id: "quiz-master",
        title: "Quiz Master",
        description: "Complete 25 quizzes",
        rule: AchievementRule::QuizzesCompleted(25),
        xp_reward: 200,
    },
    AchievementDef {
        id: "perfectionist",
        title: "Perfectionist",
        description: "Score 100% on 3 quizzes",
        rule: AchievementRule::PerfectQuizzes(3),
        xp_reward: 100,
    },
    AchievementDef {
        id: "card-shark",
        title: "Card Shark",
        description: "Review 100 flashcards",
        rule: AchievementRule::FlashcardsReviewed(100),
        xp_reward: 100,
    },
    AchievementDef {
        id: "curious-mind",
        title: "Curious Mind",
        description: "Ask 20 questions in document chat",
        rule: AchievementRule::ChatMessages(20),
        xp_reward: 50,
    },
    AchievementDef {
        id: "on-fire",
        title: "On Fire",
        description: "Study 3 days in a row",
        rule: AchievementRule::StreakDays(3),
        xp_reward: 30,
    },
    AchievementDef {
        id: "unstoppable",
        title: "Unstoppable",
        description: "Study 7 days in a row",
        rule: AchievementRule::StreakDays(7),
        xp_reward: 100,
    },
    AchievementDef {
        id: "level-5",
        title: "Rising Scholar",
        description: "Reach level 5",
        rule: AchievementRule::LevelReached(5),
        xp_reward: 50,
    },
    AchievementDef {
        id: "xp-1000",
        title: "Thousand Club",
        description: "Earn 1000 XP",
        rule: AchievementRule::TotalXp(1000),
        xp_reward: 0,
    },
];

pub fn find_achievement(id: &str) -> Option<&'static AchievementDef> {
    ACHIEVEMENTS.iter().find(|def| def.id == id)
}

/// Counters achievement rules are evaluated against
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityCounters {
    pub documents_uploaded: u64,
    pub summaries_generated: u64,
    pub quizzes_completed: u64,
    pub perfect_quizzes: u64,
    pub flashcards_reviewed: u64,
    pub chat_messages: u64,
    pub current_streak: u64,
    pub longest_streak: u64,
    pub total_xp: i64,
    pub level: u64,
}

impl ActivityCounters {
    pub fn from_activities(activities: &[Activity], today: NaiveDate) -> Self {
        let mut counters = ActivityCounters::default();
        for activity in activities {
            counters.total_xp += activity.xp;
            match activity.kind {
                ActivityKind::DocumentUploaded => counters.documents_uploaded += 1,
                ActivityKind::SummaryGenerated => counters.summaries_generated += 1,
                ActivityKind::QuizCompleted => {
                    counters.quizzes_completed += 1;
                    if activity.score_percent == Some(100) {
                        counters.perfect_quizzes += 1;
                    }
                }
                ActivityKind::FlashcardReviewed => counters.flashcards_reviewed += 1,
                ActivityKind::ChatMessage => counters.chat_messages += 1,
                ActivityKind::FlashcardsGenerated
                | ActivityKind::QuizGenerated
                | ActivityKind::AchievementUnlocked => {}
            }
        }

        let streak = compute_streak(study_days(activities), today);
        counters.current_streak = streak.current as u64;
        counters.longest_streak = streak.longest as u64;
        counters.level = level_for_xp(counters.total_xp) as u64;
        counters
    }

    /// Progress towards a rule. Streak rules count the best streak ever reached.
    pub fn progress(&self, rule: &AchievementRule) -> u64 {
        match rule {
            AchievementRule::DocumentsUploaded(_) => self.documents_uploaded,
            AchievementRule::SummariesGenerated(_) => self.summaries_generated,
            AchievementRule::QuizzesCompleted(_) => self.quizzes_completed,
            AchievementRule::PerfectQuizzes(_) => self.perfect_quizzes,
            AchievementRule::FlashcardsReviewed(_) => self.flashcards_reviewed,
            AchievementRule::ChatMessages(_) => self.chat_messages,
            AchievementRule::StreakDays(_) => self.longest_streak.max(self.current_streak),
            AchievementRule::LevelReached(_) => self.level,
            AchievementRule::TotalXp(_) => self.total_xp.max(0) as u64,
        }
    }
}

/// Calendar days (UTC) on which the learner studied
pub fn study_days(activities: &[Activity]) -> impl Iterator<Item = NaiveDate> + '_ {
    activities
        .iter()
        .filter(|activity| activity.kind.counts_as_study())
        .map(|activity| activity.created_at.date_naive())
}

/// Status of every achievement in `catalog` for one learner
pub fn evaluate(
    catalog: &[AchievementDef],
    counters: &ActivityCounters,
    unlocked: &[UserAchievement],
) -> Vec<AchievementProgress> {
    let unlocked_at: HashMap<&str, _> = unlocked
        .iter()
        .map(|u| (u.achievement_id.as_str(), u.unlocked_at))
        .collect();

    catalog
        .iter()
        .map(|def| {
            let target = def.rule.target();
            let progress = counters.progress(&def.rule);
            let status = match unlocked_at.get(def.id) {
                Some(at) => AchievementStatus::Unlocked { unlocked_at: *at },
                // Met but unrecorded only until ProgressTracker::sync runs
                None if progress > 0 => AchievementStatus::InProgress {
                    progress: progress.min(target),
                    target,
                },
                None => AchievementStatus::Locked { target },
            };
            AchievementProgress {
                id: def.id,
                title: def.title,
                description: def.description,
                xp_reward: def.xp_reward,
                status,
            }
        })
        .collect()
}

/// Achievements whose rule is met but which have not been recorded as unlocked yet
pub fn newly_unlocked<'a>(
    catalog: &'a [AchievementDef],
    counters: &ActivityCounters,
    unlocked: &[UserAchievement],
) -> Vec<&'a AchievementDef> {
    catalog
        .iter()
        .filter(|def| !unlocked.iter().any(|u| u.achievement_id == def.id))
        .filter(|def| counters.progress(&def.rule) >= def.rule.target())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn activity_on(kind: ActivityKind, day: u32, xp: i64) -> Activity {
        let mut activity = Activity::new(&"u1".to_string(), kind, xp);
        activity.created_at = Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap();
        activity
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 3).unwrap()
    }

    #[test]
    fn test_catalog_ids_are_unique() {
        let mut ids: Vec<_> = ACHIEVEMENTS.iter().map(|a| a.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), ACHIEVEMENTS.len());
        assert!(find_achievement("quiz-rookie").is_some());
        assert!(find_achievement("nope").is_none());
    }

    #[test]
    fn test_counters_from_activities() {
        let activities = vec![
            activity_on(ActivityKind::DocumentUploaded, 1, 20),
            activity_on(ActivityKind::QuizCompleted, 2, 70).with_score(Some(100)),
            activity_on(ActivityKind::QuizCompleted, 3, 30).with_score(Some(40)),
            activity_on(ActivityKind::FlashcardReviewed, 3, 2),
            activity_on(ActivityKind::AchievementUnlocked, 3, 25),
        ];
        let counters = ActivityCounters::from_activities(&activities, today());
        assert_eq!(counters.documents_uploaded, 1);
        assert_eq!(counters.quizzes_completed, 2);
        assert_eq!(counters.perfect_quizzes, 1);
        assert_eq!(counters.flashcards_reviewed, 1);
        assert_eq!(counters.total_xp, 147);
        assert_eq!(counters.level, 2);
        assert_eq!(counters.current_streak, 3);
    }

    #[test]
    fn test_evaluate_statuses() {
        let counters = ActivityCounters {
            documents_uploaded: 3,
            quizzes_completed: 1,
            ..Default::default()
        };
        let unlocked = vec![UserAchievement {
            user_id: "u1".to_string(),
            achievement_id: "first-upload".to_string(),
            unlocked_at: Utc::now(),
        }];

        let statuses = evaluate(ACHIEVEMENTS, &counters, &unlocked);
        let status_of = |id: &str| {
            statuses
                .iter()
                .find(|s| s.id == id)
                .map(|s| s.status.clone())
                .unwrap()
        };

        assert!(matches!(status_of("first-upload"), AchievementStatus::Unlocked { .. }));
        assert_eq!(
            status_of("librarian"),
            AchievementStatus::InProgress {
                progress: 3,
                target: 10
            }
        );
        assert_eq!(status_of("card-shark"), AchievementStatus::Locked { target: 100 });

        let fresh = newly_unlocked(ACHIEVEMENTS, &counters, &unlocked);
        let ids: Vec<_> = fresh.iter().map(|def| def.id).collect();
        assert_eq!(ids, vec!["quiz-rookie"]);
    }
}
