use crate::model::{Id, Timestamp};
use serde::{Deserialize, Serialize};

/// Threshold an achievement is unlocked at, evaluated against activity counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "target", rename_all = "snake_case")]
pub enum AchievementRule {
    DocumentsUploaded(u64),
    SummariesGenerated(u64),
    QuizzesCompleted(u64),
    PerfectQuizzes(u64),
    FlashcardsReviewed(u64),
    ChatMessages(u64),
    StreakDays(u64),
    LevelReached(u64),
    TotalXp(u64),
}

impl AchievementRule {
    pub fn target(&self) -> u64 {
        match *self {
            AchievementRule::DocumentsUploaded(n)
            | AchievementRule::SummariesGenerated(n)
            | AchievementRule::QuizzesCompleted(n)
            | AchievementRule::PerfectQuizzes(n)
            | AchievementRule::FlashcardsReviewed(n)
            | AchievementRule::ChatMessages(n)
            | AchievementRule::StreakDays(n)
            | AchievementRule::LevelReached(n)
            | AchievementRule::TotalXp(n) => n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementDef {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub rule: AchievementRule,
    pub xp_reward: i64,
}

/// Persisted unlock of an achievement by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAchievement {
    pub user_id: Id,
    pub achievement_id: String,
    pub unlocked_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AchievementStatus {
    Unlocked { unlocked_at: Timestamp },
    InProgress { progress: u64, target: u64 },
    Locked { target: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementProgress {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub xp_reward: i64,
    #[serde(flatten)]
    pub status: AchievementStatus,
}
