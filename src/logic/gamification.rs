use crate::model::ActivityKind;
use serde::Serialize;

pub const XP_PER_LEVEL_STEP: i64 = 100;

pub const QUIZ_BASE_XP: i64 = 20;
pub const QUIZ_XP_PER_CORRECT: i64 = 5;
pub const QUIZ_PERFECT_BONUS: i64 = 25;

/// Fixed XP for an activity. Quiz completion and achievement unlocks carry
/// their own amounts, see [`quiz_xp`] and `AchievementDef::xp_reward`.
pub fn base_xp(kind: ActivityKind) -> i64 {
    match kind {
        ActivityKind::DocumentUploaded => 20,
        ActivityKind::SummaryGenerated => 10,
        ActivityKind::FlashcardsGenerated => 10,
        ActivityKind::FlashcardReviewed => 2,
        ActivityKind::QuizGenerated => 5,
        ActivityKind::QuizCompleted => QUIZ_BASE_XP,
        ActivityKind::ChatMessage => 1,
        ActivityKind::AchievementUnlocked => 0,
    }
}

pub fn quiz_xp(correct: usize, total: usize) -> i64 {
    let mut xp = QUIZ_BASE_XP + QUIZ_XP_PER_CORRECT * correct as i64;
    if total > 0 && correct == total {
        xp += QUIZ_PERFECT_BONUS;
    }
    xp
}

/// Level for a running XP total: `floor(sqrt(xp / 100)) + 1`
pub fn level_for_xp(xp: i64) -> u32 {
    if xp <= 0 {
        return 1;
    }
    let steps = xp / XP_PER_LEVEL_STEP;
    let mut level = (steps as f64).sqrt() as i64;
    // Float sqrt can land one off for large values
    while (level + 1) * (level + 1) <= steps {
        level += 1;
    }
    while level * level > steps {
        level -= 1;
    }
    level as u32 + 1
}

/// Total XP needed to reach `level`: `100 * (level - 1)^2`
pub fn xp_for_level(level: u32) -> i64 {
    let steps = level.saturating_sub(1) as i64;
    XP_PER_LEVEL_STEP * steps * steps
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelProgress {
    pub total_xp: i64,
    pub level: u32,
    pub xp_into_level: i64,
    pub xp_for_next_level: i64,
    pub progress_percent: u32,
}

impl LevelProgress {
    pub fn from_xp(total_xp: i64) -> Self {
        let total_xp = total_xp.max(0);
        let level = level_for_xp(total_xp);
        let floor = xp_for_level(level);
        let ceiling = xp_for_level(level + 1);
        let span = ceiling - floor;
        let xp_into_level = total_xp - floor;
        Self {
            total_xp,
            level,
            xp_into_level,
            xp_for_next_level: span,
            progress_percent: ((xp_into_level * 100) / span.max(1)) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_boundaries() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(-5), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(399), 2);
        assert_eq!(level_for_xp(400), 3);
        assert_eq!(level_for_xp(900), 4);

        for level in 1..50 {
            assert_eq!(level_for_xp(xp_for_level(level)), level);
            assert_eq!(level_for_xp(xp_for_level(level + 1) - 1), level);
        }
    }

    #[test]
    fn test_quiz_xp_rewards_perfect_scores() {
        assert_eq!(quiz_xp(0, 5), 20);
        assert_eq!(quiz_xp(4, 5), 40);
        assert_eq!(quiz_xp(5, 5), 70);
        assert_eq!(quiz_xp(0, 0), 20);
    }

    #[test]
    fn test_level_progress() {
        let progress = LevelProgress::from_xp(250);
        assert_eq!(progress.level, 2);
        assert_eq!(progress.xp_into_level, 150);
        assert_eq!(progress.xp_for_next_level, 300);
        assert_eq!(progress.progress_percent, 50);
    }
}
