use crate::logic::achievements::{newly_unlocked, ActivityCounters, ACHIEVEMENTS};
use crate::logic::gamification::level_for_xp;
use crate::model::{Activity, ActivityKind, Id, UserAchievement};
use crate::store::traits::Store;
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnlockedAchievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub xp_reward: i64,
}

/// What a recorded activity earned, returned alongside the action's own result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityOutcome {
    pub xp_awarded: i64,
    pub total_xp: i64,
    pub level: u32,
    pub leveled_up: bool,
    pub new_achievements: Vec<UnlockedAchievement>,
}

pub struct ProgressTracker;

impl ProgressTracker {
    /// Store an activity, then unlock every achievement the learner now qualifies for.
    pub async fn record<S: Store + ?Sized>(store: &S, activity: Activity) -> Result<ActivityOutcome> {
        let user_id = activity.user_id.clone();
        let mut activities = store.list_activities(&user_id).await?;
        let xp_before: i64 = activities.iter().map(|a| a.xp).sum();

        store.record_activity(activity.clone()).await?;
        let mut xp_awarded = activity.xp;
        activities.push(activity);

        let (bonus_xp, new_achievements) = unlock_pending(store, &user_id, &mut activities).await?;
        xp_awarded += bonus_xp;

        let total_xp = xp_before + xp_awarded;
        let level = level_for_xp(total_xp);
        Ok(ActivityOutcome {
            xp_awarded,
            total_xp,
            level,
            leveled_up: level > level_for_xp(xp_before),
            new_achievements,
        })
    }

    /// Record achievements whose rule is met but that were never unlocked,
    /// e.g. after the catalog gained an entry or a request failed halfway.
    pub async fn sync<S: Store + ?Sized>(store: &S, user_id: &Id) -> Result<Vec<UnlockedAchievement>> {
        let mut activities = store.list_activities(user_id).await?;
        let (_, unlocked) = unlock_pending(store, user_id, &mut activities).await?;
        Ok(unlocked)
    }
}

/// Achievement bonuses are themselves XP, so unlocking repeats until no
/// further rule is met. Returns the bonus XP and what was unlocked.
async fn unlock_pending<S: Store + ?Sized>(
    store: &S,
    user_id: &Id,
    activities: &mut Vec<Activity>,
) -> Result<(i64, Vec<UnlockedAchievement>)> {
    let mut unlocked = store.list_unlocked_achievements(user_id).await?;
    let mut bonus_xp = 0;
    let mut new_achievements = Vec::new();
    let today = chrono::Utc::now().date_naive();

    loop {
        let counters = ActivityCounters::from_activities(activities, today);
        let fresh = newly_unlocked(ACHIEVEMENTS, &counters, &unlocked);
        if fresh.is_empty() {
            break;
        }

        for def in fresh {
            let unlock = UserAchievement {
                user_id: user_id.clone(),
                achievement_id: def.id.to_string(),
                unlocked_at: chrono::Utc::now(),
            };
            let inserted = store.unlock_achievement(unlock.clone()).await?;
            unlocked.push(unlock);
            if !inserted {
                // Recorded concurrently by another request
                continue;
            }

            log::info!("User {} unlocked achievement '{}'", user_id, def.id);
            let bonus = Activity::new(user_id, ActivityKind::AchievementUnlocked, def.xp_reward)
                .with_reference(Some(&def.id.to_string()));
            store.record_activity(bonus.clone()).await?;
            bonus_xp += bonus.xp;
            activities.push(bonus);

            new_achievements.push(UnlockedAchievement {
                id: def.id,
                title: def.title,
                description: def.description,
                xp_reward: def.xp_reward,
            });
        }
    }

    Ok((bonus_xp, new_achievements))
}
