use chrono::NaiveDate;
use itertools::Itertools;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreakSummary {
    pub current: u32,
    pub longest: u32,
    pub last_active: Option<NaiveDate>,
    pub active_days: u32,
}

/// Compute streaks from the days a learner was active.
///
/// The current streak stays alive through `today` if the last active day is
/// today or yesterday; a gap of one full day resets it to zero.
pub fn compute_streak<I>(days: I, today: NaiveDate) -> StreakSummary
where
    I: IntoIterator<Item = NaiveDate>,
{
    let days: Vec<NaiveDate> = days
        .into_iter()
        .filter(|day| *day <= today)
        .sorted()
        .dedup()
        .collect();

    let Some(&last_active) = days.last() else {
        return StreakSummary::default();
    };

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut previous: Option<NaiveDate> = None;
    for day in &days {
        run = match previous {
            Some(prev) if day.signed_duration_since(prev).num_days() == 1 => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(*day);
    }

    let gap = today.signed_duration_since(last_active).num_days();
    let current = if gap <= 1 { run } else { 0 };

    StreakSummary {
        current,
        longest,
        last_active: Some(last_active),
        active_days: days.len() as u32,
    }
}
