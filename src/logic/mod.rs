pub mod achievements;
pub mod analytics;
pub mod extract;
pub mod gamification;
pub mod parse;
pub mod progress;
pub mod prompts;
pub mod streak;

pub use achievements::{evaluate, newly_unlocked, ActivityCounters, ACHIEVEMENTS};
pub use analytics::{build_dashboard, DashboardStats};
pub use extract::{content_hash, ExtractError, ExtractedText, TextExtractor};
pub use gamification::{level_for_xp, quiz_xp, xp_for_level, LevelProgress};
pub use parse::ParseError;
pub use progress::{ActivityOutcome, ProgressTracker};
pub use streak::{compute_streak, StreakSummary};
