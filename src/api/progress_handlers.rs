use axum::{
    extract::{Query, State},
    response::Json,
    Json as RequestJson,
};
use serde::{Deserialize, Serialize};

use crate::api::handlers::{
    bad_request, ensure_user, store_error, ApiError, AppState, ListResponse,
};
use crate::logic::achievements::study_days;
use crate::logic::{
    build_dashboard, compute_streak, evaluate, ActivityCounters, DashboardStats, LevelProgress,
    ProgressTracker, StreakSummary, ACHIEVEMENTS,
};
use crate::model::{AchievementProgress, Activity, User, UserContext, UserUpdate};
use crate::store::traits::Store;

pub const DEFAULT_ACTIVITY_LIMIT: usize = 20;
pub const MAX_ACTIVITY_LIMIT: usize = 100;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: User,
    pub level: LevelProgress,
    pub streak: StreakSummary,
    pub achievements_unlocked: usize,
    pub achievements_total: usize,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
}

async fn build_profile<S: Store>(store: &S, user: User) -> Result<ProfileResponse, ApiError> {
    let activities = store.list_activities(&user.id).await.map_err(store_error)?;
    let unlocked = store
        .list_unlocked_achievements(&user.id)
        .await
        .map_err(store_error)?;
    let today = chrono::Utc::now().date_naive();

    let total_xp: i64 = activities.iter().map(|a| a.xp).sum();
    Ok(ProfileResponse {
        user,
        level: LevelProgress::from_xp(total_xp),
        streak: compute_streak(study_days(&activities), today),
        achievements_unlocked: unlocked.len(),
        achievements_total: ACHIEVEMENTS.len(),
    })
}

/// GET /me
pub async fn get_profile<S: Store>(
    State(state): State<AppState<S>>,
    ctx: UserContext,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = ensure_user(state.store.as_ref(), &ctx).await?;
    let profile = build_profile(state.store.as_ref(), user).await?;
    Ok(Json(profile))
}

/// PATCH /me
pub async fn update_profile<S: Store>(
    State(state): State<AppState<S>>,
    ctx: UserContext,
    RequestJson(update): RequestJson<UserUpdate>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let mut user = ensure_user(state.store.as_ref(), &ctx).await?;
    update.apply(&mut user).map_err(|e| bad_request(&e))?;
    state
        .store
        .upsert_user(user.clone())
        .await
        .map_err(store_error)?;

    let profile = build_profile(state.store.as_ref(), user).await?;
    Ok(Json(profile))
}

/// GET /me/achievements
pub async fn list_achievements<S: Store>(
    State(state): State<AppState<S>>,
    ctx: UserContext,
) -> Result<Json<ListResponse<AchievementProgress>>, ApiError> {
    let synced = ProgressTracker::sync(state.store.as_ref(), &ctx.user_id)
        .await
        .map_err(store_error)?;
    if !synced.is_empty() {
        log::info!("Recorded {} pending achievement(s) for {}", synced.len(), ctx.user_id);
    }

    let activities = state
        .store
        .list_activities(&ctx.user_id)
        .await
        .map_err(store_error)?;
    let unlocked = state
        .store
        .list_unlocked_achievements(&ctx.user_id)
        .await
        .map_err(store_error)?;

    let counters = ActivityCounters::from_activities(&activities, chrono::Utc::now().date_naive());
    Ok(Json(evaluate(ACHIEVEMENTS, &counters, &unlocked).into()))
}

/// GET /me/dashboard
pub async fn get_dashboard<S: Store>(
    State(state): State<AppState<S>>,
    ctx: UserContext,
) -> Result<Json<DashboardStats>, ApiError> {
    let store = state.store.as_ref();
    let documents = store.list_documents(&ctx.user_id).await.map_err(store_error)?;
    let flashcards = store.list_flashcards(&ctx.user_id).await.map_err(store_error)?;
    let quizzes = store.list_quizzes(&ctx.user_id).await.map_err(store_error)?;
    let activities = store.list_activities(&ctx.user_id).await.map_err(store_error)?;

    Ok(Json(build_dashboard(
        &documents,
        &flashcards,
        &quizzes,
        &activities,
        chrono::Utc::now().date_naive(),
    )))
}

/// GET /me/activity?limit=20
pub async fn list_activity<S: Store>(
    State(state): State<AppState<S>>,
    ctx: UserContext,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ListResponse<Activity>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT);

    let activities = state
        .store
        .list_activities(&ctx.user_id)
        .await
        .map_err(store_error)?;
    let recent: Vec<Activity> = activities.into_iter().rev().take(limit).collect();
    Ok(Json(recent.into()))
}
