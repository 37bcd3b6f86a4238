use crate::api::models::usage::{
    ActorUsageStats, ListUsageQuery, RateLimitQuery, RateLimitStatus, TimelinePoint, TimelineQuery, UsageEventCreate,
    UsageEventResponse, UsageFeedback, UsageOutcome,
};
use crate::api::models::users::CurrentUser;
use crate::auth::OptionalUser;
use crate::db::handlers::{reports, usage_events::UsageEventFilter, Developers, Listings, Repository, UsageEvents};
use crate::db::models::usage_events::UsageEventCreateDBRequest;
use crate::errors::{Error, Result};
use crate::metering::{self, engine};
use crate::types::{ModelId, UsageEventId};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

fn model_not_found(id: ModelId) -> Error {
    Error::NotFound {
        resource: "Model".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    post,
    path = "/usage-events",
    tag = "usage",
    summary = "Record one invocation outcome",
    description = "Appends an event to the usage ledger and applies the metering updates \
                   (request counter, rolling latency, success rate, revenue and quota accrual) \
                   in the same transaction. Must be called exactly once per logical invocation. \
                   Anonymous actors are allowed.",
    request_body = UsageEventCreate,
    responses(
        (status = 201, description = "Event recorded and metered", body = UsageEventResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Model not found"),
        (status = 429, description = "Developer monthly quota exhausted"),
        (status = 500, description = "Internal server error")
    ),
    security((), ("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn record_usage_event(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Json(create): Json<UsageEventCreate>,
) -> Result<(StatusCode, Json<UsageEventResponse>)> {
    if create.latency_ms < 0 {
        return Err(Error::Validation {
            message: "latency_ms must not be negative".to_string(),
        });
    }
    let input_tokens = create.input_tokens.unwrap_or(0);
    let output_tokens = create.output_tokens.unwrap_or(0);
    if input_tokens < 0 || output_tokens < 0 {
        return Err(Error::Validation {
            message: "token counts must not be negative".to_string(),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    // Lock the aggregate rows up front so concurrent invocations against the
    // same listing serialize their read-modify-write updates.
    let listing = Listings::new(&mut tx)
        .get_for_update(create.model_id)
        .await?
        .ok_or_else(|| model_not_found(create.model_id))?;

    let developer = Developers::new(&mut tx)
        .get_for_update(listing.developer_id)
        .await?
        .ok_or_else(|| Error::Internal {
            operation: "load owning developer".to_string(),
        })?;

    // Events the invocation handler already classified as quota failures are
    // recorded as-is; anything else is refused once the quota is spent.
    if create.outcome != UsageOutcome::InsufficientQuota && !developer.has_quota(1) {
        return Err(Error::QuotaExhausted {
            developer: developer.developer_name.clone(),
        });
    }

    // Cost is stamped once, at creation; later price changes never touch it
    let cost = metering::event_cost(
        listing.pricing_mode,
        listing.price_per_request,
        listing.price_per_token,
        input_tokens,
        output_tokens,
    );

    let request = UsageEventCreateDBRequest {
        user_id: user.map(|u| u.id),
        model_id: create.model_id,
        prompt: create.prompt,
        response: create.response.unwrap_or_default(),
        outcome: create.outcome,
        latency_ms: create.latency_ms,
        input_tokens,
        output_tokens,
        cost_incurred: cost,
        client_ip: create.client_ip,
        user_agent: create.user_agent.unwrap_or_default(),
    };

    let event = UsageEvents::new(&mut tx).create(&request).await?;

    engine::apply_usage(&mut tx, &listing, create.outcome, create.latency_ms, cost).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(UsageEventResponse::from(event))))
}

#[utoipa::path(
    get,
    path = "/usage-events",
    tag = "usage",
    summary = "List your usage history",
    params(ListUsageQuery),
    responses(
        (status = 200, description = "Usage events, newest first", body = Vec<UsageEventResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_usage_events(
    State(state): State<AppState>,
    Query(query): Query<ListUsageQuery>,
    current_user: CurrentUser,
) -> Result<Json<Vec<UsageEventResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = UsageEvents::new(&mut conn);

    let filter = UsageEventFilter {
        user_id: current_user.id,
        model_id: query.model,
        outcome: query.outcome,
        skip: query.skip.unwrap_or(0),
        limit: query.limit.unwrap_or(100).min(1000),
    };
    let events = repo.list(&filter).await?;

    Ok(Json(events.into_iter().map(UsageEventResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/usage-events/stats",
    tag = "usage",
    summary = "Aggregate statistics over your usage history",
    responses(
        (status = 200, description = "Usage statistics", body = ActorUsageStats),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn usage_stats(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<ActorUsageStats>> {
    let stats = reports::actor_stats(&state.db, current_user.id).await?;
    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/usage-events/timeline",
    tag = "usage",
    summary = "Daily rollups of your usage",
    params(TimelineQuery),
    responses(
        (status = 200, description = "Per-day aggregates over the trailing range", body = Vec<TimelinePoint>),
        (status = 400, description = "Invalid day range"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn usage_timeline(
    State(state): State<AppState>,
    Query(query): Query<TimelineQuery>,
    current_user: CurrentUser,
) -> Result<Json<Vec<TimelinePoint>>> {
    let days = query.days.unwrap_or(30);
    if !(1..=365).contains(&days) {
        return Err(Error::Validation {
            message: "days must be between 1 and 365".to_string(),
        });
    }

    let timeline = reports::usage_timeline(&state.db, current_user.id, days).await?;
    Ok(Json(timeline))
}

#[utoipa::path(
    patch,
    path = "/usage-events/{id}/feedback",
    tag = "usage",
    summary = "Attach post-hoc feedback to an interaction",
    description = "The interaction rating/feedback pair is distinct from model reviews; these are \
                   the only mutable fields on a ledger entry and do not trigger metering.",
    request_body = UsageFeedback,
    responses(
        (status = 200, description = "Updated event", body = UsageEventResponse),
        (status = 400, description = "Invalid rating"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not your interaction"),
        (status = 404, description = "Event not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "Usage event ID")
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_usage_feedback(
    State(state): State<AppState>,
    Path(id): Path<UsageEventId>,
    current_user: CurrentUser,
    Json(feedback): Json<UsageFeedback>,
) -> Result<Json<UsageEventResponse>> {
    if let Some(rating) = feedback.rating
        && !(1..=5).contains(&rating)
    {
        return Err(Error::Validation {
            message: "rating must be between 1 and 5".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = UsageEvents::new(&mut conn);

    let event = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Usage event".to_string(),
        id: id.to_string(),
    })?;

    if event.user_id != Some(current_user.id) {
        return Err(Error::Forbidden {
            action: "annotate".to_string(),
            resource: "usage event".to_string(),
        });
    }

    let event = repo.update_feedback(id, feedback.rating, feedback.feedback.as_deref()).await?;
    Ok(Json(UsageEventResponse::from(event)))
}

#[utoipa::path(
    get,
    path = "/models/{id}/rate-limit",
    tag = "usage",
    summary = "Rate-limit status for you against a model",
    description = "Counts your events against the model in the trailing window and reports \
                   whether the configured threshold has been reached. Pure query; recording is \
                   unaffected.",
    params(
        ("id" = uuid::Uuid, Path, description = "Model ID"),
        RateLimitQuery
    ),
    responses(
        (status = 200, description = "Rate-limit status", body = RateLimitStatus),
        (status = 400, description = "Unrecognized window"),
        (status = 404, description = "Model not found"),
        (status = 500, description = "Internal server error")
    ),
    security((), ("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn rate_limit_status(
    State(state): State<AppState>,
    Path(id): Path<ModelId>,
    Query(query): Query<RateLimitQuery>,
    OptionalUser(user): OptionalUser,
) -> Result<Json<RateLimitStatus>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let listing = Listings::new(&mut conn).get_by_id(id).await?.ok_or_else(|| model_not_found(id))?;

    let status = engine::rate_limit_status(&mut conn, &listing, user.map(|u| u.id), query.window).await?;
    Ok(Json(status))
}
