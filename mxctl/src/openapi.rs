//! OpenAPI documentation for the management API, served through RapiDoc at
//! `/docs`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{developers, models, reviews, usage, users};
use crate::api::models as api_models;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "BearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("API key")
                        .description(Some("API key issued at registration, e.g. `mx-...`"))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "mxctl",
        description = "Model exchange control layer: publish, invoke, meter, and review AI model listings."
    ),
    paths(
        users::register_user,
        users::get_user,
        developers::register_developer,
        developers::list_developers,
        developers::get_developer,
        developers::update_developer,
        developers::get_developer_models,
        developers::verify_developer,
        developers::reset_developer_usage,
        models::create_model,
        models::list_models,
        models::featured_models,
        models::get_model,
        models::update_model,
        models::delete_model,
        models::model_stats,
        usage::record_usage_event,
        usage::list_usage_events,
        usage::usage_stats,
        usage::usage_timeline,
        usage::update_usage_feedback,
        usage::rate_limit_status,
        reviews::create_review,
        reviews::get_review,
        reviews::delete_review,
        reviews::list_model_reviews,
        reviews::model_review_stats,
        reviews::vote_on_review,
        reviews::remove_review_vote,
    ),
    components(schemas(
        api_models::users::UserRegister,
        api_models::users::UserResponse,
        api_models::users::UserRegisterResponse,
        api_models::developers::DeveloperStatus,
        api_models::developers::DeveloperRegister,
        api_models::developers::DeveloperUpdate,
        api_models::developers::DeveloperResponse,
        api_models::listings::ModelCategory,
        api_models::listings::ModelStatus,
        api_models::listings::PricingMode,
        api_models::listings::ModelCreate,
        api_models::listings::ModelUpdate,
        api_models::listings::ModelResponse,
        api_models::listings::ModelStatsResponse,
        api_models::usage::UsageOutcome,
        api_models::usage::RateLimitWindow,
        api_models::usage::UsageEventCreate,
        api_models::usage::UsageEventResponse,
        api_models::usage::UsageFeedback,
        api_models::usage::RateLimitStatus,
        api_models::usage::ActorUsageStats,
        api_models::usage::TimelinePoint,
        api_models::reviews::VoteKind,
        api_models::reviews::ReviewCreate,
        api_models::reviews::ReviewResponse,
        api_models::reviews::VoteRequest,
        api_models::reviews::VoteStatus,
        api_models::reviews::RatingBucket,
        api_models::reviews::MostHelpfulReview,
        api_models::reviews::ReviewStatsResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "users", description = "Account registration and lookup"),
        (name = "developers", description = "Developer profiles, quotas, and verification"),
        (name = "models", description = "Model catalog"),
        (name = "usage", description = "Usage ledger, metering, and rate-limit status"),
        (name = "reviews", description = "Reviews and helpfulness votes"),
    )
)]
pub struct ApiDoc;
