use crate::{api::analytics, config::Config};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{HttpRequest, HttpResponse, error, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let per_ms = 60_000 / requests_per_min as u64;
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms.max(1))
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap_or_else(|| {
                tracing::warn!(requests_per_min, "Invalid rate limit, using governor defaults");
                GovernorConfig::default()
            });
        Governor::new(&cfg)
    }

    let analytics_limiter = Arc::new(build_limiter(config.rate_analytics_per_min));
    let export_limiter = Arc::new(build_limiter(config.rate_export_per_min));

    cfg.app_data(web::QueryConfig::default().error_handler(query_error));

    cfg.service(
        web::scope(&config.api_prefix).service(
            web::scope("/analytics/{org_id}")
                // /analytics/{org_id}
                .service(
                    web::resource("")
                        .wrap(analytics_limiter.clone())
                        .route(web::get().to(analytics::analytics_report)),
                )
                .service(
                    web::resource("/timings")
                        .wrap(analytics_limiter.clone())
                        .route(web::get().to(analytics::average_timings)),
                )
                .service(
                    web::resource("/hours")
                        .wrap(analytics_limiter.clone())
                        .route(web::get().to(analytics::hours_worked)),
                )
                .service(
                    web::resource("/late-arrivals")
                        .wrap(analytics_limiter.clone())
                        .route(web::get().to(analytics::late_arrivals)),
                )
                .service(
                    web::resource("/early-departures")
                        .wrap(analytics_limiter.clone())
                        .route(web::get().to(analytics::early_departures)),
                )
                .service(
                    web::resource("/overtime")
                        .wrap(analytics_limiter.clone())
                        .route(web::get().to(analytics::overtime_report)),
                )
                .service(
                    web::resource("/excessive-overtime")
                        .wrap(analytics_limiter.clone())
                        .route(web::get().to(analytics::excessive_overtime)),
                )
                .service(
                    web::resource("/branches")
                        .wrap(analytics_limiter.clone())
                        .route(web::get().to(analytics::compare_branches)),
                )
                .service(
                    web::resource("/patterns")
                        .wrap(analytics_limiter)
                        .route(web::get().to(analytics::detect_patterns)),
                )
                // exports are heavier, limited separately
                .service(
                    web::resource("/export")
                        .wrap(export_limiter)
                        .route(web::get().to(analytics::export_report)),
                ),
        ),
    );
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = err.to_string();
    error::InternalError::from_response(
        err,
        HttpResponse::BadRequest().json(serde_json::json!({ "message": message })),
    )
    .into()
}
