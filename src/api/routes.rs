use bytes::Bytes;
use std::convert::Infallible;
use warp::{Filter, Rejection, Reply};

use crate::api::error::handle_rejection;
use crate::api::handlers::{self, AppContext};
use crate::config::Config;
use crate::monitoring::logger;

fn with_context(ctx: AppContext) -> impl Filter<Extract = (AppContext,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

fn json_body(limit: u64) -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::body::content_length_limit(limit).and(warp::body::bytes())
}

/// The complete route tree. Paths are matched before methods so an unknown
/// path is a 404 and a known path with the wrong method is a 405.
pub fn routes(
    ctx: AppContext,
    config: &Config,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    #[cfg(feature = "metrics")]
    let request_metrics = ctx.metrics();
    let limit = config.server.max_body_bytes;

    let root = warp::path::end().and(warp::get()).and_then(handlers::root);

    let health = warp::path!("health").and(warp::get()).and_then(handlers::health);

    let analyze = warp::path!("analyze")
        .and(warp::post())
        .and(json_body(limit))
        .and(with_context(ctx.clone()))
        .and_then(handlers::analyze);

    let stats = warp::path!("stats")
        .and(warp::post())
        .and(json_body(limit))
        .and(with_context(ctx.clone()))
        .and_then(handlers::stats);

    let forecast = warp::path!("forecast" / "arima")
        .and(warp::post())
        .and(json_body(limit))
        .and(with_context(ctx.clone()))
        .and_then(handlers::forecast);

    let metrics = warp::path!("metrics")
        .and(warp::get())
        .and(with_context(ctx))
        .and_then(handlers::metrics);

    let access_log = warp::log::custom(move |info| {
        #[cfg(feature = "metrics")]
        if let Some(m) = &request_metrics {
            m.observe(logger::route_label(info.path()), info.status().as_u16(), info.elapsed());
        }
        logger::log_request(&info);
    });

    root.or(health)
        .or(analyze)
        .or(stats)
        .or(forecast)
        .or(metrics)
        .recover(handle_rejection)
        .with(access_log)
}
