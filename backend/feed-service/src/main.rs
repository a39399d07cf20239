use actix_web::{dev::Service, web, App, HttpServer};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feed_service::config::Config;
use feed_service::handlers::{
    get_explore_feed, get_home_feed, get_reels_feed, hide_post, post_engagement, put_preferences,
    AppState,
};
use feed_service::services::sources::{
    ContentClient, FollowingSource, RecommendedSource, SponsoredSource, SuggestedAccountsSource,
    TrendingSource,
};
use feed_service::services::{CandidateAggregator, CandidateSource, FeedPipeline, FeedbackRecorder};
use feed_service::{CacheConfig, FeedCache};
use signal_store::{SignalStore, StoreConfig};
use tracing::info;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    // Structured JSON logging with env-driven filtering
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {:#}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting feed-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    // Signal store is the leaf dependency of everything else; refuse to
    // start without it.
    let store = match SignalStore::connect(&config.redis.url, StoreConfig::default()).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Signal store connection failed: {:#}", e);
            eprintln!("ERROR: Failed to connect signal store: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = store.ping().await {
        tracing::error!("Signal store health check failed: {:#}", e);
        eprintln!("ERROR: Signal store health check failed: {}", e);
        std::process::exit(1);
    }
    info!("Signal store connected");

    // The page cache is optional: unreachable cache means every lookup
    // is a miss and the pipeline runs uncached.
    let cache = match FeedCache::new(&config.redis.url, CacheConfig::from(&config.cache)).await {
        Ok(cache) => {
            info!("Feed cache connected");
            Some(cache)
        }
        Err(e) => {
            tracing::warn!("Feed cache unavailable, running uncached: {}", e);
            None
        }
    };

    let content_client = match ContentClient::new(&config.sources) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!("Content client construction failed: {:#}", e);
            eprintln!("ERROR: Failed to build content client: {}", e);
            std::process::exit(1);
        }
    };

    let sources: Vec<Arc<dyn CandidateSource>> = vec![
        Arc::new(FollowingSource::new(content_client.clone())),
        Arc::new(RecommendedSource::new(content_client.clone())),
        Arc::new(TrendingSource::new(content_client.clone())),
        Arc::new(SponsoredSource::new(
            content_client.clone(),
            config.sources.sponsored_limit,
        )),
        Arc::new(SuggestedAccountsSource::new(
            content_client.clone(),
            config.sources.suggested_limit,
        )),
    ];
    let aggregator = CandidateAggregator::new(
        sources,
        Duration::from_millis(config.sources.timeout_ms),
    );
    info!("Candidate aggregator initialized with 5 sources");

    let pipeline = FeedPipeline::new(&config.ranking);

    let feedback = FeedbackRecorder::spawn(store.clone(), config.feedback.channel_capacity);
    info!("Feedback recorder started");

    // Periodic affinity recompute from the interaction log
    let job_store = store.clone();
    let job_interval = config.feedback.affinity_interval_secs;
    tokio::spawn(async move {
        feed_service::jobs::affinity_refresh::start_affinity_refresh(job_store, job_interval).await;
    });
    info!("Affinity refresh background job started");

    let state = web::Data::new(AppState {
        store,
        cache,
        content_client,
        aggregator,
        pipeline,
        feedback,
    });

    let port = config.app.port;
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(feed_service::metrics::serve_metrics))
            .wrap_fn(|req, srv| {
                let method = req.method().to_string();
                let path = req
                    .match_pattern()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| req.path().to_string());
                let start = Instant::now();

                let fut = srv.call(req);
                async move {
                    match fut.await {
                        Ok(res) => {
                            feed_service::metrics::observe_http_request(
                                &method,
                                &path,
                                res.status().as_u16(),
                                start.elapsed(),
                            );
                            Ok(res)
                        }
                        Err(err) => {
                            feed_service::metrics::observe_http_request(
                                &method,
                                &path,
                                500,
                                start.elapsed(),
                            );
                            Err(err)
                        }
                    }
                }
            })
            .service(
                web::scope("/feed")
                    .service(get_home_feed)
                    .service(get_explore_feed)
                    .service(get_reels_feed)
                    .service(post_engagement)
                    .service(put_preferences)
                    .service(hide_post),
            )
    })
    .bind(format!("0.0.0.0:{}", port))?
    .run()
    .await
}
