use actix_web::{web, App, HttpServer};
use contact_chat_service::{config, db, error, logging, metrics, middleware, routes, state::AppState};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    let pool = db::init_pool(&cfg.database_url, cfg.db_max_connections)?;
    db::run_migrations(&pool).await?;

    let state = AppState::postgres(pool, cfg.clone());

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting contact-chat-service");

    HttpServer::new(move || {
        let cors = actix_cors::Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(middleware::RequestId::new())
            .app_data(web::Data::new(state.clone()))
            .service(
                web::scope("/api/v1")
                    .configure(routes::contacts::configure)
                    .configure(routes::messages::configure),
            )
            .service(routes::wsroute::ws_handler)
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(metrics::metrics_handler))
    })
    .bind(&bind_addr)
    .map_err(|e| error::AppError::StartServer(format!("bind: {e}")))?
    .run()
    .await
    .map_err(|e| error::AppError::StartServer(format!("run server: {e}")))
}
