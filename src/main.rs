use std::path::Path;
use std::sync::Arc;

use actix_files::Files;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use recipereview::api::{self, pages};
use recipereview::config::Config;
use recipereview::db::Database;
use recipereview::search::EdamamProvider;
use recipereview::AppState;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("recipereview=info,actix_web=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load().context("loading configuration")?;

    // Initialize the database
    let db = Database::new(&config.database.path)
        .with_context(|| format!("opening database {}", config.database.path))?;
    db.create_schema().await.context("creating schema")?;
    info!("Database ready at {}", config.database.path);

    let search = EdamamProvider::from_config(&config.search)?;

    let addr = config.server.addr.clone();
    let static_dir = config.server.static_dir.clone();
    let serve_static = Path::new(&static_dir).is_dir();
    if !serve_static {
        warn!("Static directory '{}' not found, /static/ disabled", static_dir);
    }

    let state = web::Data::new(AppState {
        db,
        search: Arc::new(search),
        config,
    });

    info!("listening on http://{}", addr);
    HttpServer::new(move || {
        let mut app = App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(api::configure);
        if serve_static {
            app = app.service(Files::new("/static", &static_dir));
        }
        app.default_service(web::route().to(pages::not_found))
    })
    .bind(&addr)
    .with_context(|| format!("binding {addr}"))?
    .run()
    .await?;

    Ok(())
}
