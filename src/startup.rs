use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::TokenService;
use crate::configuration::Settings;
use crate::domain::Role;
use crate::logger::RequestLogger;
use crate::middleware::{Authenticate, ErrorResponder, RequireRole};
use crate::routes::{
    create_user, delete_user, get_user, health_check, login, logout, not_found, profile, refresh,
    register, update_user,
};
use crate::store::{InMemoryUserStore, PgUserStore, TimedUserStore, UserStore};

/// Shared, immutable per-process state handed to every handler.
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub store: Arc<dyn UserStore>,
    pub cookie_secure: bool,
}

/// Build the configured user store, bounded by `store.timeout_ms`.
///
/// With a `database` section this connects to Postgres and runs the
/// migrations; without one the process-local store is used.
pub async fn build_store(settings: &Settings) -> Result<Arc<dyn UserStore>, std::io::Error> {
    let timeout = settings.store.timeout();

    let Some(database) = &settings.database else {
        tracing::warn!("No database configured, using the in-memory user store");
        return Ok(Arc::new(TimedUserStore::new(InMemoryUserStore::new(), timeout)));
    };

    tracing::info!(host = %database.host, database = %database.database_name, "Connecting to database");
    let pool = PgPoolOptions::new()
        .max_connections(database.max_connections)
        .acquire_timeout(timeout)
        .connect(&database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e)
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run migrations: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e)
    })?;

    Ok(Arc::new(TimedUserStore::new(PgUserStore::new(pool), timeout)))
}

pub fn run(
    listener: TcpListener,
    store: Arc<dyn UserStore>,
    settings: &Settings,
) -> Result<Server, std::io::Error> {
    let tokens = Arc::new(TokenService::new(&settings.jwt));
    let environment = settings.application.environment;
    let state = web::Data::new(AppState {
        tokens: tokens.clone(),
        store: store.clone(),
        cookie_secure: settings.cookie_secure(),
    });

    let server = HttpServer::new(move || {
        App::new()
            // Last wrapped runs first: the logger sees the rendered error.
            .wrap(ErrorResponder::new(environment))
            .wrap(RequestLogger)
            .app_data(state.clone())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/v1")
                    .service(
                        web::scope("/auth")
                            .route("/register", web::post().to(register))
                            .route("/login", web::post().to(login))
                            .route("/logout", web::post().to(logout))
                            .route("/refresh", web::post().to(refresh))
                            .service(
                                web::resource("/profile")
                                    .wrap(Authenticate::new(tokens.clone(), store.clone()))
                                    .route(web::get().to(profile)),
                            ),
                    )
                    // Guarded per resource so unmatched paths under /users
                    // still reach the 404 fallback.
                    .service(
                        web::scope("/users")
                            .service(
                                web::resource("")
                                    .wrap(RequireRole::new([Role::Admin]))
                                    .wrap(Authenticate::new(tokens.clone(), store.clone()))
                                    .route(web::post().to(create_user)),
                            )
                            .service(
                                web::resource("/{user_id}")
                                    .wrap(RequireRole::new([Role::Admin]))
                                    .wrap(Authenticate::new(tokens.clone(), store.clone()))
                                    .route(web::get().to(get_user))
                                    .route(web::patch().to(update_user))
                                    .route(web::delete().to(delete_user)),
                            ),
                    ),
            )
            .default_service(web::route().to(not_found))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
