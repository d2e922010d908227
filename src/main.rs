#[macro_use]
extern crate rocket;

use rocket::fs::FileServer;
use rocket::http::Status;
use rocket::response::Redirect;
use rocket::{Build, Request, Rocket};
use rocket_dyn_templates::Template;
use serde_json::json;

mod auth;
mod boot;
mod config;
mod db;
mod images;
mod models;
mod rate_limit;
mod routes;
mod slogan;
mod update;

#[cfg(test)]
mod tests;

use config::AppConfig;
use db::DbPool;
use rate_limit::RateLimiter;

fn error_page(status: Status, message: &str, req: &Request<'_>) -> Template {
    log::warn!("{} {} -> {}", req.method(), req.uri(), status.code);
    Template::render(
        "error/errorInfo",
        json!({
            "page_title": "Error",
            "code": status.code,
            "message": message,
        }),
    )
}

#[catch(400)]
fn bad_request(req: &Request<'_>) -> Template {
    error_page(Status::BadRequest, "The request could not be processed.", req)
}

/// Session guards forward with 401 (no session) or 403 (member session on a
/// staff route); both send the browser back to the login page.
#[catch(401)]
fn unauthorized(req: &Request<'_>) -> Redirect {
    log::debug!("{} {} without a session", req.method(), req.uri());
    Redirect::to("/")
}

#[catch(403)]
fn forbidden(req: &Request<'_>) -> Redirect {
    log::debug!("{} {} needs a staff session", req.method(), req.uri());
    Redirect::to("/")
}

#[catch(404)]
fn not_found(req: &Request<'_>) -> Template {
    error_page(Status::NotFound, "Page not found.", req)
}

#[catch(422)]
fn unprocessable(req: &Request<'_>) -> Template {
    error_page(Status::UnprocessableEntity, "Some form fields were missing or invalid.", req)
}

#[catch(500)]
fn server_error(req: &Request<'_>) -> Template {
    error_page(Status::InternalServerError, "Internal server error.", req)
}

/// Assemble the server around an initialised pool.
pub(crate) fn app(pool: DbPool, config: AppConfig) -> Rocket<Build> {
    let thumb_dir = config.thumb_dir.clone();

    rocket::build()
        .manage(pool)
        .manage(config)
        .manage(RateLimiter::new())
        .attach(Template::fairing())
        .mount("/static", FileServer::from("website/static"))
        .mount("/thumbs", FileServer::from(thumb_dir))
        .mount("/", routes::routes())
        .mount("/phapp", routes::phapp_routes())
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized,
                forbidden,
                not_found,
                unprocessable,
                server_error
            ],
        )
}

#[launch]
fn rocket() -> _ {
    // .env first, so RUST_LOG from it reaches the logger
    let dotenv = dotenvy::dotenv();
    env_logger::init();
    if let Err(e) = dotenv {
        log::debug!("No .env loaded: {}", e);
    }

    let config = AppConfig::from_env();

    // Boot check: verify/create directories, validate critical files
    boot::run(&config);

    let pool = db::init_pool(&config.db_path).expect("Failed to initialize database pool");
    db::run_migrations(&pool).expect("Failed to run database migrations");
    db::seed_defaults(&pool, &config.admin_password).expect("Failed to seed defaults");

    match auth::cleanup_expired_sessions(&pool) {
        Ok(0) => {}
        Ok(n) => log::info!("Purged {} expired session(s)", n),
        Err(e) => log::warn!("Session purge failed: {}", e),
    }

    log::info!("Serving {} (db: {})", config.base_url, config.db_path);
    app(pool, config)
}
