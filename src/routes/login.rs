use rocket::form::Form;
use rocket::http::{CookieJar, Status};
use rocket::response::Redirect;
use rocket::State;
use rocket_dyn_templates::Template;
use serde::Deserialize;
use serde_json::json;

use super::query_failed;
use crate::auth::{self, ClientIp, Session, SessionKind, SessionUser, StaffUser};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::models::club::Club;
use crate::models::member::Member;
use crate::models::request::RequestMessage;
use crate::models::user::User;
use crate::rate_limit::{RateLimiter, LOGIN_MAX_ATTEMPTS, LOGIN_WINDOW};

#[derive(Debug, FromForm, Deserialize)]
pub struct LoginForm {
    pub user_id: String,
    pub password: String,
}

#[derive(Debug, FromForm, Deserialize)]
pub struct MemberLoginForm {
    pub member_name: String,
    pub password: String,
}

#[derive(Debug, FromForm)]
pub struct UserEditForm {
    pub user_name: String,
    pub password: String,
    pub password_confirm: String,
}

fn login_page(error: Option<&str>) -> Template {
    Template::render("login/login", json!({ "error": error }))
}

/// Member whose name and login password match, if any.
pub(crate) fn authenticate_member(pool: &DbPool, member_name: &str, password: &str) -> Option<(i64, String)> {
    Member::login_candidates(pool, member_name.trim())
        .into_iter()
        .find(|(_, _, hash)| auth::verify_password(password, hash))
        .map(|(no, name, _)| (no, name))
}

fn start_session(
    pool: &DbPool,
    config: &AppConfig,
    cookies: &CookieJar<'_>,
    session: &Session,
    ip: &str,
) -> Result<Redirect, Template> {
    match auth::create_session(pool, config, session, Some(ip)) {
        Ok(session_id) => {
            auth::set_session_cookie(cookies, &session_id, config);
            log::info!("{:?} session started for {}", session.kind, session.user_name);
            Ok(Redirect::to("/success"))
        }
        Err(e) => {
            log::error!("create session failed: {}", e);
            Err(login_page(Some("Session creation failed")))
        }
    }
}

#[get("/")]
pub fn index(user: Option<SessionUser>) -> Result<Template, Redirect> {
    match user {
        Some(_) => Err(Redirect::to("/success")),
        None => Ok(login_page(None)),
    }
}

#[post("/login", data = "<form>")]
pub fn login_submit(
    form: Form<LoginForm>,
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    limiter: &State<RateLimiter>,
    ip: ClientIp,
    cookies: &CookieJar<'_>,
) -> Result<Redirect, Template> {
    // Stale buckets from every login surface are swept here
    limiter.cleanup(LOGIN_WINDOW);
    let rate_key = format!("login:{}", auth::hash_ip(&ip.0));
    if !limiter.check_and_record(&rate_key, LOGIN_MAX_ATTEMPTS, LOGIN_WINDOW) {
        log::warn!("login rate limit hit");
        return Err(login_page(Some(
            "Too many login attempts. Please try again in 15 minutes.",
        )));
    }

    let user = match User::get_by_login(pool, form.user_id.trim()) {
        Some(u) if auth::verify_password(&form.password, &u.user_password) => u,
        _ => return Err(login_page(Some("Invalid credentials"))),
    };
    limiter.reset(&rate_key);

    let session = Session {
        user_no: user.user_no,
        user_name: user.user_name,
        user_role: user.user_role,
        kind: SessionKind::User,
    };
    start_session(pool, config, cookies, &session, &ip.0)
}

#[post("/mlogin", data = "<form>")]
pub fn member_login_submit(
    form: Form<MemberLoginForm>,
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    limiter: &State<RateLimiter>,
    ip: ClientIp,
    cookies: &CookieJar<'_>,
) -> Result<Redirect, Template> {
    let rate_key = format!("login:{}", auth::hash_ip(&ip.0));
    if !limiter.check_and_record(&rate_key, LOGIN_MAX_ATTEMPTS, LOGIN_WINDOW) {
        log::warn!("member login rate limit hit");
        return Err(login_page(Some(
            "Too many login attempts. Please try again in 15 minutes.",
        )));
    }

    let (member_no, member_name) = match authenticate_member(pool, &form.member_name, &form.password) {
        Some(m) => m,
        None => return Err(login_page(Some("Invalid credentials"))),
    };
    limiter.reset(&rate_key);

    let session = Session {
        user_no: member_no,
        user_name: member_name,
        user_role: "member".to_string(),
        kind: SessionKind::Member,
    };
    start_session(pool, config, cookies, &session, &ip.0)
}

#[get("/logout")]
pub fn logout(pool: &State<DbPool>, cookies: &CookieJar<'_>) -> Redirect {
    if let Some(session_id) = auth::session_cookie(cookies) {
        if let Err(e) = auth::destroy_session(pool, &session_id) {
            log::warn!("destroy session failed: {}", e);
        }
    }
    auth::clear_session_cookie(cookies);
    Redirect::to("/")
}

// ── Main page ──

fn main_page(user: &SessionUser, pool: &DbPool) -> Result<Template, Status> {
    let clubs = Club::list(pool, None).map_err(|e| query_failed("club list", e))?;
    let member_club = match user.session.kind {
        SessionKind::Member => Member::find(pool, user.session.user_no).map(|m| m.club_no),
        SessionKind::User => None,
    };

    let context = json!({
        "page_title": "Home",
        "session": user.session,
        "clubs": clubs,
        "club_count": clubs.len(),
        "member_club": member_club,
        "open_requests": RequestMessage::open_count(pool),
    });
    Ok(Template::render("member/mainClub", &context))
}

#[get("/success")]
pub fn success(user: SessionUser, pool: &State<DbPool>) -> Result<Template, Status> {
    main_page(&user, pool)
}

#[get("/userHome")]
pub fn user_home(user: SessionUser, pool: &State<DbPool>) -> Result<Template, Status> {
    main_page(&user, pool)
}

// ── Account ──

#[get("/userEdit")]
pub fn user_edit_page(staff: StaffUser, pool: &State<DbPool>) -> Result<Template, Status> {
    let user = User::get_by_no(pool, staff.session.user_no).ok_or(Status::NotFound)?;
    let context = json!({
        "page_title": "Account",
        "session": staff.session,
        "user": user.safe_json(),
        "error": null,
    });
    Ok(Template::render("login/userEdit", &context))
}

#[post("/userEdit", data = "<form>")]
pub fn user_edit_submit(
    staff: StaffUser,
    form: Form<UserEditForm>,
    pool: &State<DbPool>,
) -> Result<Redirect, Template> {
    let render_err = |msg: &str| {
        let user = User::get_by_no(pool, staff.session.user_no).map(|u| u.safe_json());
        Template::render(
            "login/userEdit",
            json!({
                "page_title": "Account",
                "session": staff.session,
                "user": user,
                "error": msg,
            }),
        )
    };

    let name = form.user_name.trim();
    if !name.is_empty() {
        if let Err(e) = User::update_name(pool, staff.session.user_no, name) {
            log::error!("user name update failed: {}", e);
            return Err(render_err("Could not save the display name."));
        }
    }

    if !form.password.is_empty() {
        if form.password.len() < 8 {
            return Err(render_err("Password must be at least 8 characters."));
        }
        if form.password != form.password_confirm {
            return Err(render_err("Passwords do not match."));
        }
        let saved = auth::hash_password(&form.password)
            .and_then(|hash| User::update_password(pool, staff.session.user_no, &hash));
        if let Err(e) = saved {
            log::error!("user password update failed: {}", e);
            return Err(render_err("Could not save the password."));
        }
    }

    Ok(Redirect::to("/userHome"))
}
