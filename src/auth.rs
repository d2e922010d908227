use chrono::{Duration, Utc};
use rocket::http::{Cookie, CookieJar, Status};
use rocket::request::{FromRequest, Outcome, Request};
use rocket::State;
use rusqlite::params;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::AppConfig;
use crate::db::DbPool;

const SESSION_COOKIE: &str = "lions_session";

/// Who a session belongs to: a portal account or a club member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    User,
    Member,
}

impl SessionKind {
    fn as_str(&self) -> &'static str {
        match self {
            SessionKind::User => "user",
            SessionKind::Member => "member",
        }
    }
}

/// Values held in the server-side session row.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user_no: i64,
    pub user_name: String,
    pub user_role: String,
    pub kind: SessionKind,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.kind == SessionKind::User && self.user_role == "admin"
    }
}

// ── Client IP request guard ──

/// Client address, preferring the proxy headers over the socket peer.
pub struct ClientIp(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let headers = request.headers();

        if let Some(ip) = headers.get_one("X-Real-IP") {
            let ip = ip.trim();
            if !ip.is_empty() {
                return Outcome::Success(ClientIp(ip.to_string()));
            }
        }

        // X-Forwarded-For: client, proxy1, proxy2; the leftmost entry is the client
        if let Some(forwarded) = headers.get_one("X-Forwarded-For") {
            if let Some(ip) = forwarded.split(',').next() {
                let ip = ip.trim();
                if !ip.is_empty() {
                    return Outcome::Success(ClientIp(ip.to_string()));
                }
            }
        }

        let ip = request
            .client_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Outcome::Success(ClientIp(ip))
    }
}

// ── Session guards ──

/// Guard: any signed-in session, staff or member.
pub struct SessionUser {
    pub session: Session,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SessionUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match resolve_session(request).await {
            Some(session) => Outcome::Success(SessionUser { session }),
            None => Outcome::Forward(Status::Unauthorized),
        }
    }
}

/// Guard: a portal account session. Required for every write.
pub struct StaffUser {
    pub session: Session,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for StaffUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match resolve_session(request).await {
            Some(session) if session.kind == SessionKind::User => {
                Outcome::Success(StaffUser { session })
            }
            Some(_) => Outcome::Forward(Status::Forbidden),
            None => Outcome::Forward(Status::Unauthorized),
        }
    }
}

async fn resolve_session(request: &Request<'_>) -> Option<Session> {
    let pool = request.guard::<&State<DbPool>>().await.succeeded()?;
    let cookies = request.cookies();
    let session_id = cookies.get_private(SESSION_COOKIE)?.value().to_string();

    match get_session(pool, &session_id) {
        Some(session) => Some(session),
        None => {
            cookies.remove_private(Cookie::from(SESSION_COOKIE));
            None
        }
    }
}

// ── Password utilities ──

pub fn hash_password(password: &str) -> Result<String, String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|e| e.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

// ── Session management ──

pub fn create_session(
    pool: &DbPool,
    config: &AppConfig,
    session: &Session,
    ip: Option<&str>,
) -> Result<String, String> {
    let conn = pool.get().map_err(|e| e.to_string())?;

    let session_id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();
    let expires = now + Duration::hours(config.session_hours.max(1));
    let ip_hash = ip.map(hash_ip);

    conn.execute(
        "INSERT INTO sessions (id, user_no, user_name, user_role, kind, created_at, expires_at, ip_address)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            session_id,
            session.user_no,
            session.user_name,
            session.user_role,
            session.kind.as_str(),
            now,
            expires,
            ip_hash
        ],
    )
    .map_err(|e| e.to_string())?;

    Ok(session_id)
}

/// Look up an unexpired session
pub fn get_session(pool: &DbPool, session_id: &str) -> Option<Session> {
    let conn = pool.get().ok()?;
    let now = Utc::now().naive_utc();
    conn.query_row(
        "SELECT user_no, user_name, user_role, kind FROM sessions
         WHERE id = ?1 AND expires_at > ?2",
        params![session_id, now],
        |row| {
            let kind: String = row.get(3)?;
            Ok(Session {
                user_no: row.get(0)?,
                user_name: row.get(1)?,
                user_role: row.get(2)?,
                kind: if kind == "member" {
                    SessionKind::Member
                } else {
                    SessionKind::User
                },
            })
        },
    )
    .ok()
}

pub fn destroy_session(pool: &DbPool, session_id: &str) -> Result<(), String> {
    let conn = pool.get().map_err(|e| e.to_string())?;
    conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])
        .map_err(|e| e.to_string())?;
    Ok(())
}

pub fn set_session_cookie(cookies: &CookieJar<'_>, session_id: &str, config: &AppConfig) {
    let mut cookie = Cookie::new(SESSION_COOKIE, session_id.to_string());
    cookie.set_http_only(true);
    cookie.set_same_site(rocket::http::SameSite::Lax);
    cookie.set_path("/");
    if config.base_url.starts_with("https://") {
        cookie.set_secure(true);
    }
    cookies.add_private(cookie);
}

/// Session id from the private cookie, if any.
pub fn session_cookie(cookies: &CookieJar<'_>) -> Option<String> {
    cookies
        .get_private(SESSION_COOKIE)
        .map(|c| c.value().to_string())
}

pub fn clear_session_cookie(cookies: &CookieJar<'_>) {
    cookies.remove_private(Cookie::from(SESSION_COOKIE));
}

pub fn hash_ip(ip: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn cleanup_expired_sessions(pool: &DbPool) -> Result<usize, String> {
    let conn = pool.get().map_err(|e| e.to_string())?;
    let now = Utc::now().naive_utc();
    conn.execute("DELETE FROM sessions WHERE expires_at < ?1", params![now])
        .map_err(|e| e.to_string())
}
