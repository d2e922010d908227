use rocket::http::{ContentType, Status};
use rocket::response::Redirect;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::login::authenticate_member;
use super::query_failed;
use crate::auth::{self, ClientIp};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::images;
use crate::models::board::{Board, BoardMessage};
use crate::models::club::Club;
use crate::models::document::ClubDocument;
use crate::models::member::Member;
use crate::models::photo::PhotoKind;
use crate::models::rank::Rank;
use crate::models::region::{Region, RegionDetail};
use crate::models::request::{RequestForm, RequestMessage};
use crate::models::staff::ClubStaff;
use crate::rate_limit::{RateLimiter, LOGIN_MAX_ATTEMPTS, LOGIN_WINDOW};
use crate::slogan;

// ── Reference data ─────────────────────────────────────

#[get("/clubs")]
pub fn clubs(pool: &State<DbPool>) -> Result<Json<Value>, Status> {
    let clubs = Club::list(pool, None).map_err(|e| query_failed("phapp clubs", e))?;
    Ok(Json(json!({ "clubs": clubs })))
}

#[get("/club/<no>")]
pub fn club(pool: &State<DbPool>, config: &State<AppConfig>, no: i64) -> Result<Json<Value>, Status> {
    let club = Club::find(pool, no).ok_or(Status::NotFound)?;
    Ok(Json(json!({
        "club": club,
        "staff": ClubStaff::current(pool, no),
        "document": ClubDocument::current(pool, no),
        "slogan": config.url(&format!("phapp/slogan/{}", no)),
    })))
}

#[get("/club/<no>/members")]
pub fn club_members(pool: &State<DbPool>, config: &State<AppConfig>, no: i64) -> Result<Json<Value>, Status> {
    let members = Member::list_by_club(pool, no).map_err(|e| query_failed("phapp club members", e))?;
    let rows: Vec<Value> = members
        .iter()
        .map(|m| m.summary_json(&images::thumb_url(config, PhotoKind::Portrait, m.member_no)))
        .collect();
    Ok(Json(json!({ "clubNo": no, "members": rows })))
}

/// Member detail; a private member's contact fields carry the placeholder.
#[get("/member/<no>")]
pub fn member(pool: &State<DbPool>, config: &State<AppConfig>, no: i64) -> Result<Json<Value>, Status> {
    let member = Member::find(pool, no).ok_or(Status::NotFound)?;
    let spouse = Member::spouse(pool, no);
    let business = Member::business(pool, no);

    let mut body = member.detail_json(spouse.as_ref(), business.as_ref());
    body["photos"] = json!({
        "photo": images::thumb_url(config, PhotoKind::Portrait, no),
        "namecard": images::thumb_url(config, PhotoKind::Namecard, no),
        "spouse": images::thumb_url(config, PhotoKind::Spouse, no),
    });
    Ok(Json(body))
}

#[get("/ranks")]
pub fn ranks(pool: &State<DbPool>) -> Result<Json<Value>, Status> {
    let ranks = Rank::list(pool).map_err(|e| query_failed("phapp ranks", e))?;
    Ok(Json(json!({ "ranks": ranks })))
}

#[get("/regions")]
pub fn regions(pool: &State<DbPool>) -> Result<Json<Value>, Status> {
    let regions = Region::list(pool).map_err(|e| query_failed("phapp regions", e))?;
    let rows: Vec<Value> = regions
        .iter()
        .map(|r| json!({ "region": r, "detail": RegionDetail::current(pool, r.region_no) }))
        .collect();
    Ok(Json(json!({ "regions": rows })))
}

#[get("/board/<board_no>")]
pub fn board(pool: &State<DbPool>, board_no: i64) -> Result<Json<Value>, Status> {
    let board = Board::find(pool, board_no).ok_or(Status::NotFound)?;
    let messages = BoardMessage::list_for_board(pool, board_no)
        .map_err(|e| query_failed("phapp board messages", e))?;
    Ok(Json(json!({ "board": board, "messages": messages })))
}

// ── Member login ───────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PhappLogin {
    #[serde(alias = "memberName")]
    pub member_name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhappLoginResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_no: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PhappLoginResponse {
    fn failed(msg: &str) -> Json<Self> {
        Json(PhappLoginResponse {
            ok: false,
            member_no: None,
            member_name: None,
            error: Some(msg.to_string()),
        })
    }
}

#[post("/login", format = "json", data = "<body>")]
pub fn login(
    pool: &State<DbPool>,
    limiter: &State<RateLimiter>,
    client_ip: ClientIp,
    body: Json<PhappLogin>,
) -> Json<PhappLoginResponse> {
    let rate_key = format!("login:{}", auth::hash_ip(&client_ip.0));
    if !limiter.check_and_record(&rate_key, LOGIN_MAX_ATTEMPTS, LOGIN_WINDOW) {
        return PhappLoginResponse::failed("Too many login attempts");
    }

    match authenticate_member(pool, &body.member_name, &body.password) {
        Some((member_no, member_name)) => {
            limiter.reset(&rate_key);
            Json(PhappLoginResponse {
                ok: true,
                member_no: Some(member_no),
                member_name: Some(member_name),
                error: None,
            })
        }
        None => PhappLoginResponse::failed("Invalid credentials"),
    }
}

// ── Request queue ──────────────────────────────────────

#[post("/request", format = "json", data = "<body>")]
pub fn request(pool: &State<DbPool>, body: Json<RequestForm>) -> Result<Json<Value>, Status> {
    if body.body.trim().is_empty() {
        return Err(Status::BadRequest);
    }
    let id = RequestMessage::create(pool, &body).map_err(|e| query_failed("phapp request insert", e))?;
    log::info!("request {} queued from {}", id, body.sender);
    Ok(Json(json!({ "ok": true, "id": id })))
}

// ── Slogan card ────────────────────────────────────────

/// Serves the cached card when present; renders (and caches) otherwise.
#[get("/slogan/<club_no>")]
pub fn slogan_image(
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    club_no: i64,
) -> Result<(ContentType, Vec<u8>), Redirect> {
    if let Some(png) = slogan::cached(config, club_no) {
        return Ok((ContentType::PNG, png));
    }
    match slogan::render_and_cache(pool, config, club_no) {
        Ok(png) => Ok((ContentType::PNG, png)),
        Err(e) => {
            log::error!("slogan render for club {} failed: {}", club_no, e);
            Err(Redirect::to(format!("/phapp/club/{}", club_no)))
        }
    }
}
