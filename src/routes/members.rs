use std::collections::HashMap;

use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::http::{ContentType, Status};
use rocket::response::Redirect;
use rocket::tokio::io::AsyncReadExt;
use rocket::tokio::task;
use rocket::State;
use rocket_dyn_templates::Template;
use serde_json::{json, Value};

use super::query_failed;
use crate::auth::{self, SessionKind, SessionUser, StaffUser};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::images;
use crate::models::club::Club;
use crate::models::member::{Business, Member, MemberForm, Spouse};
use crate::models::photo::{PhotoKind, StoredPhoto};
use crate::models::rank::Rank;

#[derive(FromForm)]
pub struct PhotoUpload<'r> {
    pub file: TempFile<'r>,
}

#[derive(Debug, FromForm)]
pub struct MemberPasswordForm {
    pub password: String,
}

#[get("/memberList?<club_no>")]
pub fn member_list(
    user: SessionUser,
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    club_no: Option<i64>,
) -> Result<Template, Status> {
    let members = match club_no {
        Some(no) => Member::list_by_club(pool, no),
        None => Member::list_all(pool),
    }
    .map_err(|e| query_failed("member list", e))?;
    let clubs = Club::list(pool, None).map_err(|e| query_failed("club list", e))?;
    let ranks = Rank::list(pool).map_err(|e| query_failed("rank list", e))?;

    let rows: Vec<Value> = members
        .iter()
        .map(|m| {
            json!({
                "member": m,
                "thumb": images::thumb_url(config, PhotoKind::Portrait, m.member_no),
            })
        })
        .collect();

    let context = json!({
        "page_title": "Members",
        "session": user.session,
        "members": rows,
        "clubs": clubs,
        "ranks": ranks,
        "club_filter": club_no,
    });
    Ok(Template::render("member/memberList", &context))
}

#[get("/member/<no>")]
pub fn member_detail(
    user: SessionUser,
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    no: i64,
) -> Result<Template, Status> {
    let member = Member::find(pool, no).ok_or(Status::NotFound)?;
    let clubs = Club::list(pool, None).map_err(|e| query_failed("club list", e))?;
    let ranks = Rank::list(pool).map_err(|e| query_failed("rank list", e))?;

    let photos: Vec<Value> = PhotoKind::ALL
        .iter()
        .map(|kind| {
            json!({
                "kind": kind.as_str(),
                "thumb": images::thumb_url(config, *kind, no),
                "uploads": StoredPhoto::count(pool, *kind, no),
            })
        })
        .collect();

    // Member sessions never receive a private member's sub-records
    let hide = member.is_private && user.session.kind != SessionKind::User;
    let (spouse, business) = if hide {
        (Spouse::default(), Business::default())
    } else {
        (
            Member::spouse(pool, no).unwrap_or_default(),
            Member::business(pool, no).unwrap_or_default(),
        )
    };

    let context = json!({
        "page_title": member.member_name,
        "session": user.session,
        "member": member,
        "spouse": spouse,
        "business": business,
        "photos": photos,
        "clubs": clubs,
        "ranks": ranks,
    });
    Ok(Template::render("member/memberEdit", &context))
}

#[post("/member/new", data = "<form>")]
pub fn member_new(_staff: StaffUser, pool: &State<DbPool>, form: Form<MemberForm>) -> Result<Redirect, Status> {
    let member_no = Member::create(pool, &form).map_err(|e| query_failed("member insert", e))?;
    log::info!("member {} created in club {}", member_no, form.club_no);
    Ok(Redirect::to(format!("/member/{}", member_no)))
}

#[post("/member/<no>/update", data = "<form>")]
pub fn member_update(
    _staff: StaffUser,
    pool: &State<DbPool>,
    no: i64,
    form: Form<HashMap<String, String>>,
) -> Result<Redirect, Status> {
    Member::update(pool, no, &form).map_err(|e| query_failed("member update", e))?;
    Ok(Redirect::to(format!("/member/{}", no)))
}

#[post("/member/<no>/delete")]
pub fn member_delete(_staff: StaffUser, pool: &State<DbPool>, no: i64) -> Result<Redirect, Status> {
    let club_no = Member::find(pool, no).map(|m| m.club_no);
    Member::archive(pool, no).map_err(|e| query_failed("member archive", e))?;
    log::info!("member {} archived", no);
    Ok(match club_no {
        Some(c) => Redirect::to(format!("/memberList?club_no={}", c)),
        None => Redirect::to("/memberList"),
    })
}

#[post("/member/<no>/spouse", data = "<form>")]
pub fn member_spouse(
    _staff: StaffUser,
    pool: &State<DbPool>,
    no: i64,
    form: Form<Spouse>,
) -> Result<Redirect, Status> {
    Member::save_spouse(pool, no, &form).map_err(|e| query_failed("spouse upsert", e))?;
    Ok(Redirect::to(format!("/member/{}", no)))
}

#[post("/member/<no>/business", data = "<form>")]
pub fn member_business(
    _staff: StaffUser,
    pool: &State<DbPool>,
    no: i64,
    form: Form<Business>,
) -> Result<Redirect, Status> {
    Member::save_business(pool, no, &form).map_err(|e| query_failed("business upsert", e))?;
    Ok(Redirect::to(format!("/member/{}", no)))
}

/// Set the password a member signs in with through `/mlogin`.
#[post("/member/<no>/password", data = "<form>")]
pub fn member_password(
    _staff: StaffUser,
    pool: &State<DbPool>,
    no: i64,
    form: Form<MemberPasswordForm>,
) -> Result<Redirect, Status> {
    if form.password.len() < 4 {
        return Err(Status::BadRequest);
    }
    let hash = auth::hash_password(&form.password).map_err(|e| query_failed("password hash", e))?;
    Member::set_password(pool, no, &hash).map_err(|e| query_failed("member password", e))?;
    Ok(Redirect::to(format!("/member/{}", no)))
}

// ── Photos ──

async fn read_upload(file: &TempFile<'_>) -> std::io::Result<Vec<u8>> {
    let reader = file.open().await?;
    rocket::tokio::pin!(reader);
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).await?;
    Ok(bytes)
}

/// Anything that goes wrong after the content-type check is logged and the
/// browser is sent back to the member page.
#[post("/member/<no>/photo/<kind>", data = "<upload>")]
pub async fn photo_upload(
    _staff: StaffUser,
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    no: i64,
    kind: &str,
    upload: Form<PhotoUpload<'_>>,
) -> Result<Redirect, Status> {
    let kind = PhotoKind::parse(kind).ok_or(Status::NotFound)?;
    if Member::find(pool, no).is_none() {
        log::warn!("{} upload for unknown member {}", kind.as_str(), no);
        return Err(Status::NotFound);
    }
    let declared = upload.file.content_type().map(|ct| ct.to_string());
    if !images::is_image_mime(declared.as_deref()) {
        log::warn!("rejected {} upload for member {}: {:?}", kind.as_str(), no, declared);
        return Err(Status::BadRequest);
    }
    let back = Redirect::to(format!("/member/{}", no));

    let bytes = match read_upload(&upload.file).await {
        Ok(b) => b,
        Err(e) => {
            log::error!("reading {} upload for member {} failed: {}", kind.as_str(), no, e);
            return Ok(back);
        }
    };

    // Decoding and re-encoding is CPU bound; keep it off the async workers
    let mime = declared.unwrap_or_default();
    let pool = pool.inner().clone();
    let thumb_dir = config.thumb_dir.clone();
    let outcome = task::spawn_blocking(move || {
        images::process_member_upload(&pool, &thumb_dir, kind, no, &bytes, &mime)
    })
    .await;

    match outcome {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => log::error!("{} upload for member {} failed: {}", kind.as_str(), no, e),
        Err(e) => log::error!("{} upload task for member {} did not finish: {}", kind.as_str(), no, e),
    }
    Ok(back)
}

#[get("/member/<no>/photo/<kind>")]
pub fn photo_serve(
    _user: SessionUser,
    pool: &State<DbPool>,
    no: i64,
    kind: &str,
) -> Result<(ContentType, Vec<u8>), Status> {
    let kind = PhotoKind::parse(kind).ok_or(Status::NotFound)?;
    let photo = StoredPhoto::latest(pool, kind, no).ok_or(Status::NotFound)?;
    let content_type = ContentType::parse_flexible(&photo.mime).unwrap_or(ContentType::Binary);
    Ok((content_type, photo.bytes))
}
