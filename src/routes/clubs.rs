use std::collections::HashMap;

use rocket::form::Form;
use rocket::http::{ContentType, Status};
use rocket::response::Redirect;
use rocket::State;
use rocket_dyn_templates::Template;
use serde_json::{json, Value};

use super::query_failed;
use crate::auth::{SessionUser, StaffUser};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::images;
use crate::models::club::{Club, ClubForm};
use crate::models::document::{ClubDocument, DocumentForm};
use crate::models::member::Member;
use crate::models::photo::PhotoKind;
use crate::models::region::Region;
use crate::models::staff::{ClubStaff, StaffForm};
use crate::slogan;

#[get("/clubList?<region_no>")]
pub fn club_list(
    user: SessionUser,
    pool: &State<DbPool>,
    region_no: Option<i64>,
) -> Result<Template, Status> {
    let clubs = Club::list(pool, region_no).map_err(|e| query_failed("club list", e))?;
    let regions = Region::list(pool).map_err(|e| query_failed("region list", e))?;

    let context = json!({
        "page_title": "Clubs",
        "session": user.session,
        "clubs": clubs,
        "regions": regions,
        "region_filter": region_no,
    });
    Ok(Template::render("admin/clubList", &context))
}

#[get("/club/<no>")]
pub fn club_detail(
    user: SessionUser,
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    no: i64,
) -> Result<Template, Status> {
    let club = Club::find(pool, no).ok_or(Status::NotFound)?;
    let members = Member::list_by_club(pool, no).map_err(|e| query_failed("club members", e))?;
    let history = ClubStaff::history(pool, no).map_err(|e| query_failed("staff history", e))?;
    let regions = Region::list(pool).map_err(|e| query_failed("region list", e))?;

    let members: Vec<Value> = members
        .iter()
        .map(|m| m.summary_json(&images::thumb_url(config, PhotoKind::Portrait, m.member_no)))
        .collect();

    let context = json!({
        "page_title": club.club_name,
        "session": user.session,
        "club": club,
        "staff": ClubStaff::current(pool, no),
        "staff_history": history,
        "document": ClubDocument::current(pool, no),
        "members": members,
        "regions": regions,
    });
    Ok(Template::render("admin/clubDetail", &context))
}

#[post("/club/new", data = "<form>")]
pub fn club_new(_staff: StaffUser, pool: &State<DbPool>, form: Form<ClubForm>) -> Result<Redirect, Status> {
    let club_no = Club::create(pool, &form).map_err(|e| query_failed("club insert", e))?;
    log::info!("club {} created: {}", club_no, form.club_name);
    Ok(Redirect::to(format!("/club/{}", club_no)))
}

#[post("/club/<no>/update", data = "<form>")]
pub fn club_update(
    _staff: StaffUser,
    pool: &State<DbPool>,
    no: i64,
    form: Form<HashMap<String, String>>,
) -> Result<Redirect, Status> {
    Club::update(pool, no, &form).map_err(|e| query_failed("club update", e))?;
    Ok(Redirect::to(format!("/club/{}", no)))
}

#[post("/club/<no>/delete")]
pub fn club_delete(_staff: StaffUser, pool: &State<DbPool>, no: i64) -> Result<Redirect, Status> {
    Club::archive(pool, no).map_err(|e| query_failed("club archive", e))?;
    log::info!("club {} archived", no);
    Ok(Redirect::to("/clubList"))
}

#[post("/club/<no>/staff", data = "<form>")]
pub fn club_staff(
    _staff: StaffUser,
    pool: &State<DbPool>,
    no: i64,
    form: Form<StaffForm>,
) -> Result<Redirect, Status> {
    ClubStaff::replace(pool, no, &form).map_err(|e| query_failed("staff replace", e))?;
    Ok(Redirect::to(format!("/club/{}", no)))
}

#[post("/club/<no>/doc", data = "<form>")]
pub fn club_doc(
    _staff: StaffUser,
    pool: &State<DbPool>,
    no: i64,
    form: Form<DocumentForm>,
) -> Result<Redirect, Status> {
    ClubDocument::replace(pool, no, &form).map_err(|e| query_failed("document replace", e))?;
    Ok(Redirect::to(format!("/club/{}", no)))
}

/// Always re-rendered; refreshes the cached card as a side effect.
#[get("/club/<no>/slogan.png")]
pub fn club_slogan(
    _user: SessionUser,
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    no: i64,
) -> Result<(ContentType, Vec<u8>), Redirect> {
    match slogan::render_and_cache(pool, config, no) {
        Ok(png) => Ok((ContentType::PNG, png)),
        Err(e) => {
            log::error!("slogan render for club {} failed: {}", no, e);
            Err(Redirect::to(format!("/club/{}", no)))
        }
    }
}

/// Directory of clubs grouped by region.
#[get("/dictList")]
pub fn dict_list(user: SessionUser, pool: &State<DbPool>) -> Result<Template, Status> {
    let regions = Region::list(pool).map_err(|e| query_failed("region list", e))?;
    let clubs = Club::list(pool, None).map_err(|e| query_failed("club list", e))?;

    let mut groups: Vec<Value> = regions
        .iter()
        .map(|r| {
            let in_region: Vec<&Club> = clubs
                .iter()
                .filter(|c| c.region_no == Some(r.region_no))
                .collect();
            json!({ "region": r, "clubs": in_region })
        })
        .collect();

    let unassigned: Vec<&Club> = clubs
        .iter()
        .filter(|c| match c.region_no {
            Some(rn) => !regions.iter().any(|r| r.region_no == rn),
            None => true,
        })
        .collect();
    if !unassigned.is_empty() {
        groups.push(json!({ "region": null, "clubs": unassigned }));
    }

    let context = json!({
        "page_title": "Directory",
        "session": user.session,
        "groups": groups,
    });
    Ok(Template::render("admin/dictList", &context))
}
