use std::collections::HashMap;

use rocket::form::Form;
use rocket::http::Status;
use rocket::response::Redirect;
use rocket::State;
use rocket_dyn_templates::Template;
use serde_json::json;

use super::query_failed;
use crate::auth::{SessionUser, StaffUser};
use crate::db::DbPool;
use crate::models::rank::{Rank, RankForm};

#[get("/rankList")]
pub fn rank_list(user: SessionUser, pool: &State<DbPool>) -> Result<Template, Status> {
    let ranks = Rank::list(pool).map_err(|e| query_failed("rank list", e))?;
    let context = json!({
        "page_title": "Ranks",
        "session": user.session,
        "ranks": ranks,
    });
    Ok(Template::render("admin/rankList", &context))
}

#[post("/rank/new", data = "<form>")]
pub fn rank_new(_staff: StaffUser, pool: &State<DbPool>, form: Form<RankForm>) -> Result<Redirect, Status> {
    Rank::create(pool, &form).map_err(|e| query_failed("rank insert", e))?;
    Ok(Redirect::to("/rankList"))
}

#[post("/rank/<no>/update", data = "<form>")]
pub fn rank_update(
    _staff: StaffUser,
    pool: &State<DbPool>,
    no: i64,
    form: Form<HashMap<String, String>>,
) -> Result<Redirect, Status> {
    Rank::update(pool, no, &form).map_err(|e| query_failed("rank update", e))?;
    Ok(Redirect::to("/rankList"))
}

#[post("/rank/<no>/delete")]
pub fn rank_delete(_staff: StaffUser, pool: &State<DbPool>, no: i64) -> Result<Redirect, Status> {
    Rank::archive(pool, no).map_err(|e| query_failed("rank archive", e))?;
    Ok(Redirect::to("/rankList"))
}
