use std::collections::HashMap;

use rocket::form::Form;
use rocket::http::Status;
use rocket::response::Redirect;
use rocket::State;
use rocket_dyn_templates::Template;
use serde_json::{json, Value};

use super::query_failed;
use crate::auth::{SessionUser, StaffUser};
use crate::db::DbPool;
use crate::models::region::{Region, RegionDetail, RegionDetailForm};

#[derive(Debug, FromForm)]
pub struct RegionNewForm {
    pub region_name: String,
}

#[get("/regionList")]
pub fn region_list(user: SessionUser, pool: &State<DbPool>) -> Result<Template, Status> {
    let regions = Region::list(pool).map_err(|e| query_failed("region list", e))?;
    let rows: Vec<Value> = regions
        .iter()
        .map(|r| {
            json!({
                "region": r,
                "detail": RegionDetail::current(pool, r.region_no),
            })
        })
        .collect();

    let context = json!({
        "page_title": "Regions",
        "session": user.session,
        "regions": rows,
    });
    Ok(Template::render("admin/regionList", &context))
}

#[post("/region/new", data = "<form>")]
pub fn region_new(_staff: StaffUser, pool: &State<DbPool>, form: Form<RegionNewForm>) -> Result<Redirect, Status> {
    let name = form.region_name.trim();
    if name.is_empty() {
        return Err(Status::BadRequest);
    }
    Region::create(pool, name).map_err(|e| query_failed("region insert", e))?;
    Ok(Redirect::to("/regionList"))
}

#[post("/region/<no>/update", data = "<form>")]
pub fn region_update(
    _staff: StaffUser,
    pool: &State<DbPool>,
    no: i64,
    form: Form<HashMap<String, String>>,
) -> Result<Redirect, Status> {
    Region::update(pool, no, &form).map_err(|e| query_failed("region update", e))?;
    Ok(Redirect::to("/regionList"))
}

#[post("/region/<no>/detail", data = "<form>")]
pub fn region_detail(
    _staff: StaffUser,
    pool: &State<DbPool>,
    no: i64,
    form: Form<RegionDetailForm>,
) -> Result<Redirect, Status> {
    Region::find(pool, no).ok_or(Status::NotFound)?;
    RegionDetail::replace(pool, no, &form).map_err(|e| query_failed("region detail replace", e))?;
    Ok(Redirect::to("/regionList"))
}
