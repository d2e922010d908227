use rocket::http::Status;
use rocket::response::Redirect;
use rocket::State;
use rocket_dyn_templates::Template;
use serde_json::json;

use super::query_failed;
use crate::auth::StaffUser;
use crate::db::DbPool;
use crate::models::request::RequestMessage;

/// Messages sent from the mobile client, open ones first.
#[get("/requests")]
pub fn request_list(staff: StaffUser, pool: &State<DbPool>) -> Result<Template, Status> {
    let open = RequestMessage::list(pool, false).map_err(|e| query_failed("open requests", e))?;
    let archived = RequestMessage::list(pool, true).map_err(|e| query_failed("archived requests", e))?;

    let context = json!({
        "page_title": "Requests",
        "session": staff.session,
        "open": open,
        "archived": archived,
    });
    Ok(Template::render("admin/requests", &context))
}

#[post("/request/<id>/archive")]
pub fn request_archive(_staff: StaffUser, pool: &State<DbPool>, id: i64) -> Result<Redirect, Status> {
    RequestMessage::archive(pool, id).map_err(|e| query_failed("request archive", e))?;
    Ok(Redirect::to("/requests"))
}
