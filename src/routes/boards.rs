use rocket::form::Form;
use rocket::http::Status;
use rocket::response::Redirect;
use rocket::State;
use rocket_dyn_templates::Template;
use serde_json::json;

use super::query_failed;
use crate::auth::{SessionUser, StaffUser};
use crate::db::DbPool;
use crate::models::board::{Board, BoardForm, BoardMessage, MessageForm};
use crate::models::club::Club;
use crate::models::region::Region;

#[get("/boardManager")]
pub fn board_manager(user: SessionUser, pool: &State<DbPool>) -> Result<Template, Status> {
    let boards = Board::list(pool).map_err(|e| query_failed("board list", e))?;
    let clubs = Club::list(pool, None).map_err(|e| query_failed("club list", e))?;
    let regions = Region::list(pool).map_err(|e| query_failed("region list", e))?;

    let context = json!({
        "page_title": "Boards",
        "session": user.session,
        "boards": boards,
        "clubs": clubs,
        "regions": regions,
    });
    Ok(Template::render("board/boardMain", &context))
}

#[get("/board/<no>")]
pub fn board_view(user: SessionUser, pool: &State<DbPool>, no: i64) -> Result<Template, Status> {
    let board = Board::find(pool, no).ok_or(Status::NotFound)?;
    let messages = BoardMessage::list_for_board(pool, no).map_err(|e| query_failed("board messages", e))?;

    let context = json!({
        "page_title": board.title,
        "session": user.session,
        "board": board,
        "messages": messages,
    });
    Ok(Template::render("board/boardView", &context))
}

#[post("/board/new", data = "<form>")]
pub fn board_new(_staff: StaffUser, pool: &State<DbPool>, form: Form<BoardForm>) -> Result<Redirect, Status> {
    if form.title.trim().is_empty() {
        return Err(Status::BadRequest);
    }
    let board_no = Board::create(pool, &form).map_err(|e| query_failed("board insert", e))?;
    Ok(Redirect::to(format!("/board/{}", board_no)))
}

#[post("/board/<no>/message", data = "<form>")]
pub fn message_new(
    staff: StaffUser,
    pool: &State<DbPool>,
    no: i64,
    form: Form<MessageForm>,
) -> Result<Redirect, Status> {
    Board::find(pool, no).ok_or(Status::NotFound)?;
    BoardMessage::create(pool, no, &form, &staff.session.user_name)
        .map_err(|e| query_failed("message insert", e))?;
    Ok(Redirect::to(format!("/board/{}", no)))
}

#[post("/board/message/<id>/delete")]
pub fn message_delete(_staff: StaffUser, pool: &State<DbPool>, id: i64) -> Result<Redirect, Status> {
    let message = BoardMessage::find(pool, id).ok_or(Status::NotFound)?;
    BoardMessage::archive(pool, id).map_err(|e| query_failed("message archive", e))?;
    Ok(Redirect::to(format!("/board/{}", message.board_no)))
}
