use std::fmt::Display;

use rocket::http::Status;
use rocket::Route;

pub mod boards;
pub mod clubs;
pub mod login;
pub mod members;
pub mod phapp;
pub mod ranks;
pub mod regions;
pub mod requests;

/// Browser surface, mounted at `/`.
pub fn routes() -> Vec<Route> {
    routes![
        login::index,
        login::login_submit,
        login::member_login_submit,
        login::logout,
        login::success,
        login::user_home,
        login::user_edit_page,
        login::user_edit_submit,
        clubs::club_list,
        clubs::club_detail,
        clubs::club_new,
        clubs::club_update,
        clubs::club_delete,
        clubs::club_staff,
        clubs::club_doc,
        clubs::club_slogan,
        clubs::dict_list,
        members::member_list,
        members::member_detail,
        members::member_new,
        members::member_update,
        members::member_delete,
        members::member_spouse,
        members::member_business,
        members::member_password,
        members::photo_upload,
        members::photo_serve,
        ranks::rank_list,
        ranks::rank_new,
        ranks::rank_update,
        ranks::rank_delete,
        regions::region_list,
        regions::region_new,
        regions::region_update,
        regions::region_detail,
        boards::board_manager,
        boards::board_view,
        boards::board_new,
        boards::message_new,
        boards::message_delete,
        requests::request_list,
        requests::request_archive,
    ]
}

/// Mobile JSON surface, mounted at `/phapp`.
pub fn phapp_routes() -> Vec<Route> {
    routes![
        phapp::clubs,
        phapp::club,
        phapp::club_members,
        phapp::member,
        phapp::ranks,
        phapp::regions,
        phapp::board,
        phapp::login,
        phapp::request,
        phapp::slogan_image,
    ]
}

/// Log a failed query under a short label and answer 500.
pub(crate) fn query_failed(label: &str, e: impl Display) -> Status {
    log::error!("{} failed: {}", label, e);
    Status::InternalServerError
}
