pub mod board;
pub mod club;
pub mod document;
pub mod member;
pub mod photo;
pub mod rank;
pub mod region;
pub mod request;
pub mod staff;
pub mod user;
