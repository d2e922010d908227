#![cfg(test)]

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rocket::http::{ContentType, Status};
use rocket::local::blocking::Client;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::auth::{self, Session, SessionKind};
use crate::config::AppConfig;
use crate::db::{run_migrations, seed_defaults, DbPool};
use crate::images::{self, PHOTO_BYTE_BUDGET, THUMB_HEIGHT, THUMB_WIDTH};
use crate::models::board::{Board, BoardForm, BoardMessage, MessageForm};
use crate::models::club::{Club, ClubForm};
use crate::models::document::{ClubDocument, DocumentForm};
use crate::models::member::{Business, Member, MemberForm, Spouse, HIDDEN};
use crate::models::photo::{PhotoKind, StoredPhoto};
use crate::models::rank::{Rank, RankForm};
use crate::models::region::{Region, RegionDetail, RegionDetailForm};
use crate::models::request::{RequestForm, RequestMessage};
use crate::models::staff::{ClubStaff, StaffForm};
use crate::models::user::User;
use crate::slogan;

/// Atomic counter for unique shared-cache DB names so parallel tests don't collide.
static TEST_DB_COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

/// Create a fresh in-memory SQLite pool with all migrations + seed defaults applied.
/// Uses a named shared-cache in-memory DB so multiple connections see the same data.
/// Pre-inserts the admin account with a fast bcrypt hash so seed_defaults skips
/// the DEFAULT_COST hash (which is slow in debug builds).
fn test_pool() -> DbPool {
    let id = TEST_DB_COUNTER.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    let uri = format!("file:testdb_{}?mode=memory&cache=shared", id);
    let manager = SqliteConnectionManager::file(uri)
        .with_init(|c| c.execute_batch("PRAGMA foreign_keys=ON;"));
    let pool = Pool::builder()
        .max_size(2)
        .build(manager)
        .expect("Failed to create test pool");
    run_migrations(&pool).expect("Failed to run migrations");
    {
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO users (user_id, user_name, user_password, user_role)
             VALUES ('admin', 'Administrator', ?1, 'admin')",
            rusqlite::params![fast_hash("admin")],
        )
        .unwrap();
    }
    seed_defaults(&pool, "admin").expect("Failed to seed defaults");
    pool
}

/// Fast bcrypt hash for tests (cost=4 instead of DEFAULT_COST=12).
fn fast_hash(password: &str) -> String {
    bcrypt::hash(password, 4).unwrap()
}

fn scratch_dir(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("lions_{}_{}", tag, uuid::Uuid::new_v4()))
}

fn test_config(tag: &str) -> AppConfig {
    let root = scratch_dir(tag);
    AppConfig {
        thumb_dir: root.join("thumbs").to_string_lossy().to_string(),
        cache_dir: root.join("cache").to_string_lossy().to_string(),
        font_path: root.join("missing.ttf").to_string_lossy().to_string(),
        ..AppConfig::default()
    }
}

fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn make_club(pool: &DbPool, name: &str, region_no: Option<i64>) -> i64 {
    Club::create(
        pool,
        &ClubForm {
            club_name: name.to_string(),
            region_no,
            charter_date: "1998-05-01".to_string(),
            phone: "02-123-4567".to_string(),
            address: "Seoul".to_string(),
            slogan: "We Serve".to_string(),
        },
    )
    .unwrap()
}

fn make_member(pool: &DbPool, club_no: i64, name: &str, rank_no: Option<i64>, private: bool) -> i64 {
    Member::create(
        pool,
        &MemberForm {
            club_no,
            rank_no,
            member_name: name.to_string(),
            phone: "010-1111-2222".to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            address: "12 Jongno-gu".to_string(),
            birth: "1970-03-15".to_string(),
            join_date: "2001-07-01".to_string(),
            is_private: private,
        },
    )
    .unwrap()
}

fn rank_no(pool: &DbPool, title: &str) -> i64 {
    Rank::list(pool)
        .unwrap()
        .into_iter()
        .find(|r| r.rank_title == title)
        .map(|r| r.rank_no)
        .unwrap()
}

// ═══════════════════════════════════════════════════════════
// Seed
// ═══════════════════════════════════════════════════════════

#[test]
fn seed_creates_ranks_and_admin() {
    let pool = test_pool();
    let ranks = Rank::list(&pool).unwrap();
    assert_eq!(ranks.len(), 7);
    assert_eq!(ranks[0].rank_title, "President");
    assert_eq!(ranks.last().unwrap().rank_title, "Member");

    let admin = User::get_by_login(&pool, "admin").unwrap();
    assert!(admin.is_admin());
    assert!(auth::verify_password("admin", &admin.user_password));
}

#[test]
fn seed_is_idempotent() {
    let pool = test_pool();
    seed_defaults(&pool, "other").unwrap();
    assert_eq!(Rank::list(&pool).unwrap().len(), 7);
    assert_eq!(User::list_all(&pool).unwrap().len(), 1);
}

// ═══════════════════════════════════════════════════════════
// Users & sessions
// ═══════════════════════════════════════════════════════════

#[test]
fn user_create_and_lookup() {
    let pool = test_pool();
    let no = User::create(&pool, "kim", &fast_hash("secret12"), "Kim", "staff", None).unwrap();

    let user = User::get_by_no(&pool, no).unwrap();
    assert_eq!(user.user_id, "kim");
    assert!(!user.is_admin());
    assert!(User::get_by_login(&pool, "nobody").is_none());

    let safe = user.safe_json();
    assert!(safe.get("user_password").is_none());
}

#[test]
fn user_password_change() {
    let pool = test_pool();
    let no = User::create(&pool, "lee", &fast_hash("old-pass"), "Lee", "staff", None).unwrap();
    User::update_password(&pool, no, &fast_hash("new-pass")).unwrap();

    let user = User::get_by_no(&pool, no).unwrap();
    assert!(auth::verify_password("new-pass", &user.user_password));
    assert!(!auth::verify_password("old-pass", &user.user_password));
}

fn staff_session(user_no: i64, name: &str) -> Session {
    Session {
        user_no,
        user_name: name.to_string(),
        user_role: "staff".to_string(),
        kind: SessionKind::User,
    }
}

#[test]
fn session_create_get_destroy() {
    let pool = test_pool();
    let config = AppConfig::default();
    let no = User::create(&pool, "park", &fast_hash("pw123456"), "Park", "staff", None).unwrap();

    let sid = auth::create_session(&pool, &config, &staff_session(no, "Park"), Some("10.0.0.1")).unwrap();
    let session = auth::get_session(&pool, &sid).unwrap();
    assert_eq!(session.user_no, no);
    assert_eq!(session.kind, SessionKind::User);
    assert!(!session.is_admin());

    auth::destroy_session(&pool, &sid).unwrap();
    assert!(auth::get_session(&pool, &sid).is_none());
}

#[test]
fn session_stores_hashed_ip() {
    let pool = test_pool();
    let sid = auth::create_session(&pool, &AppConfig::default(), &staff_session(1, "Administrator"), Some("192.168.1.9")).unwrap();

    let conn = pool.get().unwrap();
    let stored: String = conn
        .query_row("SELECT ip_address FROM sessions WHERE id = ?1", rusqlite::params![sid], |r| r.get(0))
        .unwrap();
    assert_ne!(stored, "192.168.1.9");
    assert_eq!(stored, auth::hash_ip("192.168.1.9"));
}

#[test]
fn member_session_kind_round_trips() {
    let pool = test_pool();
    let club = make_club(&pool, "Busan", None);
    let member = make_member(&pool, club, "Choi", None, false);
    let session = Session {
        user_no: member,
        user_name: "Choi".to_string(),
        user_role: "member".to_string(),
        kind: SessionKind::Member,
    };
    let sid = auth::create_session(&pool, &AppConfig::default(), &session, None).unwrap();
    let back = auth::get_session(&pool, &sid).unwrap();
    assert_eq!(back.kind, SessionKind::Member);
    assert!(!back.is_admin());
}

#[test]
fn expired_sessions_are_invisible_and_purged() {
    let pool = test_pool();
    {
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO sessions (id, user_no, user_name, user_role, kind, created_at, expires_at)
             VALUES ('old', 1, 'Administrator', 'admin', 'user', '2020-01-01 00:00:00', '2020-01-02 00:00:00')",
            [],
        )
        .unwrap();
    }
    let live = auth::create_session(&pool, &AppConfig::default(), &staff_session(1, "Administrator"), None).unwrap();

    assert!(auth::get_session(&pool, "old").is_none());
    assert_eq!(auth::cleanup_expired_sessions(&pool).unwrap(), 1);
    assert!(auth::get_session(&pool, &live).is_some());
}

#[test]
fn renaming_user_updates_open_sessions() {
    let pool = test_pool();
    let no = User::create(&pool, "jung", &fast_hash("pw123456"), "Jung", "staff", None).unwrap();
    let sid = auth::create_session(&pool, &AppConfig::default(), &staff_session(no, "Jung"), None).unwrap();

    User::update_name(&pool, no, "Jung Minho").unwrap();
    assert_eq!(User::get_by_no(&pool, no).unwrap().user_name, "Jung Minho");
    assert_eq!(auth::get_session(&pool, &sid).unwrap().user_name, "Jung Minho");
}

// ═══════════════════════════════════════════════════════════
// Regions
// ═══════════════════════════════════════════════════════════

#[test]
fn region_crud_and_club_count() {
    let pool = test_pool();
    let region = Region::create(&pool, "District 354-A").unwrap();
    make_club(&pool, "Gangnam", Some(region));
    make_club(&pool, "Mapo", Some(region));
    make_club(&pool, "Loose", None);

    let found = Region::find(&pool, region).unwrap();
    assert_eq!(found.club_count, 2);

    Region::update(&pool, region, &fields(&[("region_name", "District 354-B")])).unwrap();
    assert_eq!(Region::find(&pool, region).unwrap().region_name, "District 354-B");

    // Blank name leaves the row alone
    assert_eq!(Region::update(&pool, region, &fields(&[("region_name", "  ")])).unwrap(), 0);
    assert_eq!(Region::list(&pool).unwrap()[0].region_name, "District 354-B");
}

#[test]
fn region_detail_history_keeps_one_live_row() {
    let pool = test_pool();
    let region = Region::create(&pool, "District 355").unwrap();
    assert!(RegionDetail::current(&pool, region).is_none());

    for i in 1..=3 {
        RegionDetail::replace(
            &pool,
            region,
            &RegionDetailForm {
                chairman: format!("Chair {}", i),
                slogan: "Unity".to_string(),
                detail: format!("Revision {}", i),
            },
        )
        .unwrap();
    }

    let current = RegionDetail::current(&pool, region).unwrap();
    assert_eq!(current.chairman, "Chair 3");

    let conn = pool.get().unwrap();
    let live: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM region_details WHERE region_no = ?1 AND attrib NOT LIKE '%XXXUP%'",
            rusqlite::params![region],
            |r| r.get(0),
        )
        .unwrap();
    let total: i64 = conn
        .query_row("SELECT COUNT(*) FROM region_details", [], |r| r.get(0))
        .unwrap();
    assert_eq!(live, 1);
    assert_eq!(total, 3);
}

// ═══════════════════════════════════════════════════════════
// Clubs
// ═══════════════════════════════════════════════════════════

#[test]
fn club_crud() {
    let pool = test_pool();
    let region = Region::create(&pool, "District 356").unwrap();
    let no = make_club(&pool, "Daegu Central", Some(region));

    let club = Club::find(&pool, no).unwrap();
    assert_eq!(club.club_name, "Daegu Central");
    assert_eq!(club.region_name.as_deref(), Some("District 356"));

    Club::archive(&pool, no).unwrap();
    assert!(Club::find(&pool, no).is_none());
    assert!(Club::list(&pool, None).unwrap().is_empty());
}

#[test]
fn club_list_filters_by_region() {
    let pool = test_pool();
    let a = Region::create(&pool, "A").unwrap();
    let b = Region::create(&pool, "B").unwrap();
    make_club(&pool, "One", Some(a));
    make_club(&pool, "Two", Some(b));
    make_club(&pool, "Three", Some(b));

    assert_eq!(Club::list(&pool, None).unwrap().len(), 3);
    assert_eq!(Club::list(&pool, Some(a)).unwrap().len(), 1);
    let in_b: Vec<String> = Club::list(&pool, Some(b)).unwrap().into_iter().map(|c| c.club_name).collect();
    assert_eq!(in_b, vec!["Three".to_string(), "Two".to_string()]);
}

#[test]
fn club_partial_update_touches_only_present_fields() {
    let pool = test_pool();
    let no = make_club(&pool, "Incheon", None);

    let touched = Club::update(
        &pool,
        no,
        &fields(&[("phone", "032-999-0000"), ("address", ""), ("slogan", "   ")]),
    )
    .unwrap();
    assert_eq!(touched, 1);

    let club = Club::find(&pool, no).unwrap();
    assert_eq!(club.phone, "032-999-0000");
    assert_eq!(club.address, "Seoul");
    assert_eq!(club.slogan, "We Serve");
    assert_eq!(club.club_name, "Incheon");
}

#[test]
fn club_partial_update_every_subset() {
    let pool = test_pool();
    let no = make_club(&pool, "Base", None);
    let keys = ["club_name", "charter_date", "phone", "address", "slogan"];

    for mask in 0u32..(1 << keys.len()) {
        let before = Club::find(&pool, no).unwrap();
        let payload: HashMap<String, String> = keys
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, k)| (k.to_string(), format!("{}-{}", k, mask)))
            .collect();

        Club::update(&pool, no, &payload).unwrap();
        let after = Club::find(&pool, no).unwrap();

        let pick = |c: &Club, k: &str| -> String {
            match k {
                "club_name" => c.club_name.clone(),
                "charter_date" => c.charter_date.clone(),
                "phone" => c.phone.clone(),
                "address" => c.address.clone(),
                _ => c.slogan.clone(),
            }
        };
        for (i, k) in keys.iter().enumerate() {
            if mask & (1 << i) != 0 {
                assert_eq!(pick(&after, k), format!("{}-{}", k, mask));
            } else {
                assert_eq!(pick(&after, k), pick(&before, k));
            }
        }
    }
}

#[test]
fn club_update_ignores_unknown_fields() {
    let pool = test_pool();
    let no = make_club(&pool, "Ulsan", None);
    let touched = Club::update(&pool, no, &fields(&[("attrib", "XXXUP"), ("club_no", "99")])).unwrap();
    assert_eq!(touched, 0);
    assert!(Club::find(&pool, no).is_some());
}

// ═══════════════════════════════════════════════════════════
// Ranks
// ═══════════════════════════════════════════════════════════

#[test]
fn rank_create_update_archive() {
    let pool = test_pool();
    let no = Rank::create(
        &pool,
        &RankForm {
            rank_title: "Tail Twister".to_string(),
            order_no: 7,
        },
    )
    .unwrap();
    let titles: Vec<String> = Rank::list(&pool).unwrap().into_iter().map(|r| r.rank_title).collect();
    assert_eq!(titles[6], "Tail Twister");

    Rank::update(&pool, no, &fields(&[("order_no", "0")])).unwrap();
    assert_eq!(Rank::list(&pool).unwrap()[0].rank_title, "Tail Twister");
    assert_eq!(Rank::find(&pool, no).unwrap().order_no, 0);

    Rank::archive(&pool, no).unwrap();
    assert_eq!(Rank::list(&pool).unwrap().len(), 7);
    // Archived ranks still resolve for members that reference them
    assert!(Rank::find(&pool, no).is_some());
}

// ═══════════════════════════════════════════════════════════
// Members
// ═══════════════════════════════════════════════════════════

#[test]
fn member_crud() {
    let pool = test_pool();
    let club = make_club(&pool, "Suwon", None);
    let president = rank_no(&pool, "President");
    let no = make_member(&pool, club, "Kang", Some(president), false);

    let m = Member::find(&pool, no).unwrap();
    assert_eq!(m.club_name, "Suwon");
    assert_eq!(m.rank_title.as_deref(), Some("President"));
    assert!(!m.is_private);

    Member::archive(&pool, no).unwrap();
    assert!(Member::find(&pool, no).is_none());
    assert!(Member::list_by_club(&pool, club).unwrap().is_empty());
}

#[test]
fn member_list_orders_by_rank() {
    let pool = test_pool();
    let club = make_club(&pool, "Gwangju", None);
    make_member(&pool, club, "Alpha", Some(rank_no(&pool, "Member")), false);
    make_member(&pool, club, "Bravo", None, false);
    make_member(&pool, club, "Charlie", Some(rank_no(&pool, "President")), false);
    make_member(&pool, club, "Delta", Some(rank_no(&pool, "Secretary")), false);

    let names: Vec<String> = Member::list_by_club(&pool, club)
        .unwrap()
        .into_iter()
        .map(|m| m.member_name)
        .collect();
    assert_eq!(names, vec!["Charlie", "Delta", "Alpha", "Bravo"]);
}

#[test]
fn member_partial_update_and_privacy_flag() {
    let pool = test_pool();
    let club = make_club(&pool, "Jeju", None);
    let no = make_member(&pool, club, "Han", None, false);

    Member::update(&pool, no, &fields(&[("is_private", "on"), ("email", "")])).unwrap();
    let m = Member::find(&pool, no).unwrap();
    assert!(m.is_private);
    assert_eq!(m.email, "han@example.com");
    assert_eq!(m.phone, "010-1111-2222");

    Member::update(&pool, no, &fields(&[("is_private", "0"), ("phone", "010-9999-0000")])).unwrap();
    let m = Member::find(&pool, no).unwrap();
    assert!(!m.is_private);
    assert_eq!(m.phone, "010-9999-0000");
}

#[test]
fn member_find_by_name_within_club() {
    let pool = test_pool();
    let a = make_club(&pool, "A", None);
    let b = make_club(&pool, "B", None);
    let in_a = make_member(&pool, a, "Yoon", None, false);
    make_member(&pool, b, "Yoon", None, false);

    assert_eq!(Member::find_in_club_by_name(&pool, a, "Yoon").unwrap().member_no, in_a);
    assert!(Member::find_in_club_by_name(&pool, a, "Nobody").is_none());
}

#[test]
fn member_sub_records_upsert() {
    let pool = test_pool();
    let club = make_club(&pool, "Pohang", None);
    let no = make_member(&pool, club, "Seo", None, false);
    assert!(Member::spouse(&pool, no).is_none());

    let mut spouse = Spouse {
        spouse_name: "Lim".to_string(),
        spouse_phone: "010-2222-3333".to_string(),
        spouse_birth: "1972-01-01".to_string(),
    };
    Member::save_spouse(&pool, no, &spouse).unwrap();
    spouse.spouse_phone = "010-4444-5555".to_string();
    Member::save_spouse(&pool, no, &spouse).unwrap();
    assert_eq!(Member::spouse(&pool, no).unwrap().spouse_phone, "010-4444-5555");

    let business = Business {
        company: "Seo Trading".to_string(),
        title: "CEO".to_string(),
        business_phone: "054-000-1111".to_string(),
        business_address: "Pohang port".to_string(),
    };
    Member::save_business(&pool, no, &business).unwrap();
    assert_eq!(Member::business(&pool, no).unwrap().company, "Seo Trading");

    let conn = pool.get().unwrap();
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM member_spouses WHERE member_no = ?1", rusqlite::params![no], |r| r.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn member_login_candidates_need_password() {
    let pool = test_pool();
    let club = make_club(&pool, "Cheongju", None);
    let with_pw = make_member(&pool, club, "Oh", None, false);
    make_member(&pool, club, "Oh", None, false);

    assert!(Member::login_candidates(&pool, "Oh").is_empty());

    Member::set_password(&pool, with_pw, &fast_hash("1234")).unwrap();
    let candidates = Member::login_candidates(&pool, "Oh");
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].0, with_pw);
    assert!(auth::verify_password("1234", &candidates[0].2));

    let found = crate::routes::login::authenticate_member(&pool, " Oh ", "1234");
    assert_eq!(found, Some((with_pw, "Oh".to_string())));
    assert!(crate::routes::login::authenticate_member(&pool, "Oh", "wrong").is_none());
}

// ═══════════════════════════════════════════════════════════
// Privacy
// ═══════════════════════════════════════════════════════════

fn private_member_fixture(pool: &DbPool, private: bool) -> (Member, Spouse, Business) {
    let club = make_club(pool, "Private Club", None);
    let no = make_member(pool, club, "Baek", None, private);
    let spouse = Spouse {
        spouse_name: "Shin Yuna".to_string(),
        spouse_phone: "010-7777-8888".to_string(),
        spouse_birth: "1975-09-09".to_string(),
    };
    let business = Business {
        company: "Baek Steel".to_string(),
        title: "Director".to_string(),
        business_phone: "02-555-6666".to_string(),
        business_address: "Guro industrial park".to_string(),
    };
    Member::save_spouse(pool, no, &spouse).unwrap();
    Member::save_business(pool, no, &business).unwrap();
    (Member::find(pool, no).unwrap(), spouse, business)
}

#[test]
fn private_member_json_never_leaks_protected_values() {
    let pool = test_pool();
    let (member, spouse, business) = private_member_fixture(&pool, true);

    let json = member.detail_json(Some(&spouse), Some(&business));
    let text = json.to_string();

    for secret in [
        member.phone.as_str(),
        member.email.as_str(),
        member.address.as_str(),
        member.birth.as_str(),
        spouse.spouse_name.as_str(),
        spouse.spouse_phone.as_str(),
        spouse.spouse_birth.as_str(),
        business.company.as_str(),
        business.title.as_str(),
        business.business_phone.as_str(),
        business.business_address.as_str(),
    ] {
        assert!(!text.contains(secret), "leaked {}", secret);
    }

    // Keys stay present, carrying the placeholder
    assert_eq!(json["phone"], HIDDEN);
    assert_eq!(json["email"], HIDDEN);
    assert_eq!(json["spouse"]["name"], HIDDEN);
    assert_eq!(json["business"]["phone"], HIDDEN);
    assert_eq!(json["business"]["company"], HIDDEN);
    assert_eq!(json["business"]["title"], HIDDEN);
    assert_eq!(json["memberName"], "Baek");
}

#[test]
fn public_member_json_shows_values() {
    let pool = test_pool();
    let (member, spouse, business) = private_member_fixture(&pool, false);

    let json = member.detail_json(Some(&spouse), Some(&business));
    assert_eq!(json["phone"], "010-1111-2222");
    assert_eq!(json["spouse"]["phone"], "010-7777-8888");
    assert_eq!(json["business"]["address"], "Guro industrial park");
    assert!(!json.to_string().contains(HIDDEN));
}

#[test]
fn private_member_without_sub_records_still_hides() {
    let pool = test_pool();
    let club = make_club(&pool, "Solo", None);
    let no = make_member(&pool, club, "Moon", None, true);
    let json = Member::find(&pool, no).unwrap().detail_json(None, None);
    assert_eq!(json["birth"], HIDDEN);
    assert_eq!(json["spouse"]["name"], HIDDEN);
}

// ═══════════════════════════════════════════════════════════
// Staff & documents
// ═══════════════════════════════════════════════════════════

fn staff_form(president: &str, secretary: &str, treasurer: &str, term: &str) -> StaffForm {
    StaffForm {
        president: president.to_string(),
        secretary: secretary.to_string(),
        treasurer: treasurer.to_string(),
        term_year: term.to_string(),
    }
}

#[test]
fn staff_replace_keeps_one_live_row() {
    let pool = test_pool();
    let club = make_club(&pool, "Wonju", None);
    assert!(ClubStaff::current(&pool, club).is_none());

    ClubStaff::replace(&pool, club, &staff_form("Kim", "Lee", "Park", "2023-2024")).unwrap();
    let second = ClubStaff::replace(&pool, club, &staff_form("Choi", "Jung", "Kang", "2024-2025")).unwrap();

    let current = ClubStaff::current(&pool, club).unwrap();
    assert_eq!(current.id, second);
    assert_eq!(current.president, "Choi");
    assert_eq!(ClubStaff::history(&pool, club).unwrap().len(), 2);

    let conn = pool.get().unwrap();
    let live: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM club_staff WHERE club_no = ?1 AND attrib NOT LIKE '%XXXUP%'",
            rusqlite::params![club],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(live, 1);
}

#[test]
fn staff_replace_is_scoped_to_club() {
    let pool = test_pool();
    let a = make_club(&pool, "A", None);
    let b = make_club(&pool, "B", None);
    ClubStaff::replace(&pool, a, &staff_form("A1", "", "", "2024")).unwrap();
    ClubStaff::replace(&pool, b, &staff_form("B1", "", "", "2024")).unwrap();
    ClubStaff::replace(&pool, b, &staff_form("B2", "", "", "2025")).unwrap();

    assert_eq!(ClubStaff::current(&pool, a).unwrap().president, "A1");
    assert_eq!(ClubStaff::current(&pool, b).unwrap().president, "B2");
}

#[test]
fn officer_names_skip_blanks() {
    let pool = test_pool();
    let club = make_club(&pool, "Gimhae", None);
    ClubStaff::replace(&pool, club, &staff_form("Kim", " ", "Park", "2024")).unwrap();
    let staff = ClubStaff::current(&pool, club).unwrap();
    assert_eq!(staff.officer_names(), vec!["Kim", "Park"]);
}

#[test]
fn document_replace() {
    let pool = test_pool();
    let club = make_club(&pool, "Mokpo", None);
    for title in ["Bylaws v1", "Bylaws v2", "Bylaws v3"] {
        ClubDocument::replace(
            &pool,
            club,
            &DocumentForm {
                title: title.to_string(),
                content: format!("{} text", title),
            },
        )
        .unwrap();
    }
    assert_eq!(ClubDocument::current(&pool, club).unwrap().title, "Bylaws v3");

    let conn = pool.get().unwrap();
    let live: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM club_documents WHERE club_no = ?1 AND attrib NOT LIKE '%XXXUP%'",
            rusqlite::params![club],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(live, 1);
}

// ═══════════════════════════════════════════════════════════
// Photos
// ═══════════════════════════════════════════════════════════

#[test]
fn latest_photo_wins() {
    let pool = test_pool();
    let club = make_club(&pool, "Yeosu", None);
    let no = make_member(&pool, club, "Ryu", None, false);
    assert!(StoredPhoto::latest(&pool, PhotoKind::Portrait, no).is_none());

    let mut last_id = 0;
    for i in 0..20u8 {
        last_id = StoredPhoto::insert(&pool, PhotoKind::Portrait, no, "image/jpeg", &[i; 8]).unwrap();
    }

    let latest = StoredPhoto::latest(&pool, PhotoKind::Portrait, no).unwrap();
    assert_eq!(latest.id, last_id);
    assert_eq!(latest.bytes, vec![19u8; 8]);
    assert_eq!(StoredPhoto::count(&pool, PhotoKind::Portrait, no), 20);

    // Kinds are kept apart
    assert!(StoredPhoto::latest(&pool, PhotoKind::Namecard, no).is_none());
}

#[test]
fn photo_kind_parsing() {
    assert_eq!(PhotoKind::parse("photo"), Some(PhotoKind::Portrait));
    assert_eq!(PhotoKind::parse("namecard"), Some(PhotoKind::Namecard));
    assert_eq!(PhotoKind::parse("spouse"), Some(PhotoKind::Spouse));
    assert_eq!(PhotoKind::parse("avatar"), None);
    for kind in PhotoKind::ALL {
        assert_eq!(PhotoKind::parse(kind.as_str()), Some(kind));
    }
}

#[test]
fn upload_pipeline_fits_budget_and_writes_thumbnail() {
    let pool = test_pool();
    let config = test_config("upload");
    let club = make_club(&pool, "Sokcho", None);
    let no = make_member(&pool, club, "Hwang", None, false);

    let png = images::tests::noise_png(700, 700);
    assert!(png.len() > PHOTO_BYTE_BUDGET);

    let processed =
        images::process_member_upload(&pool, &config.thumb_dir, PhotoKind::Portrait, no, &png, "image/png").unwrap();
    assert!(processed.byte_len <= PHOTO_BYTE_BUDGET);

    let stored = StoredPhoto::latest(&pool, PhotoKind::Portrait, no).unwrap();
    assert_eq!(stored.id, processed.photo_id);
    assert_eq!(stored.mime, "image/jpeg");
    assert!(stored.bytes.len() <= PHOTO_BYTE_BUDGET);
    assert!(image::load_from_memory(&stored.bytes).is_ok());

    let thumb = std::fs::read(&processed.thumb_path).unwrap();
    let decoded = image::load_from_memory(&thumb).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (THUMB_WIDTH, THUMB_HEIGHT));
    assert!(images::thumb_url(&config, PhotoKind::Portrait, no).ends_with(&format!("/thumbs/photo_{}.jpg", no)));
    assert!(images::thumb_url(&config, PhotoKind::Namecard, no).is_empty());

    let _ = std::fs::remove_dir_all(PathBuf::from(&config.thumb_dir).parent().unwrap());
}

#[test]
fn small_upload_is_stored_verbatim() {
    let pool = test_pool();
    let config = test_config("small");
    let club = make_club(&pool, "Andong", None);
    let no = make_member(&pool, club, "Nam", None, false);

    let png = images::tests::noise_png(60, 80);
    images::process_member_upload(&pool, &config.thumb_dir, PhotoKind::Namecard, no, &png, "image/png").unwrap();
    images::process_member_upload(&pool, &config.thumb_dir, PhotoKind::Namecard, no, &png, "image/png").unwrap();

    let stored = StoredPhoto::latest(&pool, PhotoKind::Namecard, no).unwrap();
    assert_eq!(stored.bytes, png);
    assert_eq!(stored.mime, "image/png");
    assert_eq!(StoredPhoto::count(&pool, PhotoKind::Namecard, no), 2);

    let _ = std::fs::remove_dir_all(PathBuf::from(&config.thumb_dir).parent().unwrap());
}

#[test]
fn undecodable_upload_stores_nothing() {
    let pool = test_pool();
    let config = test_config("junk");
    let club = make_club(&pool, "Gumi", None);
    let no = make_member(&pool, club, "Ko", None, false);

    let junk = vec![0x42u8; 512];
    assert!(images::process_member_upload(&pool, &config.thumb_dir, PhotoKind::Spouse, no, &junk, "image/png").is_err());
    assert_eq!(StoredPhoto::count(&pool, PhotoKind::Spouse, no), 0);
}

// ═══════════════════════════════════════════════════════════
// Slogan card
// ═══════════════════════════════════════════════════════════

#[test]
fn slogan_tiles_prefer_officers_then_rank() {
    let pool = test_pool();
    let club = make_club(&pool, "Chuncheon", None);
    make_member(&pool, club, "Top", Some(rank_no(&pool, "President")), false);
    make_member(&pool, club, "Second", Some(rank_no(&pool, "Director")), false);
    make_member(&pool, club, "Third", Some(rank_no(&pool, "Member")), false);
    make_member(&pool, club, "Treasurer Tan", None, false);
    ClubStaff::replace(&pool, club, &staff_form("Ghost", "", "Treasurer Tan", "2024")).unwrap();

    let tiles = slogan::collect_tiles(&pool, club).unwrap();
    let names: Vec<&str> = tiles.iter().map(|t| t.name.as_str()).collect();
    // "Ghost" is not a member, so it is skipped; the rest fill from rank order
    assert_eq!(names, vec!["Treasurer Tan", "Top", "Second"]);
    assert!(tiles.iter().all(|t| t.photo.is_none()));
}

#[test]
fn slogan_render_writes_cache() {
    let pool = test_pool();
    let config = test_config("slogan");
    let club = make_club(&pool, "Gangneung", None);
    let no = make_member(&pool, club, "Shin", None, false);
    StoredPhoto::insert(&pool, PhotoKind::Portrait, no, "image/png", &images::tests::noise_png(50, 50)).unwrap();

    assert!(slogan::cached(&config, club).is_none());
    let png = slogan::render_and_cache(&pool, &config, club).unwrap();
    let img = image::load_from_memory(&png).unwrap();
    assert_eq!((img.width(), img.height()), (slogan::CANVAS_WIDTH, slogan::CANVAS_HEIGHT));
    assert_eq!(slogan::cached(&config, club), Some(png));

    assert!(slogan::render_and_cache(&pool, &config, 9999).is_err());

    let _ = std::fs::remove_dir_all(PathBuf::from(&config.cache_dir).parent().unwrap());
}

// ═══════════════════════════════════════════════════════════
// Boards
// ═══════════════════════════════════════════════════════════

#[test]
fn board_messages() {
    let pool = test_pool();
    let club = make_club(&pool, "Gyeongju", None);
    let board = Board::create(
        &pool,
        &BoardForm {
            club_no: Some(club),
            region_no: None,
            title: "Notices".to_string(),
        },
    )
    .unwrap();

    let first = BoardMessage::create(
        &pool,
        board,
        &MessageForm {
            title: "Meeting".to_string(),
            body: "Thursday 7pm".to_string(),
        },
        "Administrator",
    )
    .unwrap();
    BoardMessage::create(
        &pool,
        board,
        &MessageForm {
            title: "Dues".to_string(),
            body: "Due by March".to_string(),
        },
        "Administrator",
    )
    .unwrap();

    let b = Board::find(&pool, board).unwrap();
    assert_eq!(b.owner_name.as_deref(), Some("Gyeongju"));
    assert_eq!(b.message_count, 2);

    let msgs = BoardMessage::list_for_board(&pool, board).unwrap();
    assert_eq!(msgs[0].title, "Dues");

    BoardMessage::archive(&pool, first).unwrap();
    assert_eq!(BoardMessage::list_for_board(&pool, board).unwrap().len(), 1);
    assert_eq!(Board::find(&pool, board).unwrap().message_count, 1);
    assert_eq!(Board::list(&pool).unwrap().len(), 1);
}

// ═══════════════════════════════════════════════════════════
// Request queue
// ═══════════════════════════════════════════════════════════

#[test]
fn request_queue() {
    let pool = test_pool();
    let empty = RequestForm {
        member_no: None,
        sender: "Visitor".to_string(),
        phone: None,
        body: "   ".to_string(),
    };
    assert!(RequestMessage::create(&pool, &empty).is_err());

    let id = RequestMessage::create(
        &pool,
        &RequestForm {
            member_no: None,
            sender: "Visitor".to_string(),
            phone: Some("010-0000-0000".to_string()),
            body: "Please update my address".to_string(),
        },
    )
    .unwrap();
    assert_eq!(RequestMessage::open_count(&pool), 1);

    RequestMessage::archive(&pool, id).unwrap();
    assert_eq!(RequestMessage::open_count(&pool), 0);
    let archived = RequestMessage::list(&pool, true).unwrap();
    assert_eq!(archived.len(), 1);
    assert!(archived[0].archived);
    assert_eq!(archived[0].phone, "010-0000-0000");
}

// ═══════════════════════════════════════════════════════════
// Config
// ═══════════════════════════════════════════════════════════

#[test]
fn config_url_joins_paths() {
    let config = AppConfig {
        base_url: "https://lions.example.org".to_string(),
        ..AppConfig::default()
    };
    assert_eq!(config.url("/thumbs/photo_1.jpg"), "https://lions.example.org/thumbs/photo_1.jpg");
    assert_eq!(config.url("phapp/clubs"), "https://lions.example.org/phapp/clubs");
}

// ═══════════════════════════════════════════════════════════
// HTTP surface
// ═══════════════════════════════════════════════════════════

fn client_for(pool: &DbPool, config: &AppConfig) -> Client {
    std::fs::create_dir_all(&config.thumb_dir).unwrap();
    Client::tracked(crate::app(pool.clone(), config.clone())).expect("valid rocket instance")
}

fn login_admin(client: &Client) {
    let response = client
        .post("/login")
        .header(ContentType::Form)
        .body("user_id=admin&password=admin")
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(response.headers().get_one("Location"), Some("/success"));
}

fn multipart_image(png: &[u8]) -> (ContentType, Vec<u8>) {
    let boundary = "lions-upload-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"face.png\"\r\nContent-Type: image/png\r\n\r\n",
            boundary
        )
        .as_bytes(),
    );
    body.extend_from_slice(png);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    let content_type = ContentType::new("multipart", "form-data").with_params(("boundary", boundary));
    (content_type, body)
}

#[test]
fn unknown_paths_render_not_found() {
    let pool = test_pool();
    let config = test_config("notfound");
    let client = client_for(&pool, &config);

    for path in ["/no/such/page", "/phapp/nothing", "/phapp/member/99999", "/static/missing.css"] {
        let response = client.get(path).dispatch();
        assert_eq!(response.status(), Status::NotFound, "{}", path);
    }

    // Signed in makes no difference for paths nothing serves
    login_admin(&client);
    assert_eq!(client.get("/no/such/page").dispatch().status(), Status::NotFound);

    let _ = std::fs::remove_dir_all(PathBuf::from(&config.thumb_dir).parent().unwrap());
}

#[test]
fn protected_pages_redirect_without_session() {
    let pool = test_pool();
    let config = test_config("redirect");
    let client = client_for(&pool, &config);

    assert_eq!(client.get("/").dispatch().status(), Status::Ok);

    for path in ["/clubList", "/memberList", "/requests", "/success"] {
        let response = client.get(path).dispatch();
        assert_eq!(response.status(), Status::SeeOther, "{}", path);
        assert_eq!(response.headers().get_one("Location"), Some("/"));
    }

    let response = client
        .post("/region/new")
        .header(ContentType::Form)
        .body("region_name=Sneaky")
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert!(Region::list(&pool).unwrap().is_empty());

    let _ = std::fs::remove_dir_all(PathBuf::from(&config.thumb_dir).parent().unwrap());
}

#[test]
fn member_session_is_read_only_and_respects_privacy() {
    let pool = test_pool();
    let config = test_config("msession");
    let (private, _, business) = private_member_fixture(&pool, true);
    Member::set_password(&pool, private.member_no, &fast_hash("1234")).unwrap();
    let client = client_for(&pool, &config);

    let response = client
        .post("/mlogin")
        .header(ContentType::Form)
        .body("member_name=Baek&password=1234")
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(response.headers().get_one("Location"), Some("/success"));

    // Staff-only page bounces a member session back to the login page
    let response = client.get("/requests").dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(response.headers().get_one("Location"), Some("/"));

    let response = client.get(format!("/member/{}", private.member_no)).dispatch();
    assert_eq!(response.status(), Status::Ok);
    let page = response.into_string().unwrap();
    assert!(!page.contains(&business.company));
    assert!(!page.contains(&business.title));
    assert!(!page.contains(&private.phone));
    assert!(page.contains(HIDDEN));

    let _ = std::fs::remove_dir_all(PathBuf::from(&config.thumb_dir).parent().unwrap());
}

#[test]
fn photo_upload_requires_live_member() {
    let pool = test_pool();
    let config = test_config("owner");
    let club = make_club(&pool, "Tongyeong", None);
    let live = make_member(&pool, club, "Yang", None, false);
    let retired = make_member(&pool, club, "Jo", None, false);
    Member::archive(&pool, retired).unwrap();

    let client = client_for(&pool, &config);
    login_admin(&client);
    let png = images::tests::noise_png(40, 40);

    for no in [99999, retired] {
        let (content_type, body) = multipart_image(&png);
        let response = client
            .post(format!("/member/{}/photo/photo", no))
            .header(content_type)
            .body(body)
            .dispatch();
        assert_eq!(response.status(), Status::NotFound);
        assert_eq!(StoredPhoto::count(&pool, PhotoKind::Portrait, no), 0);
        assert!(!images::thumb_path(&config.thumb_dir, PhotoKind::Portrait, no).exists());
    }

    let (content_type, body) = multipart_image(&png);
    let response = client
        .post(format!("/member/{}/photo/photo", live))
        .header(content_type)
        .body(body)
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(
        response.headers().get_one("Location"),
        Some(format!("/member/{}", live).as_str())
    );
    assert_eq!(StoredPhoto::count(&pool, PhotoKind::Portrait, live), 1);
    assert!(images::thumb_path(&config.thumb_dir, PhotoKind::Portrait, live).is_file());

    let _ = std::fs::remove_dir_all(PathBuf::from(&config.thumb_dir).parent().unwrap());
}

#[test]
fn config_reads_process_environment() {
    std::env::set_var("LIONS_THUMB_DIR", "/srv/lions/thumbs");
    std::env::set_var("LIONS_BASE_URL", "https://lions.example.org/");
    let config = AppConfig::from_env();
    std::env::remove_var("LIONS_THUMB_DIR");
    std::env::remove_var("LIONS_BASE_URL");

    assert_eq!(config.thumb_dir, "/srv/lions/thumbs");
    assert_eq!(config.base_url, "https://lions.example.org");
    assert_eq!(config.session_hours, AppConfig::default().session_hours);
}
