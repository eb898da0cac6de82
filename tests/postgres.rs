//! Store tests against a migrated Postgres database.
//!
//! They run only when `DATABASE_URL` is set (`diesel migration run` first)
//! and return early otherwise. Every test works on its own users and removes
//! them afterwards.

use std::thread;

use chrono::{Duration, TimeZone, Utc};
use diesel::prelude::*;

use congres::actions;
use congres::error::AppError;
use congres::models::{NewConference, NewTimeSlot, NewUser, ProfileChanges, Role, SlotKind};
use congres::schema::{time_slots, users};
use congres::store::{initialize_db_pool, DbPool};

fn test_pool() -> Option<DbPool> {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").ok()?;
    Some(initialize_db_pool(&url, 4).expect("DATABASE_URL should point to a reachable database"))
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

fn provision(pool: &DbPool, id: &str, name: Option<String>) {
    let mut conn = pool.get().unwrap();
    actions::provision_user(
        &mut conn,
        &NewUser {
            id: id.to_string(),
            name,
            email: format!("{}@example.org", id),
            role: Role::User,
        },
    )
    .unwrap();
}

fn remove_user(pool: &DbPool, id: &str) {
    let mut conn = pool.get().unwrap();
    diesel::delete(users::table.find(id)).execute(&mut conn).unwrap();
}

fn proposal(speaker_id: &str, title: String, time_slot_id: Option<i32>) -> NewConference {
    NewConference {
        title,
        description: None,
        speaker_id: speaker_id.to_string(),
        time_slot_id,
    }
}

#[test]
fn deleting_a_conference_while_its_speaker_opts_out_never_deadlocks() {
    let Some(pool) = test_pool() else { return };

    for round in 0..20 {
        let id = unique("race");
        provision(&pool, &id, None);
        let conference_id = {
            let mut conn = pool.get().unwrap();
            actions::create_conference(&mut conn, &proposal(&id, "Hedgerows".to_string(), None))
                .unwrap()
                .conference
                .id
        };

        let delete_pool = pool.clone();
        let delete = thread::spawn(move || actions::delete_conference(&mut delete_pool.get().unwrap(), conference_id));

        let opt_out_pool = pool.clone();
        let speaker = id.clone();
        let opt_out = thread::spawn(move || {
            let changes = ProfileChanges {
                wants_to_speak: Some(false),
                ..Default::default()
            };
            actions::update_profile(&mut opt_out_pool.get().unwrap(), &speaker, &changes)
        });

        let deleted = delete.join().unwrap();
        let opted_out = opt_out.join().unwrap();
        assert!(
            matches!(deleted, Ok(()) | Err(AppError::NotFound(_))),
            "round {}: {:?}",
            round,
            deleted
        );
        let profile = opted_out.unwrap_or_else(|e| panic!("round {}: {:?}", round, e));
        assert!(profile.conferences.is_empty());
        assert!(!profile.user.wants_to_speak);

        remove_user(&pool, &id);
    }
}

#[test]
fn long_text_is_stored_as_given() {
    let Some(pool) = test_pool() else { return };

    let id = unique("long");
    let name = "N".repeat(400);
    provision(&pool, &id, Some(name.clone()));

    let mut conn = pool.get().unwrap();
    let title = "T".repeat(600);
    let detail = actions::create_conference(&mut conn, &proposal(&id, title.clone(), None)).unwrap();
    assert_eq!(detail.conference.title, title);
    assert_eq!(detail.speaker.name.as_deref(), Some(name.as_str()));

    drop(conn);
    remove_user(&pool, &id);
}

#[test]
fn a_taken_slot_is_refused_with_a_rule_error() {
    let Some(pool) = test_pool() else { return };

    let (first, second) = (unique("first"), unique("second"));
    provision(&pool, &first, None);
    provision(&pool, &second, None);

    let mut conn = pool.get().unwrap();
    let start = Utc.with_ymd_and_hms(2025, 7, 5, 9, 0, 0).unwrap();
    let slot = actions::create_time_slot(
        &mut conn,
        &NewTimeSlot {
            title: unique("slot"),
            start_time: start,
            end_time: start + Duration::hours(1),
            kind: SlotKind::Conference,
        },
    )
    .unwrap();

    actions::create_conference(&mut conn, &proposal(&first, "Bees".to_string(), Some(slot.id))).unwrap();
    let err = actions::create_conference(&mut conn, &proposal(&second, "Wasps".to_string(), Some(slot.id))).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{:?}", err);

    let err = actions::create_conference(&mut conn, &proposal(&first, "Again".to_string(), None)).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{:?}", err);

    remove_user(&pool, &first);
    remove_user(&pool, &second);
    diesel::delete(time_slots::table.find(slot.id)).execute(&mut conn).unwrap();
}
