use std::collections::HashMap;

use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::error::{AppError, Result};
use crate::models::{
    self, AssignedConference, AttendanceStats, Conference, ConferenceDetail, Profile, SpeakerConference,
    SpeakerSummary, TimeSlot, TimeSlotDetail, User, UserOverview,
};
use crate::rules::{self, RuleViolation};
use crate::schema::{conferences, time_slots, users};

// Unique constraints backing the assignment rules, see migrations/.
const SLOT_CONSTRAINT: &str = "one_conference_per_slot";

/// Translates unique violations on `conferences` into the rule they enforce.
fn conference_conflict(err: DieselError) -> AppError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info) => {
            if info.constraint_name() == Some(SLOT_CONSTRAINT) {
                RuleViolation::SlotUnavailable.into()
            } else {
                RuleViolation::SpeakerAlreadyBooked.into()
            }
        }
        other => other.into(),
    }
}

pub fn find_user(conn: &mut PgConnection, uid: &str) -> Result<Option<User>> {
    let user = users::table.find(uid).first::<User>(conn).optional()?;
    Ok(user)
}

pub fn provision_user(conn: &mut PgConnection, new_user: &models::NewUser) -> Result<User> {
    diesel::insert_into(users::table)
        .values(new_user)
        .on_conflict(users::id)
        .do_nothing()
        .execute(conn)?;

    let user = users::table.find(new_user.id.as_str()).first::<User>(conn)?;
    Ok(user)
}

fn lock_user(conn: &mut PgConnection, uid: &str) -> Result<User> {
    users::table
        .find(uid)
        .for_update()
        .first::<User>(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found("user not found"))
}

pub fn profile(conn: &mut PgConnection, uid: &str) -> Result<Profile> {
    let user = find_user(conn, uid)?.ok_or_else(|| AppError::not_found("user not found"))?;

    let conferences = conferences::table
        .left_join(time_slots::table)
        .filter(conferences::speaker_id.eq(uid))
        .order(conferences::created_at.desc())
        .select((conferences::all_columns, time_slots::all_columns.nullable()))
        .load::<(Conference, Option<TimeSlot>)>(conn)?
        .into_iter()
        .map(|(conference, time_slot)| SpeakerConference { conference, time_slot })
        .collect();

    Ok(Profile { user, conferences })
}

pub fn update_profile(conn: &mut PgConnection, uid: &str, changes: &models::ProfileChanges) -> Result<Profile> {
    conn.transaction::<_, AppError, _>(|conn| {
        let user = lock_user(conn, uid)?;
        let resolved = rules::resolve_profile(&user, changes)?;

        if changes.wants_to_speak == Some(false) {
            let removed = diesel::delete(conferences::table.filter(conferences::speaker_id.eq(uid))).execute(conn)?;
            if removed > 0 {
                log::info!("removed {} conference(s) of user {} who no longer wants to speak", removed, uid);
            }
        }

        diesel::update(users::table.find(uid)).set(&resolved).execute(conn)?;
        profile(conn, uid)
    })
}

pub fn attendance_stats(conn: &mut PgConnection) -> Result<AttendanceStats> {
    let total: i64 = users::table.count().get_result(conn)?;
    let attending: i64 = users::table
        .filter(users::is_attending.eq(true))
        .count()
        .get_result(conn)?;
    Ok(AttendanceStats::new(total, attending))
}

pub fn user_overviews(conn: &mut PgConnection) -> Result<Vec<UserOverview>> {
    let all_users = users::table.order(users::created_at.asc()).load::<User>(conn)?;

    let mut titles: HashMap<String, Vec<String>> = HashMap::new();
    let rows: Vec<(String, String)> = conferences::table
        .order(conferences::created_at.asc())
        .select((conferences::speaker_id, conferences::title))
        .load(conn)?;
    for (speaker_id, title) in rows {
        titles.entry(speaker_id).or_default().push(title);
    }

    Ok(all_users
        .into_iter()
        .map(|user| {
            let conference_titles = titles.remove(&user.id).unwrap_or_default();
            UserOverview::new(user, conference_titles)
        })
        .collect())
}

type SlotRow = (TimeSlot, Option<Conference>, Option<SpeakerSummary>);

fn slot_detail(row: SlotRow) -> TimeSlotDetail {
    let (slot, conference, speaker) = row;
    let assigned = conference
        .zip(speaker)
        .map(|(conference, speaker)| AssignedConference { conference, speaker });
    TimeSlotDetail::new(slot, assigned)
}

pub fn list_time_slots(conn: &mut PgConnection) -> Result<Vec<TimeSlotDetail>> {
    let rows = time_slots::table
        .left_join(conferences::table.on(conferences::time_slot_id.eq(time_slots::id.nullable())))
        .left_join(users::table.on(users::id.eq(conferences::speaker_id)))
        .order((time_slots::start_time.asc(), time_slots::id.asc()))
        .select((
            time_slots::all_columns,
            conferences::all_columns.nullable(),
            (users::id, users::name, users::email).nullable(),
        ))
        .load::<SlotRow>(conn)?;

    Ok(rows.into_iter().map(slot_detail).collect())
}

pub fn time_slot(conn: &mut PgConnection, slot_id: i32) -> Result<Option<TimeSlotDetail>> {
    let row = time_slots::table
        .left_join(conferences::table.on(conferences::time_slot_id.eq(time_slots::id.nullable())))
        .left_join(users::table.on(users::id.eq(conferences::speaker_id)))
        .filter(time_slots::id.eq(slot_id))
        .select((
            time_slots::all_columns,
            conferences::all_columns.nullable(),
            (users::id, users::name, users::email).nullable(),
        ))
        .first::<SlotRow>(conn)
        .optional()?;

    Ok(row.map(slot_detail))
}

/// Locks the slot row for the rest of the transaction and returns it with
/// the conference currently holding it.
fn lock_slot(conn: &mut PgConnection, slot_id: i32) -> Result<(TimeSlot, Option<Conference>)> {
    let slot = time_slots::table
        .find(slot_id)
        .for_update()
        .first::<TimeSlot>(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found("time slot not found"))?;

    let occupant = conferences::table
        .filter(conferences::time_slot_id.eq(slot_id))
        .first::<Conference>(conn)
        .optional()?;

    Ok((slot, occupant))
}

pub fn create_time_slot(conn: &mut PgConnection, new_slot: &models::NewTimeSlot) -> Result<TimeSlot> {
    rules::check_window(new_slot.start_time, new_slot.end_time)?;

    let slot = diesel::insert_into(time_slots::table)
        .values(new_slot)
        .get_result::<TimeSlot>(conn)?;
    Ok(slot)
}

pub fn update_time_slot(
    conn: &mut PgConnection,
    slot_id: i32,
    changes: &models::TimeSlotChanges,
) -> Result<TimeSlotDetail> {
    conn.transaction::<_, AppError, _>(|conn| {
        let (slot, occupant) = lock_slot(conn, slot_id)?;
        rules::check_slot_edit(&slot, occupant.as_ref(), changes.start_time, changes.end_time, changes.kind)?;

        if !changes.is_empty() {
            diesel::update(time_slots::table.find(slot_id)).set(changes).execute(conn)?;
        }

        time_slot(conn, slot_id)?.ok_or_else(|| AppError::not_found("time slot not found"))
    })
}

pub fn delete_time_slot(conn: &mut PgConnection, slot_id: i32) -> Result<()> {
    conn.transaction::<_, AppError, _>(|conn| {
        let (_, occupant) = lock_slot(conn, slot_id)?;
        rules::check_slot_deletable(occupant.as_ref())?;

        diesel::delete(time_slots::table.find(slot_id)).execute(conn)?;
        Ok(())
    })
}

type ConferenceRow = (Conference, SpeakerSummary, Option<TimeSlot>);

fn conference_detail_from(row: ConferenceRow) -> ConferenceDetail {
    let (conference, speaker, time_slot) = row;
    ConferenceDetail { conference, speaker, time_slot }
}

pub fn list_conferences(conn: &mut PgConnection) -> Result<Vec<ConferenceDetail>> {
    let rows = conferences::table
        .inner_join(users::table)
        .left_join(time_slots::table)
        .order(conferences::created_at.desc())
        .select((
            conferences::all_columns,
            (users::id, users::name, users::email),
            time_slots::all_columns.nullable(),
        ))
        .load::<ConferenceRow>(conn)?;

    Ok(rows.into_iter().map(conference_detail_from).collect())
}

pub fn conference_detail(conn: &mut PgConnection, conference_id: i32) -> Result<ConferenceDetail> {
    let row = conferences::table
        .inner_join(users::table)
        .left_join(time_slots::table)
        .filter(conferences::id.eq(conference_id))
        .select((
            conferences::all_columns,
            (users::id, users::name, users::email),
            time_slots::all_columns.nullable(),
        ))
        .first::<ConferenceRow>(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found("conference not found"))?;

    Ok(conference_detail_from(row))
}

pub fn find_conference(conn: &mut PgConnection, conference_id: i32) -> Result<Option<Conference>> {
    let conference = conferences::table
        .find(conference_id)
        .first::<Conference>(conn)
        .optional()?;
    Ok(conference)
}

pub fn create_conference(conn: &mut PgConnection, new_conference: &models::NewConference) -> Result<ConferenceDetail> {
    conn.transaction::<_, AppError, _>(|conn| {
        // The speaker row lock serializes proposals from the same user.
        lock_user(conn, &new_conference.speaker_id)?;

        let existing = conferences::table
            .filter(conferences::speaker_id.eq(&new_conference.speaker_id))
            .first::<Conference>(conn)
            .optional()?;
        rules::check_speaker_free(existing.as_ref())?;

        if let Some(slot_id) = new_conference.time_slot_id {
            let (slot, occupant) = lock_slot(conn, slot_id)?;
            rules::check_slot_assignable(&slot, occupant.as_ref(), None)?;
        }

        let conference_id: i32 = diesel::insert_into(conferences::table)
            .values(new_conference)
            .returning(conferences::id)
            .get_result(conn)
            .map_err(conference_conflict)?;

        diesel::update(users::table.find(&new_conference.speaker_id))
            .set(users::wants_to_speak.eq(true))
            .execute(conn)?;

        conference_detail(conn, conference_id)
    })
}

pub fn update_conference(
    conn: &mut PgConnection,
    conference_id: i32,
    changes: &models::ConferenceChanges,
) -> Result<ConferenceDetail> {
    conn.transaction::<_, AppError, _>(|conn| {
        conferences::table
            .find(conference_id)
            .for_update()
            .first::<Conference>(conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("conference not found"))?;

        if let Some(Some(slot_id)) = changes.time_slot_id {
            let (slot, occupant) = lock_slot(conn, slot_id)?;
            rules::check_slot_assignable(&slot, occupant.as_ref(), Some(conference_id))?;
        }

        if !changes.is_empty() {
            diesel::update(conferences::table.find(conference_id))
                .set(changes)
                .execute(conn)
                .map_err(conference_conflict)?;
        }

        conference_detail(conn, conference_id)
    })
}

pub fn delete_conference(conn: &mut PgConnection, conference_id: i32) -> Result<()> {
    conn.transaction::<_, AppError, _>(|conn| {
        let speaker_id = find_conference(conn, conference_id)?
            .ok_or_else(|| AppError::not_found("conference not found"))?
            .speaker_id;

        // Lock order is user, then conference, as in update_profile.
        lock_user(conn, &speaker_id)?;
        let conference = conferences::table
            .find(conference_id)
            .for_update()
            .first::<Conference>(conn)
            .optional()?
            .ok_or_else(|| AppError::not_found("conference not found"))?;

        diesel::delete(conferences::table.find(conference_id)).execute(conn)?;
        diesel::update(users::table.find(&conference.speaker_id))
            .set(users::wants_to_speak.eq(false))
            .execute(conn)?;
        Ok(())
    })
}
