//! Consistency rules for slots, conferences and attendance.
//!
//! These checks are pure: the stores load the rows involved, call in here,
//! and only write when the check passes. Both stores run the load, check and
//! write under one lock (a row lock in Postgres, the state lock in memory) so
//! two requests cannot claim the same slot.

use chrono::{DateTime, Utc};

use crate::models::{AttendanceDays, Conference, ProfileChanges, SlotKind, TimeSlot, User};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleViolation {
    #[error("end time must be after start time")]
    InvalidWindow,

    #[error("time slot is no longer available")]
    SlotUnavailable,

    #[error("time slot is already assigned to a conference")]
    SlotOccupied,

    #[error("you have already proposed a conference")]
    SpeakerAlreadyBooked,

    #[error("attendance days and lodging require attending the event")]
    AttendanceRequired,
}

pub fn check_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), RuleViolation> {
    if end <= start {
        return Err(RuleViolation::InvalidWindow);
    }
    Ok(())
}

/// A slot can take `conference_id` when it is a conference slot and is either
/// free or already held by that same conference. `conference_id` is `None`
/// for a conference that does not exist yet.
pub fn check_slot_assignable(
    slot: &TimeSlot,
    occupant: Option<&Conference>,
    conference_id: Option<i32>,
) -> Result<(), RuleViolation> {
    if slot.kind != SlotKind::Conference {
        return Err(RuleViolation::SlotUnavailable);
    }
    match occupant {
        Some(held) if Some(held.id) != conference_id => Err(RuleViolation::SlotUnavailable),
        _ => Ok(()),
    }
}

pub fn check_speaker_free(existing: Option<&Conference>) -> Result<(), RuleViolation> {
    match existing {
        Some(_) => Err(RuleViolation::SpeakerAlreadyBooked),
        None => Ok(()),
    }
}

pub fn check_slot_deletable(occupant: Option<&Conference>) -> Result<(), RuleViolation> {
    match occupant {
        Some(_) => Err(RuleViolation::SlotOccupied),
        None => Ok(()),
    }
}

/// Validates an edit of a slot against its stored values: the merged window
/// must stay ordered and an occupied slot must keep the conference kind.
pub fn check_slot_edit(
    slot: &TimeSlot,
    occupant: Option<&Conference>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    kind: Option<SlotKind>,
) -> Result<(), RuleViolation> {
    check_window(start.unwrap_or(slot.start_time), end.unwrap_or(slot.end_time))?;
    if occupant.is_some() && kind.is_some_and(|k| k != SlotKind::Conference) {
        return Err(RuleViolation::SlotUnavailable);
    }
    Ok(())
}

/// Merges a profile update into the stored user and returns the complete
/// resulting state.
///
/// Leaving the event clears days and lodging. Joining with no days defaults
/// to both days. Asking for days or lodging while not attending is refused.
pub fn resolve_profile(user: &User, changes: &ProfileChanges) -> Result<ProfileChanges, RuleViolation> {
    let is_attending = changes.is_attending.unwrap_or(user.is_attending);
    let mut attendance_days = changes.attendance_days.unwrap_or(user.attendance_days);
    let mut sleeps_on_site = changes.sleeps_on_site.unwrap_or(user.sleeps_on_site);

    if is_attending {
        if attendance_days == AttendanceDays::None && changes.attendance_days.is_none() {
            attendance_days = AttendanceDays::Both;
        }
    } else {
        let wants_days = changes.attendance_days.is_some_and(|d| d != AttendanceDays::None);
        let wants_bed = changes.sleeps_on_site == Some(true);
        if wants_days || wants_bed {
            return Err(RuleViolation::AttendanceRequired);
        }
        attendance_days = AttendanceDays::None;
        sleeps_on_site = false;
    }

    Ok(ProfileChanges {
        wants_to_speak: Some(changes.wants_to_speak.unwrap_or(user.wants_to_speak)),
        is_attending: Some(is_attending),
        attendance_days: Some(attendance_days),
        sleeps_on_site: Some(sleeps_on_site),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 5, hour, 0, 0).unwrap()
    }

    fn slot(kind: SlotKind) -> TimeSlot {
        TimeSlot {
            id: 7,
            title: "Morning talk".to_string(),
            start_time: at(9),
            end_time: at(10),
            kind,
            created_at: at(0),
        }
    }

    fn conference(id: i32) -> Conference {
        Conference {
            id,
            title: format!("Talk {}", id),
            description: None,
            speaker_id: format!("speaker-{}", id),
            time_slot_id: Some(7),
            created_at: at(0),
        }
    }

    fn user(is_attending: bool, days: AttendanceDays, sleeps: bool) -> User {
        User {
            id: "u1".to_string(),
            name: Some("Camille".to_string()),
            email: "camille@example.org".to_string(),
            role: Role::User,
            wants_to_speak: false,
            is_attending,
            attendance_days: days,
            sleeps_on_site: sleeps,
            created_at: at(0),
        }
    }

    #[test]
    fn window_must_be_strictly_ordered() {
        assert_eq!(check_window(at(9), at(10)), Ok(()));
        assert_eq!(check_window(at(10), at(10)), Err(RuleViolation::InvalidWindow));
        assert_eq!(check_window(at(11), at(10)), Err(RuleViolation::InvalidWindow));
    }

    #[test]
    fn free_conference_slot_is_assignable() {
        assert_eq!(check_slot_assignable(&slot(SlotKind::Conference), None, None), Ok(()));
        assert_eq!(check_slot_assignable(&slot(SlotKind::Conference), None, Some(3)), Ok(()));
    }

    #[test]
    fn non_conference_kinds_are_never_assignable() {
        for kind in [SlotKind::Meal, SlotKind::Break, SlotKind::Other] {
            assert_eq!(
                check_slot_assignable(&slot(kind), None, Some(1)),
                Err(RuleViolation::SlotUnavailable)
            );
        }
    }

    #[test]
    fn occupied_slot_rejects_other_conferences() {
        let held = conference(1);
        let s = slot(SlotKind::Conference);
        assert_eq!(check_slot_assignable(&s, Some(&held), Some(2)), Err(RuleViolation::SlotUnavailable));
        assert_eq!(check_slot_assignable(&s, Some(&held), None), Err(RuleViolation::SlotUnavailable));
    }

    #[test]
    fn reassigning_the_holder_is_idempotent() {
        let held = conference(1);
        assert_eq!(check_slot_assignable(&slot(SlotKind::Conference), Some(&held), Some(1)), Ok(()));
    }

    #[test]
    fn speaker_holds_one_conference() {
        assert_eq!(check_speaker_free(None), Ok(()));
        assert_eq!(check_speaker_free(Some(&conference(1))), Err(RuleViolation::SpeakerAlreadyBooked));
    }

    #[test]
    fn occupied_slot_cannot_be_deleted() {
        assert_eq!(check_slot_deletable(None), Ok(()));
        assert_eq!(check_slot_deletable(Some(&conference(1))), Err(RuleViolation::SlotOccupied));
    }

    #[test]
    fn slot_edit_merges_window_with_stored_values() {
        let s = slot(SlotKind::Conference);
        assert_eq!(check_slot_edit(&s, None, None, Some(at(12)), None), Ok(()));
        assert_eq!(check_slot_edit(&s, None, Some(at(10)), None, None), Err(RuleViolation::InvalidWindow));
        assert_eq!(check_slot_edit(&s, None, Some(at(8)), Some(at(8)), None), Err(RuleViolation::InvalidWindow));
    }

    #[test]
    fn occupied_slot_keeps_conference_kind() {
        let s = slot(SlotKind::Conference);
        let held = conference(1);
        assert_eq!(
            check_slot_edit(&s, Some(&held), None, None, Some(SlotKind::Meal)),
            Err(RuleViolation::SlotUnavailable)
        );
        assert_eq!(check_slot_edit(&s, Some(&held), None, None, Some(SlotKind::Conference)), Ok(()));
        assert_eq!(check_slot_edit(&s, None, None, None, Some(SlotKind::Break)), Ok(()));
    }

    #[test]
    fn joining_defaults_to_both_days() {
        let stored = user(false, AttendanceDays::None, false);
        let changes = ProfileChanges { is_attending: Some(true), ..Default::default() };
        let resolved = resolve_profile(&stored, &changes).unwrap();
        assert_eq!(resolved.is_attending, Some(true));
        assert_eq!(resolved.attendance_days, Some(AttendanceDays::Both));
        assert_eq!(resolved.sleeps_on_site, Some(false));
    }

    #[test]
    fn joining_with_explicit_day_keeps_it() {
        let stored = user(false, AttendanceDays::None, false);
        let changes = ProfileChanges {
            is_attending: Some(true),
            attendance_days: Some(AttendanceDays::Day2),
            sleeps_on_site: Some(true),
            ..Default::default()
        };
        let resolved = resolve_profile(&stored, &changes).unwrap();
        assert_eq!(resolved.attendance_days, Some(AttendanceDays::Day2));
        assert_eq!(resolved.sleeps_on_site, Some(true));
    }

    #[test]
    fn leaving_clears_days_and_lodging() {
        let stored = user(true, AttendanceDays::Day1, true);
        let changes = ProfileChanges { is_attending: Some(false), ..Default::default() };
        let resolved = resolve_profile(&stored, &changes).unwrap();
        assert_eq!(resolved.attendance_days, Some(AttendanceDays::None));
        assert_eq!(resolved.sleeps_on_site, Some(false));
    }

    #[test]
    fn lodging_without_attendance_is_refused() {
        let stored = user(false, AttendanceDays::None, false);
        let bed = ProfileChanges { sleeps_on_site: Some(true), ..Default::default() };
        assert_eq!(resolve_profile(&stored, &bed), Err(RuleViolation::AttendanceRequired));

        let days = ProfileChanges { attendance_days: Some(AttendanceDays::Day1), ..Default::default() };
        assert_eq!(resolve_profile(&stored, &days), Err(RuleViolation::AttendanceRequired));

        let leave_and_sleep = ProfileChanges {
            is_attending: Some(false),
            sleeps_on_site: Some(true),
            ..Default::default()
        };
        let attending = user(true, AttendanceDays::Both, false);
        assert_eq!(resolve_profile(&attending, &leave_and_sleep), Err(RuleViolation::AttendanceRequired));
    }

    #[test]
    fn resolved_profiles_hold_the_attendance_invariants() {
        let stored_states = [
            user(false, AttendanceDays::None, false),
            user(true, AttendanceDays::Both, true),
            user(true, AttendanceDays::Day1, false),
        ];
        let updates = [
            ProfileChanges { is_attending: Some(true), ..Default::default() },
            ProfileChanges { is_attending: Some(false), ..Default::default() },
            ProfileChanges { attendance_days: Some(AttendanceDays::None), ..Default::default() },
            ProfileChanges { sleeps_on_site: Some(false), ..Default::default() },
            ProfileChanges { wants_to_speak: Some(true), ..Default::default() },
        ];
        for stored in &stored_states {
            for update in &updates {
                if let Ok(resolved) = resolve_profile(stored, update) {
                    let attending = resolved.is_attending.unwrap();
                    assert!(!resolved.sleeps_on_site.unwrap() || attending);
                    assert!(resolved.attendance_days.unwrap() == AttendanceDays::None || attending);
                }
            }
        }
    }
}
