use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::Store;
use crate::error::{AppError, Result};
use crate::models::{
    AssignedConference, AttendanceStats, Conference, ConferenceChanges, ConferenceDetail, NewConference,
    NewTimeSlot, NewUser, Profile, ProfileChanges, SpeakerConference, SpeakerSummary, TimeSlot,
    TimeSlotChanges, TimeSlotDetail, User, UserOverview,
};
use crate::rules;

#[derive(Default)]
struct State {
    // creation order
    users: Vec<User>,
    time_slots: BTreeMap<i32, TimeSlot>,
    conferences: BTreeMap<i32, Conference>,
    last_slot_id: i32,
    last_conference_id: i32,
}

impl State {
    fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn user_mut(&mut self, id: &str) -> Result<&mut User> {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::not_found("user not found"))
    }

    fn slot(&self, id: i32) -> Result<&TimeSlot> {
        self.time_slots
            .get(&id)
            .ok_or_else(|| AppError::not_found("time slot not found"))
    }

    fn occupant(&self, slot_id: i32) -> Option<&Conference> {
        self.conferences.values().find(|c| c.time_slot_id == Some(slot_id))
    }

    fn speaker(&self, user_id: &str) -> SpeakerSummary {
        match self.user(user_id) {
            Some(user) => SpeakerSummary::from(user),
            None => SpeakerSummary {
                id: user_id.to_string(),
                name: None,
                email: String::new(),
            },
        }
    }

    fn conference_detail(&self, id: i32) -> Result<ConferenceDetail> {
        let conference = self
            .conferences
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found("conference not found"))?;
        Ok(ConferenceDetail {
            speaker: self.speaker(&conference.speaker_id),
            time_slot: conference.time_slot_id.and_then(|s| self.time_slots.get(&s).cloned()),
            conference,
        })
    }

    fn slot_detail(&self, slot: &TimeSlot) -> TimeSlotDetail {
        let conference = self.occupant(slot.id).map(|c| AssignedConference {
            speaker: self.speaker(&c.speaker_id),
            conference: c.clone(),
        });
        TimeSlotDetail::new(slot.clone(), conference)
    }

    fn profile(&self, user_id: &str) -> Result<Profile> {
        let user = self
            .user(user_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("user not found"))?;
        let conferences = self
            .conferences
            .values()
            .rev()
            .filter(|c| c.speaker_id == user_id)
            .map(|c| SpeakerConference {
                conference: c.clone(),
                time_slot: c.time_slot_id.and_then(|s| self.time_slots.get(&s).cloned()),
            })
            .collect();
        Ok(Profile { user, conferences })
    }
}

/// Process-local store. A single lock guards the whole state, so every
/// check-then-write sequence is atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.state.read().await.user(id).cloned())
    }

    async fn provision_user(&self, new_user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.user(&new_user.id) {
            return Ok(existing.clone());
        }
        let user = new_user.into_user(Utc::now());
        state.users.push(user.clone());
        Ok(user)
    }

    async fn profile(&self, user_id: &str) -> Result<Profile> {
        self.state.read().await.profile(user_id)
    }

    async fn update_profile(&self, user_id: &str, changes: ProfileChanges) -> Result<Profile> {
        let mut state = self.state.write().await;
        let user = state.user_mut(user_id)?;
        let resolved = rules::resolve_profile(user, &changes)?;

        user.wants_to_speak = resolved.wants_to_speak.unwrap_or(user.wants_to_speak);
        user.is_attending = resolved.is_attending.unwrap_or(user.is_attending);
        user.attendance_days = resolved.attendance_days.unwrap_or(user.attendance_days);
        user.sleeps_on_site = resolved.sleeps_on_site.unwrap_or(user.sleeps_on_site);

        if changes.wants_to_speak == Some(false) {
            state.conferences.retain(|_, c| c.speaker_id != user_id);
        }
        state.profile(user_id)
    }

    async fn attendance_stats(&self) -> Result<AttendanceStats> {
        let state = self.state.read().await;
        let attending = state.users.iter().filter(|u| u.is_attending).count();
        Ok(AttendanceStats::new(state.users.len() as i64, attending as i64))
    }

    async fn user_overviews(&self) -> Result<Vec<UserOverview>> {
        let state = self.state.read().await;
        let overviews = state
            .users
            .iter()
            .map(|user| {
                let titles = state
                    .conferences
                    .values()
                    .filter(|c| c.speaker_id == user.id)
                    .map(|c| c.title.clone())
                    .collect();
                UserOverview::new(user.clone(), titles)
            })
            .collect();
        Ok(overviews)
    }

    async fn list_time_slots(&self) -> Result<Vec<TimeSlotDetail>> {
        let state = self.state.read().await;
        let mut slots: Vec<&TimeSlot> = state.time_slots.values().collect();
        slots.sort_by_key(|s| (s.start_time, s.id));
        Ok(slots.into_iter().map(|s| state.slot_detail(s)).collect())
    }

    async fn time_slot(&self, id: i32) -> Result<Option<TimeSlotDetail>> {
        let state = self.state.read().await;
        Ok(state.time_slots.get(&id).map(|s| state.slot_detail(s)))
    }

    async fn create_time_slot(&self, new_slot: NewTimeSlot) -> Result<TimeSlot> {
        rules::check_window(new_slot.start_time, new_slot.end_time)?;
        let mut state = self.state.write().await;
        state.last_slot_id += 1;
        let slot = TimeSlot {
            id: state.last_slot_id,
            title: new_slot.title,
            start_time: new_slot.start_time,
            end_time: new_slot.end_time,
            kind: new_slot.kind,
            created_at: Utc::now(),
        };
        state.time_slots.insert(slot.id, slot.clone());
        Ok(slot)
    }

    async fn update_time_slot(&self, id: i32, changes: TimeSlotChanges) -> Result<TimeSlotDetail> {
        let mut state = self.state.write().await;
        let slot = state.slot(id)?;
        rules::check_slot_edit(
            slot,
            state.occupant(id),
            changes.start_time,
            changes.end_time,
            changes.kind,
        )?;

        let mut updated = slot.clone();
        if let Some(title) = changes.title {
            updated.title = title;
        }
        updated.start_time = changes.start_time.unwrap_or(updated.start_time);
        updated.end_time = changes.end_time.unwrap_or(updated.end_time);
        updated.kind = changes.kind.unwrap_or(updated.kind);

        let detail = state.slot_detail(&updated);
        state.time_slots.insert(id, updated);
        Ok(detail)
    }

    async fn delete_time_slot(&self, id: i32) -> Result<()> {
        let mut state = self.state.write().await;
        state.slot(id)?;
        rules::check_slot_deletable(state.occupant(id))?;
        state.time_slots.remove(&id);
        Ok(())
    }

    async fn list_conferences(&self) -> Result<Vec<ConferenceDetail>> {
        let state = self.state.read().await;
        state
            .conferences
            .keys()
            .rev()
            .map(|id| state.conference_detail(*id))
            .collect()
    }

    async fn find_conference(&self, id: i32) -> Result<Option<Conference>> {
        Ok(self.state.read().await.conferences.get(&id).cloned())
    }

    async fn create_conference(&self, new_conference: NewConference) -> Result<ConferenceDetail> {
        let mut state = self.state.write().await;
        state.user_mut(&new_conference.speaker_id)?;
        let existing = state
            .conferences
            .values()
            .find(|c| c.speaker_id == new_conference.speaker_id);
        rules::check_speaker_free(existing)?;
        if let Some(slot_id) = new_conference.time_slot_id {
            rules::check_slot_assignable(state.slot(slot_id)?, state.occupant(slot_id), None)?;
        }

        state.last_conference_id += 1;
        let conference = Conference {
            id: state.last_conference_id,
            title: new_conference.title,
            description: new_conference.description,
            speaker_id: new_conference.speaker_id,
            time_slot_id: new_conference.time_slot_id,
            created_at: Utc::now(),
        };
        let id = conference.id;
        state.user_mut(&conference.speaker_id)?.wants_to_speak = true;
        state.conferences.insert(id, conference);
        state.conference_detail(id)
    }

    async fn update_conference(&self, id: i32, changes: ConferenceChanges) -> Result<ConferenceDetail> {
        let mut state = self.state.write().await;
        if !state.conferences.contains_key(&id) {
            return Err(AppError::not_found("conference not found"));
        }
        if let Some(Some(slot_id)) = changes.time_slot_id {
            rules::check_slot_assignable(state.slot(slot_id)?, state.occupant(slot_id), Some(id))?;
        }

        let conference = state
            .conferences
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("conference not found"))?;
        if let Some(title) = changes.title {
            conference.title = title;
        }
        if let Some(description) = changes.description {
            conference.description = description;
        }
        if let Some(time_slot_id) = changes.time_slot_id {
            conference.time_slot_id = time_slot_id;
        }
        state.conference_detail(id)
    }

    async fn delete_conference(&self, id: i32) -> Result<()> {
        let mut state = self.state.write().await;
        let conference = state
            .conferences
            .remove(&id)
            .ok_or_else(|| AppError::not_found("conference not found"))?;
        if let Ok(speaker) = state.user_mut(&conference.speaker_id) {
            speaker.wants_to_speak = false;
        }
        Ok(())
    }
}
