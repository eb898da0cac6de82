//! Persistence seam. Handlers only see `dyn Store`; the server picks the
//! Postgres store when a database URL is configured and the in-memory one
//! otherwise.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{initialize_db_pool, DbPool, PgStore};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    AttendanceStats, Conference, ConferenceChanges, ConferenceDetail, NewConference, NewTimeSlot, NewUser,
    Profile, ProfileChanges, TimeSlot, TimeSlotChanges, TimeSlotDetail, User, UserOverview,
};

/// Mutations that touch the slot/conference pairing check the assignment
/// rules and write in one atomic step. Missing rows come back as
/// `AppError::NotFound`, rule failures as `AppError::Validation`.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user(&self, id: &str) -> Result<Option<User>>;

    /// Inserts a user on first sign-in. Returns the stored row if another
    /// request provisioned it first.
    async fn provision_user(&self, new_user: NewUser) -> Result<User>;

    async fn profile(&self, user_id: &str) -> Result<Profile>;

    /// Applies attendance and speaking flags. Opting out of speaking also
    /// deletes the user's conferences.
    async fn update_profile(&self, user_id: &str, changes: ProfileChanges) -> Result<Profile>;

    async fn attendance_stats(&self) -> Result<AttendanceStats>;

    async fn user_overviews(&self) -> Result<Vec<UserOverview>>;

    async fn list_time_slots(&self) -> Result<Vec<TimeSlotDetail>>;

    async fn time_slot(&self, id: i32) -> Result<Option<TimeSlotDetail>>;

    async fn create_time_slot(&self, new_slot: NewTimeSlot) -> Result<TimeSlot>;

    async fn update_time_slot(&self, id: i32, changes: TimeSlotChanges) -> Result<TimeSlotDetail>;

    async fn delete_time_slot(&self, id: i32) -> Result<()>;

    async fn list_conferences(&self) -> Result<Vec<ConferenceDetail>>;

    async fn find_conference(&self, id: i32) -> Result<Option<Conference>>;

    /// Creates the speaker's only conference and marks them as wanting to speak.
    async fn create_conference(&self, new_conference: NewConference) -> Result<ConferenceDetail>;

    async fn update_conference(&self, id: i32, changes: ConferenceChanges) -> Result<ConferenceDetail>;

    /// Deletes the conference and resets its speaker's `wants_to_speak`.
    async fn delete_conference(&self, id: i32) -> Result<()>;
}
