use actix_web::web;
use async_trait::async_trait;
use diesel::{prelude::*, r2d2};

use super::Store;
use crate::actions;
use crate::error::Result;
use crate::models::{
    AttendanceStats, Conference, ConferenceChanges, ConferenceDetail, NewConference, NewTimeSlot, NewUser,
    Profile, ProfileChanges, TimeSlot, TimeSlotChanges, TimeSlotDetail, User, UserOverview,
};

pub type DbPool = r2d2::Pool<r2d2::ConnectionManager<PgConnection>>;

pub fn initialize_db_pool(database_url: &str, max_size: u32) -> std::result::Result<DbPool, r2d2::PoolError> {
    let manager = r2d2::ConnectionManager::<PgConnection>::new(database_url);
    r2d2::Pool::builder().max_size(max_size).build(manager)
}

/// Runs each operation from `actions` on the blocking pool with a pooled
/// connection.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, action: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        web::block(move || {
            let mut conn = pool.get()?;
            action(&mut conn)
        })
        .await?
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user(&self, id: &str) -> Result<Option<User>> {
        let id = id.to_owned();
        self.run(move |conn| actions::find_user(conn, &id)).await
    }

    async fn provision_user(&self, new_user: NewUser) -> Result<User> {
        self.run(move |conn| actions::provision_user(conn, &new_user)).await
    }

    async fn profile(&self, user_id: &str) -> Result<Profile> {
        let user_id = user_id.to_owned();
        self.run(move |conn| actions::profile(conn, &user_id)).await
    }

    async fn update_profile(&self, user_id: &str, changes: ProfileChanges) -> Result<Profile> {
        let user_id = user_id.to_owned();
        self.run(move |conn| actions::update_profile(conn, &user_id, &changes)).await
    }

    async fn attendance_stats(&self) -> Result<AttendanceStats> {
        self.run(actions::attendance_stats).await
    }

    async fn user_overviews(&self) -> Result<Vec<UserOverview>> {
        self.run(actions::user_overviews).await
    }

    async fn list_time_slots(&self) -> Result<Vec<TimeSlotDetail>> {
        self.run(actions::list_time_slots).await
    }

    async fn time_slot(&self, id: i32) -> Result<Option<TimeSlotDetail>> {
        self.run(move |conn| actions::time_slot(conn, id)).await
    }

    async fn create_time_slot(&self, new_slot: NewTimeSlot) -> Result<TimeSlot> {
        self.run(move |conn| actions::create_time_slot(conn, &new_slot)).await
    }

    async fn update_time_slot(&self, id: i32, changes: TimeSlotChanges) -> Result<TimeSlotDetail> {
        self.run(move |conn| actions::update_time_slot(conn, id, &changes)).await
    }

    async fn delete_time_slot(&self, id: i32) -> Result<()> {
        self.run(move |conn| actions::delete_time_slot(conn, id)).await
    }

    async fn list_conferences(&self) -> Result<Vec<ConferenceDetail>> {
        self.run(actions::list_conferences).await
    }

    async fn find_conference(&self, id: i32) -> Result<Option<Conference>> {
        self.run(move |conn| actions::find_conference(conn, id)).await
    }

    async fn create_conference(&self, new_conference: NewConference) -> Result<ConferenceDetail> {
        self.run(move |conn| actions::create_conference(conn, &new_conference)).await
    }

    async fn update_conference(&self, id: i32, changes: ConferenceChanges) -> Result<ConferenceDetail> {
        self.run(move |conn| actions::update_conference(conn, id, &changes)).await
    }

    async fn delete_conference(&self, id: i32) -> Result<()> {
        self.run(move |conn| actions::delete_conference(conn, id)).await
    }
}
