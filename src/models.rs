use crate::schema::{conferences, time_slots, users};
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::{
    deserialize::{self, FromSql},
    pg::{Pg, PgValue},
    prelude::*,
    serialize::{self, Output, ToSql},
    sql_types::Text,
};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = crate::schema::sql_types::UserRole)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
}

impl ToSql<crate::schema::sql_types::UserRole, Pg> for Role {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        let s = match *self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        };
        <str as ToSql<Text, Pg>>::to_sql(s, out)
    }
}

impl FromSql<crate::schema::sql_types::UserRole, Pg> for Role {
    fn from_sql(bytes: PgValue) -> deserialize::Result<Self> {
        match <String as FromSql<Text, Pg>>::from_sql(bytes)?.as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            s => Err(format!("Unrecognized user role: {}", s).into()),
        }
    }
}

/// Which days of the weekend an attendee is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = crate::schema::sql_types::AttendanceDays)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceDays {
    None,
    Day1,
    Day2,
    Both,
}

impl ToSql<crate::schema::sql_types::AttendanceDays, Pg> for AttendanceDays {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        let s = match *self {
            AttendanceDays::None => "NONE",
            AttendanceDays::Day1 => "DAY1",
            AttendanceDays::Day2 => "DAY2",
            AttendanceDays::Both => "BOTH",
        };
        <str as ToSql<Text, Pg>>::to_sql(s, out)
    }
}

impl FromSql<crate::schema::sql_types::AttendanceDays, Pg> for AttendanceDays {
    fn from_sql(bytes: PgValue) -> deserialize::Result<Self> {
        match <String as FromSql<Text, Pg>>::from_sql(bytes)?.as_str() {
            "NONE" => Ok(AttendanceDays::None),
            "DAY1" => Ok(AttendanceDays::Day1),
            "DAY2" => Ok(AttendanceDays::Day2),
            "BOTH" => Ok(AttendanceDays::Both),
            s => Err(format!("Unrecognized attendance days: {}", s).into()),
        }
    }
}

/// What a time slot is used for. Only `Conference` slots can host a talk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = crate::schema::sql_types::SlotKind)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotKind {
    Conference,
    Meal,
    Break,
    Other,
}

impl ToSql<crate::schema::sql_types::SlotKind, Pg> for SlotKind {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        let s = match *self {
            SlotKind::Conference => "CONFERENCE",
            SlotKind::Meal => "MEAL",
            SlotKind::Break => "BREAK",
            SlotKind::Other => "OTHER",
        };
        <str as ToSql<Text, Pg>>::to_sql(s, out)
    }
}

impl FromSql<crate::schema::sql_types::SlotKind, Pg> for SlotKind {
    fn from_sql(bytes: PgValue) -> deserialize::Result<Self> {
        match <String as FromSql<Text, Pg>>::from_sql(bytes)?.as_str() {
            "CONFERENCE" => Ok(SlotKind::Conference),
            "MEAL" => Ok(SlotKind::Meal),
            "BREAK" => Ok(SlotKind::Break),
            "OTHER" => Ok(SlotKind::Other),
            s => Err(format!("Unrecognized slot kind: {}", s).into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Serialize)]
#[diesel(table_name = users)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
    pub wants_to_speak: bool,
    pub is_attending: bool,
    pub attendance_days: AttendanceDays,
    pub sleeps_on_site: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A user seen for the first time. Every flag starts at its column default.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
}

impl NewUser {
    pub fn into_user(self, created_at: DateTime<Utc>) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role,
            wants_to_speak: false,
            is_attending: false,
            attendance_days: AttendanceDays::None,
            sleeps_on_site: false,
            created_at,
        }
    }
}

/// Partial profile update. Doubles as the body of `PATCH /api/user/profile`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, AsChangeset)]
#[diesel(table_name = users)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChanges {
    pub wants_to_speak: Option<bool>,
    pub is_attending: Option<bool>,
    pub attendance_days: Option<AttendanceDays>,
    pub sleeps_on_site: Option<bool>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.wants_to_speak.is_none()
            && self.is_attending.is_none()
            && self.attendance_days.is_none()
            && self.sleeps_on_site.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Serialize)]
#[diesel(table_name = time_slots)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: i32,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub kind: SlotKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = time_slots)]
pub struct NewTimeSlot {
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub kind: SlotKind,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = time_slots)]
pub struct TimeSlotChanges {
    pub title: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub kind: Option<SlotKind>,
}

impl TimeSlotChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.start_time.is_none() && self.end_time.is_none() && self.kind.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Serialize)]
#[diesel(table_name = conferences)]
#[serde(rename_all = "camelCase")]
pub struct Conference {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub speaker_id: String,
    pub time_slot_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = conferences)]
pub struct NewConference {
    pub title: String,
    pub description: Option<String>,
    pub speaker_id: String,
    pub time_slot_id: Option<i32>,
}

/// `Some(None)` clears a nullable column, `None` leaves it untouched.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = conferences)]
pub struct ConferenceChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub time_slot_id: Option<Option<i32>>,
}

impl ConferenceChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.time_slot_id.is_none()
    }
}

// Response models for API

#[derive(Debug, Clone, PartialEq, Queryable, Serialize)]
pub struct SpeakerSummary {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
}

impl From<&User> for SpeakerSummary {
    fn from(user: &User) -> Self {
        SpeakerSummary {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceDetail {
    #[serde(flatten)]
    pub conference: Conference,
    pub speaker: SpeakerSummary,
    pub time_slot: Option<TimeSlot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignedConference {
    #[serde(flatten)]
    pub conference: Conference,
    pub speaker: SpeakerSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlotDetail {
    #[serde(flatten)]
    pub slot: TimeSlot,
    pub conference: Option<AssignedConference>,
    pub is_available: bool,
}

impl TimeSlotDetail {
    pub fn new(slot: TimeSlot, conference: Option<AssignedConference>) -> Self {
        let is_available = slot.kind == SlotKind::Conference && conference.is_none();
        TimeSlotDetail {
            slot,
            conference,
            is_available,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerConference {
    #[serde(flatten)]
    pub conference: Conference,
    pub time_slot: Option<TimeSlot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    pub user: User,
    pub conferences: Vec<SpeakerConference>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOverview {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
    pub is_attending: bool,
    pub attendance_days: AttendanceDays,
    pub sleeps_on_site: bool,
    pub wants_to_speak: bool,
    pub is_speaker: bool,
    pub conferences_count: usize,
    pub conference_titles: Vec<String>,
}

impl UserOverview {
    pub fn new(user: User, conference_titles: Vec<String>) -> Self {
        UserOverview {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            is_attending: user.is_attending,
            attendance_days: user.attendance_days,
            sleeps_on_site: user.sleeps_on_site,
            wants_to_speak: user.wants_to_speak,
            is_speaker: !conference_titles.is_empty(),
            conferences_count: conference_titles.len(),
            conference_titles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    pub total_users: i64,
    pub attending_users: i64,
    pub attending_rate: i64,
}

impl AttendanceStats {
    pub fn new(total_users: i64, attending_users: i64) -> Self {
        let attending_rate = if total_users == 0 {
            0
        } else {
            (attending_users as f64 * 100.0 / total_users as f64).round() as i64
        };
        AttendanceStats {
            total_users,
            attending_users,
            attending_rate,
        }
    }
}

// Request models for API

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimeSlotRequest {
    pub title: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub kind: Option<SlotKind>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTimeSlotRequest {
    pub title: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub kind: Option<SlotKind>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConferenceRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_slot_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConferenceRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub time_slot_id: Option<Option<i32>>,
}

/// Distinguishes an explicit `null` from an absent field.
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Accepts RFC 3339, the `datetime-local` form and the plain SQL form.
/// Zone-less inputs are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}
