use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use serde_json::json;

use super::{non_blank, parse_time, Message};
use crate::error::AppError;
use crate::models::{CreateTimeSlotRequest, NewTimeSlot, SlotKind, TimeSlotChanges, UpdateTimeSlotRequest};
use crate::session::AdminUser;
use crate::store::Store;

#[get("/timeslots")]
pub async fn list_time_slots(store: web::Data<dyn Store>) -> actix_web::Result<impl Responder> {
    let slots = store.list_time_slots().await?;
    Ok(HttpResponse::Ok().json(slots))
}

#[post("/timeslots")]
pub async fn create_time_slot(
    AdminUser(admin): AdminUser,
    store: web::Data<dyn Store>,
    form: web::Json<CreateTimeSlotRequest>,
) -> actix_web::Result<impl Responder> {
    let form = form.into_inner();
    let title = non_blank(form.title);
    let start_time = parse_time(form.start_time, "startTime")?;
    let end_time = parse_time(form.end_time, "endTime")?;

    let (Some(title), Some(start_time), Some(end_time)) = (title, start_time, end_time) else {
        return Err(AppError::validation("title, start time and end time are required").into());
    };

    let slot = store
        .create_time_slot(NewTimeSlot {
            title,
            start_time,
            end_time,
            kind: form.kind.unwrap_or(SlotKind::Conference),
        })
        .await?;
    log::info!("admin {} created time slot {} ({:?})", admin.id, slot.id, slot.kind);

    Ok(HttpResponse::Created().json(json!({
        "message": "time slot created",
        "timeSlot": slot,
    })))
}

#[get("/timeslots/{id}")]
pub async fn get_time_slot(store: web::Data<dyn Store>, path: web::Path<i32>) -> actix_web::Result<impl Responder> {
    let slot = store
        .time_slot(path.into_inner())
        .await?
        .ok_or_else(|| AppError::not_found("time slot not found"))?;
    Ok(HttpResponse::Ok().json(slot))
}

#[patch("/timeslots/{id}")]
pub async fn update_time_slot(
    AdminUser(admin): AdminUser,
    store: web::Data<dyn Store>,
    path: web::Path<i32>,
    form: web::Json<UpdateTimeSlotRequest>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();
    let form = form.into_inner();

    if form.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::validation("title must not be empty").into());
    }
    let changes = TimeSlotChanges {
        title: non_blank(form.title),
        start_time: parse_time(form.start_time, "startTime")?,
        end_time: parse_time(form.end_time, "endTime")?,
        kind: form.kind,
    };

    let slot = store.update_time_slot(id, changes).await?;
    log::info!("admin {} updated time slot {}", admin.id, id);

    Ok(HttpResponse::Ok().json(json!({
        "message": "time slot updated",
        "timeSlot": slot,
    })))
}

#[delete("/timeslots/{id}")]
pub async fn delete_time_slot(
    AdminUser(admin): AdminUser,
    store: web::Data<dyn Store>,
    path: web::Path<i32>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();
    store.delete_time_slot(id).await?;
    log::info!("admin {} deleted time slot {}", admin.id, id);
    Ok(HttpResponse::Ok().json(Message::new("time slot deleted")))
}
