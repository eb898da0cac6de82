use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use serde_json::json;

use super::{non_blank, Message};
use crate::error::AppError;
use crate::models::{Conference, ConferenceChanges, CreateConferenceRequest, NewConference, UpdateConferenceRequest, User};
use crate::session::CurrentUser;
use crate::store::Store;

/// Loads the conference and checks that `user` may change it.
async fn owned_conference(store: &dyn Store, id: i32, user: &User, denied: &str) -> Result<Conference, AppError> {
    let conference = store
        .find_conference(id)
        .await?
        .ok_or_else(|| AppError::not_found("conference not found"))?;
    if conference.speaker_id != user.id && !user.is_admin() {
        return Err(AppError::forbidden(denied));
    }
    Ok(conference)
}

#[get("/conferences")]
pub async fn list_conferences(store: web::Data<dyn Store>) -> actix_web::Result<impl Responder> {
    let conferences = store.list_conferences().await?;
    Ok(HttpResponse::Ok().json(conferences))
}

#[post("/conferences")]
pub async fn create_conference(
    CurrentUser(user): CurrentUser,
    store: web::Data<dyn Store>,
    form: web::Json<CreateConferenceRequest>,
) -> actix_web::Result<impl Responder> {
    let form = form.into_inner();
    let title = non_blank(form.title).ok_or_else(|| AppError::validation("title is required"))?;

    let conference = store
        .create_conference(NewConference {
            title,
            description: non_blank(form.description),
            speaker_id: user.id.clone(),
            time_slot_id: form.time_slot_id,
        })
        .await?;
    log::info!("user {} proposed conference {}", user.id, conference.conference.id);

    Ok(HttpResponse::Created().json(json!({
        "message": "conference created",
        "conference": conference,
    })))
}

#[patch("/conferences/{id}")]
pub async fn update_conference(
    CurrentUser(user): CurrentUser,
    store: web::Data<dyn Store>,
    path: web::Path<i32>,
    form: web::Json<UpdateConferenceRequest>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();
    owned_conference(store.get_ref(), id, &user, "access denied").await?;

    let form = form.into_inner();
    if form.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::validation("title is required").into());
    }
    let changes = ConferenceChanges {
        title: non_blank(form.title),
        description: form.description.map(non_blank),
        time_slot_id: form.time_slot_id,
    };

    let conference = store.update_conference(id, changes).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "conference updated",
        "conference": conference,
    })))
}

#[delete("/conferences/{id}")]
pub async fn delete_conference(
    CurrentUser(user): CurrentUser,
    store: web::Data<dyn Store>,
    path: web::Path<i32>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();
    let conference = owned_conference(store.get_ref(), id, &user, "you can only delete your own conferences").await?;

    store.delete_conference(id).await?;
    log::info!("user {} deleted conference {} of speaker {}", user.id, id, conference.speaker_id);
    Ok(HttpResponse::Ok().json(Message::new("conference deleted")))
}
