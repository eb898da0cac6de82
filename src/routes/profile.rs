use actix_web::{get, patch, web, HttpResponse, Responder};
use serde_json::json;

use crate::error::AppError;
use crate::models::ProfileChanges;
use crate::session::CurrentUser;
use crate::store::Store;

#[get("/user/profile")]
pub async fn get_profile(CurrentUser(user): CurrentUser, store: web::Data<dyn Store>) -> actix_web::Result<impl Responder> {
    let profile = store.profile(&user.id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[patch("/user/profile")]
pub async fn update_profile(
    CurrentUser(user): CurrentUser,
    store: web::Data<dyn Store>,
    form: web::Json<ProfileChanges>,
) -> actix_web::Result<impl Responder> {
    let changes = form.into_inner();
    if changes.is_empty() {
        return Err(AppError::validation("no profile field to update").into());
    }

    let message = match changes.wants_to_speak {
        Some(true) => "you are now registered as a speaker",
        Some(false) => "you are no longer registered as a speaker",
        None => "profile updated",
    };
    let profile = store.update_profile(&user.id, changes).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": message,
        "user": profile,
    })))
}
