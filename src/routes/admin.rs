use actix_web::{get, web, HttpResponse, Responder};

use crate::session::AdminUser;
use crate::store::Store;

#[get("/admin/stats")]
pub async fn stats(_admin: AdminUser, store: web::Data<dyn Store>) -> actix_web::Result<impl Responder> {
    let stats = store.attendance_stats().await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[get("/admin/users")]
pub async fn users(_admin: AdminUser, store: web::Data<dyn Store>) -> actix_web::Result<impl Responder> {
    let users = store.user_overviews().await?;
    Ok(HttpResponse::Ok().json(users))
}
