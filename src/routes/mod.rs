//! HTTP surface under `/api`.

use actix_web::{error, web, HttpResponse};
use serde::Serialize;

use crate::error::{AppError, ErrorBody};

mod admin;
mod conferences;
mod profile;
mod timeslots;

#[derive(Debug, Serialize)]
struct Message {
    message: String,
}

impl Message {
    fn new(message: &str) -> Self {
        Message {
            message: message.to_string(),
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config()).app_data(path_config()).service(
        web::scope("/api")
            .service(timeslots::list_time_slots)
            .service(timeslots::create_time_slot)
            .service(timeslots::get_time_slot)
            .service(timeslots::update_time_slot)
            .service(timeslots::delete_time_slot)
            .service(conferences::list_conferences)
            .service(conferences::create_conference)
            .service(conferences::update_conference)
            .service(conferences::delete_conference)
            .service(profile::get_profile)
            .service(profile::update_profile)
            .service(admin::stats)
            .service(admin::users),
    );
}

/// Malformed bodies, including unknown enum values, become 400s in the
/// usual error shape. Oversized bodies are 413.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = match err {
            error::JsonPayloadError::ContentType => HttpResponse::UnsupportedMediaType().json(ErrorBody {
                error: "expected a JSON body".to_string(),
            }),
            error::JsonPayloadError::Overflow { .. } | error::JsonPayloadError::OverflowKnownLength { .. } => {
                HttpResponse::PayloadTooLarge().json(ErrorBody { error: err.to_string() })
            }
            error::JsonPayloadError::Deserialize(ref e) => HttpResponse::BadRequest().json(ErrorBody {
                error: e.to_string(),
            }),
            _ => HttpResponse::BadRequest().json(ErrorBody { error: err.to_string() }),
        };
        error::InternalError::from_response(err, response).into()
    })
}

/// An id that does not parse cannot name an existing row.
fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::NotFound().json(ErrorBody {
            error: "not found".to_string(),
        });
        error::InternalError::from_response(err, response).into()
    })
}

/// Trims a submitted text field, treating blank input as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_time(raw: Option<String>, field: &str) -> Result<Option<chrono::DateTime<chrono::Utc>>, AppError> {
    match non_blank(raw) {
        None => Ok(None),
        Some(raw) => crate::models::parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| AppError::validation(format!("{} is not a valid timestamp", field))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn oversized_bodies_are_payload_too_large() {
        let app = test::init_service(App::new().app_data(json_config().limit(16)).route(
            "/echo",
            web::post().to(|body: web::Json<serde_json::Value>| async move { HttpResponse::Ok().json(body.into_inner()) }),
        ))
        .await;

        let req = test::TestRequest::post()
            .uri("/echo")
            .set_json(serde_json::json!({"title": "well past the sixteen byte limit"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string());

        let req = test::TestRequest::post()
            .uri("/echo")
            .set_json(serde_json::json!({"a": 1}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[::core::prelude::v1::test]
    fn blank_text_is_absent() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(Some(" Bees ".to_string())), Some("Bees".to_string()));
    }

    #[::core::prelude::v1::test]
    fn rejects_unparseable_times() {
        assert!(parse_time(Some("tomorrow".to_string()), "startTime").is_err());
        assert_eq!(parse_time(Some(" ".to_string()), "startTime").unwrap(), None);
        assert!(parse_time(Some("2025-07-05T09:00".to_string()), "startTime").unwrap().is_some());
    }
}
