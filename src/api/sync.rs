use crate::{api::current_session, auth::auth::AuthUser, coordinator::Coordinator, error::ApiError};
use actix_web::{HttpResponse, Responder, web};
use serde_json::json;

/// Reload roster and attendance from the backend
#[utoipa::path(
    post,
    path = "/api/sync",
    responses(
        (status = 200, description = "Workspace reloaded", body = Object, example = json!({
            "message": "Synced",
            "students": 40,
            "records": 480
        })),
        (status = 502, description = "Backend unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Sync"
)]
pub async fn sync(
    auth: AuthUser,
    coordinator: web::Data<Coordinator>,
) -> Result<impl Responder, ApiError> {
    let session = current_session(&coordinator, &auth)?;
    coordinator.refresh(&session).await?;

    let workspace = session.workspace()?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Synced",
        "students": workspace.students().count(),
        "records": workspace.attendance().count()
    })))
}
