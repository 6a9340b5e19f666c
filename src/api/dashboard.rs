use crate::{
    api::{current_session, today},
    auth::auth::AuthUser,
    coordinator::Coordinator,
    dashboard::{dashboard, department_overview},
    error::ApiError,
};
use actix_web::{HttpResponse, Responder, web};

/// Today's attendance at a glance
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Today's totals, per-department stats and recent activity", body = Dashboard)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn show_dashboard(
    auth: AuthUser,
    coordinator: web::Data<Coordinator>,
) -> Result<impl Responder, ApiError> {
    let session = current_session(&coordinator, &auth)?;
    let workspace = session.workspace()?;
    let board = dashboard(&workspace.student_values(), &workspace.record_values(), today());
    Ok(HttpResponse::Ok().json(board))
}

/// Students per department and year
#[utoipa::path(
    get,
    path = "/api/departments",
    responses(
        (status = 200, description = "Department overview", body = DepartmentOverview)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn departments(
    auth: AuthUser,
    coordinator: web::Data<Coordinator>,
) -> Result<impl Responder, ApiError> {
    let session = current_session(&coordinator, &auth)?;
    let overview = department_overview(&session.workspace()?.student_values());
    Ok(HttpResponse::Ok().json(overview))
}
