use crate::{
    api::{current_session, today, wall_clock},
    auth::auth::AuthUser,
    coordinator::Coordinator,
    error::ApiError,
    marking::attendance_sheet,
    model::attendance::{AttendanceUpdate, Status},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SheetQuery {
    /// Defaults to today
    #[param(value_type = Option<String>, format = Date)]
    pub date: Option<NaiveDate>,
    pub department: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkRequest {
    #[schema(value_type = String, format = "uuid")]
    pub student_id: Uuid,
    /// Defaults to today
    #[schema(example = "2026-07-14", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    pub status: Status,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkMarkRequest {
    #[schema(example = "2026-07-14", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    /// Only students of this department; all when missing
    #[schema(example = "BCA")]
    pub department: Option<String>,
    pub status: Status,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnnotateRequest {
    /// Empty string clears the remarks
    pub remarks: Option<String>,
    #[schema(example = "16:30:00", value_type = Option<String>)]
    pub time_out: Option<NaiveTime>,
}

impl AnnotateRequest {
    fn into_update(self) -> Option<AttendanceUpdate> {
        if self.remarks.is_none() && self.time_out.is_none() {
            return None;
        }
        Some(AttendanceUpdate {
            remarks: self
                .remarks
                .map(|r| Some(r.trim().to_string()).filter(|r| !r.is_empty())),
            time_out: self.time_out.map(Some),
            ..Default::default()
        })
    }
}

fn department_filter(department: &Option<String>) -> Option<&str> {
    department.as_deref().filter(|d| !d.is_empty())
}

/// Attendance sheet for a date
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(SheetQuery),
    responses(
        (status = 200, description = "Students of the department with their record for the date", body = [SheetRow]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn sheet(
    auth: AuthUser,
    coordinator: web::Data<Coordinator>,
    query: web::Query<SheetQuery>,
) -> Result<impl Responder, ApiError> {
    let session = current_session(&coordinator, &auth)?;
    let date = query.date.unwrap_or_else(today);

    let rows = attendance_sheet(&*session.workspace()?, date, department_filter(&query.department));
    Ok(HttpResponse::Ok().json(rows))
}

/// Mark one student
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = MarkRequest,
    responses(
        (status = 200, description = "Record created or updated", body = AttendanceRecord),
        (status = 404, description = "Student not found"),
        (status = 409, description = "Attendance for this slot is still being saved"),
        (status = 502, description = "Backend rejected the write")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn mark(
    auth: AuthUser,
    coordinator: web::Data<Coordinator>,
    payload: web::Json<MarkRequest>,
) -> Result<impl Responder, ApiError> {
    let session = current_session(&coordinator, &auth)?;
    let request = payload.into_inner();
    let date = request.date.unwrap_or_else(today);

    let record = coordinator
        .mark(&session, request.student_id, date, request.status, wall_clock())
        .await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Mark every unmarked student of a department
#[utoipa::path(
    post,
    path = "/api/attendance/bulk",
    request_body = BulkMarkRequest,
    responses(
        (status = 200, description = "Counts of marked, skipped and failed students", body = BulkOutcome)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn bulk_mark(
    auth: AuthUser,
    coordinator: web::Data<Coordinator>,
    payload: web::Json<BulkMarkRequest>,
) -> Result<impl Responder, ApiError> {
    let session = current_session(&coordinator, &auth)?;
    let request = payload.into_inner();
    let date = request.date.unwrap_or_else(today);

    let outcome = coordinator
        .bulk_mark(
            &session,
            date,
            department_filter(&request.department),
            request.status,
            wall_clock(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Set remarks or time-out on a record
#[utoipa::path(
    patch,
    path = "/api/attendance/{id}",
    params(
        ("id" = String, Path, description = "Attendance record id")
    ),
    request_body = AnnotateRequest,
    responses(
        (status = 200, description = "Record updated", body = AttendanceRecord),
        (status = 400, description = "No fields to update"),
        (status = 404, description = "Record not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn annotate(
    auth: AuthUser,
    coordinator: web::Data<Coordinator>,
    path: web::Path<Uuid>,
    payload: web::Json<AnnotateRequest>,
) -> Result<impl Responder, ApiError> {
    let session = current_session(&coordinator, &auth)?;
    let update = payload
        .into_inner()
        .into_update()
        .ok_or_else(|| ApiError::BadRequest("No fields to update".to_string()))?;

    let record = coordinator
        .annotate(&session, path.into_inner(), update)
        .await?;
    Ok(HttpResponse::Ok().json(record))
}
