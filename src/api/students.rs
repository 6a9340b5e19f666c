use crate::{
    api::current_session,
    auth::auth::AuthUser,
    coordinator::Coordinator,
    error::ApiError,
    model::student::{NewStudent, StudentUpdate},
};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StudentQuery {
    /// Case-insensitive match on name or roll number
    pub search: Option<String>,
    pub department: Option<String>,
}

/// List students
#[utoipa::path(
    get,
    path = "/api/students",
    params(StudentQuery),
    responses(
        (status = 200, description = "Students, newest first, each with its sync state", body = [Student]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
pub async fn list_students(
    auth: AuthUser,
    coordinator: web::Data<Coordinator>,
    query: web::Query<StudentQuery>,
) -> Result<impl Responder, ApiError> {
    let session = current_session(&coordinator, &auth)?;
    let search = query.search.as_deref().map(str::trim).unwrap_or_default();
    let department = query.department.as_deref().filter(|d| !d.is_empty());

    let students: Vec<_> = session
        .workspace()?
        .students()
        .filter(|s| department.is_none_or(|d| s.value.department == d))
        .filter(|s| search.is_empty() || s.value.matches_search(search))
        .cloned()
        .collect();
    let total = students.len();
    debug!(total, search, "Listing students");

    Ok(HttpResponse::Ok().json(json!({
        "data": students,
        "total": total
    })))
}

/// Add a student
#[utoipa::path(
    post,
    path = "/api/students",
    request_body = NewStudent,
    responses(
        (status = 201, description = "Student added", body = Student),
        (status = 400, description = "Invalid form", body = Object, example = json!({
            "message": "roll_number must not be empty"
        })),
        (status = 502, description = "Backend rejected the insert")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
pub async fn create_student(
    auth: AuthUser,
    coordinator: web::Data<Coordinator>,
    payload: web::Json<NewStudent>,
) -> Result<impl Responder, ApiError> {
    let session = current_session(&coordinator, &auth)?;
    let draft = payload.into_inner();
    draft.validate().map_err(ApiError::BadRequest)?;

    let student = coordinator.add_student(&session, draft).await?;
    info!(student_id = %student.id, roll_number = %student.roll_number, "Student added");

    Ok(HttpResponse::Created().json(student))
}

/// Update a student
#[utoipa::path(
    put,
    path = "/api/students/{id}",
    params(
        ("id" = String, Path, description = "Student id")
    ),
    request_body = StudentUpdate,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 400, description = "No fields to update"),
        (status = 404, description = "Student not found"),
        (status = 409, description = "A change to this student is still being saved")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
pub async fn update_student(
    auth: AuthUser,
    coordinator: web::Data<Coordinator>,
    path: web::Path<Uuid>,
    payload: web::Json<StudentUpdate>,
) -> Result<impl Responder, ApiError> {
    let session = current_session(&coordinator, &auth)?;
    let id = path.into_inner();
    let update = payload.into_inner();

    if update.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let student = coordinator.update_student(&session, id, update).await?;
    Ok(HttpResponse::Ok().json(student))
}

/// Delete a student and its attendance
#[utoipa::path(
    delete,
    path = "/api/students/{id}",
    params(
        ("id" = String, Path, description = "Student id")
    ),
    responses(
        (status = 200, description = "Student deleted", body = Object, example = json!({
            "message": "Student deleted successfully"
        })),
        (status = 404, description = "Student not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
pub async fn delete_student(
    auth: AuthUser,
    coordinator: web::Data<Coordinator>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let session = current_session(&coordinator, &auth)?;
    let id = path.into_inner();

    coordinator.delete_student(&session, id).await?;
    info!(student_id = %id, "Student deleted");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Student deleted successfully"
    })))
}
