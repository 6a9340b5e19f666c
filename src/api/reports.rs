use crate::{
    api::{current_session, today},
    auth::auth::AuthUser,
    coordinator::{Coordinator, Session},
    error::ApiError,
    export::{export_filename, report_csv},
    reports::{self, Report, ReportFilter, ReportKind},
};
use actix_web::{
    HttpResponse, Responder,
    http::header::{ContentDisposition, DispositionParam, DispositionType},
    web,
};
use tracing::{error, info};

fn build_report(session: &Session, kind: ReportKind, filter: &ReportFilter) -> Result<Report, ApiError> {
    let workspace = session.workspace()?;
    Ok(reports::build(kind, filter, &workspace.student_values(), &workspace.record_values()))
}

/// Attendance report as JSON
#[utoipa::path(
    get,
    path = "/api/reports/{kind}",
    params(
        ("kind" = ReportKind, Path, description = "summary, student or detailed"),
        ReportFilter
    ),
    responses(
        (status = 200, description = "Report tagged with its kind", body = Object, example = json!({
            "kind": "summary",
            "data": {
                "total_classes": 12,
                "total_students": 40,
                "present": 401,
                "absent": 52,
                "late": 27,
                "attendance_rate": 89
            }
        })),
        (status = 404, description = "Unknown report kind")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reports"
)]
pub async fn report(
    auth: AuthUser,
    coordinator: web::Data<Coordinator>,
    kind: web::Path<ReportKind>,
    filter: web::Query<ReportFilter>,
) -> Result<impl Responder, ApiError> {
    let session = current_session(&coordinator, &auth)?;
    let report = build_report(&session, kind.into_inner(), &filter)?;
    Ok(HttpResponse::Ok().json(report))
}

/// Attendance report as a CSV download
#[utoipa::path(
    get,
    path = "/api/reports/{kind}/csv",
    params(
        ("kind" = ReportKind, Path, description = "summary, student or detailed"),
        ReportFilter
    ),
    responses(
        (status = 200, description = "CSV attachment named GASC_Attendance_Report_<date>.csv", body = String, content_type = "text/csv"),
        (status = 404, description = "Unknown report kind")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reports"
)]
pub async fn report_csv_download(
    auth: AuthUser,
    coordinator: web::Data<Coordinator>,
    kind: web::Path<ReportKind>,
    filter: web::Query<ReportFilter>,
) -> Result<impl Responder, ApiError> {
    let session = current_session(&coordinator, &auth)?;
    let kind = kind.into_inner();
    let report = build_report(&session, kind, &filter)?;

    let body = report_csv(&report).map_err(|e| {
        error!(error = %e, %kind, "CSV export failed");
        ApiError::Internal
    })?;
    let filename = export_filename(today());
    info!(%kind, %filename, bytes = body.len(), "Report exported");

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(body))
}
