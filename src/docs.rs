use crate::api::attendance::{AnnotateRequest, BulkMarkRequest, MarkRequest};
use crate::coordinator::BulkOutcome;
use crate::dashboard::{
    Activity, Dashboard, DepartmentCard, DepartmentOverview, DepartmentToday, YearCount,
};
use crate::marking::{MarkState, SheetRow};
use crate::model::attendance::{AttendanceRecord, Status};
use crate::model::role::Role;
use crate::model::student::{NewStudent, Student, StudentUpdate, Year};
use crate::model::user::UserProfile;
use crate::models::{LoginReqDto, LoginResponse, SignUpReqDto};
use crate::reports::{DepartmentReportRow, ReportKind, StudentReportRow, SummaryReport};
use crate::store::SyncStatus;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "GASC Attendance API",
        version = "1.0.0",
        description = r#"
## College Attendance Management

Staff sign in with their username, manage the student roster, mark daily
attendance and pull reports.

### Key Features
- **Students**: add, edit, delete and search the roster
- **Attendance**: per-date sheet by department, single and bulk marking,
  remarks and time-out
- **Reports**: summary, student-wise and department-wise, as JSON or CSV
- **Dashboard**: today's attendance and the department overview

### Security
Everything under `/api` needs the session token returned by `/auth/login`
as `Authorization: Bearer <token>`.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::signup,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::sync::sync,

        crate::api::students::list_students,
        crate::api::students::create_student,
        crate::api::students::update_student,
        crate::api::students::delete_student,

        crate::api::attendance::sheet,
        crate::api::attendance::mark,
        crate::api::attendance::bulk_mark,
        crate::api::attendance::annotate,

        crate::api::reports::report,
        crate::api::reports::report_csv_download,

        crate::api::dashboard::show_dashboard,
        crate::api::dashboard::departments
    ),
    components(
        schemas(
            LoginReqDto,
            SignUpReqDto,
            LoginResponse,
            UserProfile,
            Role,
            Student,
            NewStudent,
            StudentUpdate,
            Year,
            AttendanceRecord,
            Status,
            SheetRow,
            MarkState,
            SyncStatus,
            MarkRequest,
            BulkMarkRequest,
            AnnotateRequest,
            BulkOutcome,
            ReportKind,
            SummaryReport,
            StudentReportRow,
            DepartmentReportRow,
            Dashboard,
            DepartmentToday,
            Activity,
            DepartmentOverview,
            DepartmentCard,
            YearCount
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Sign-in, sign-up and session APIs"),
        (name = "Students", description = "Student roster APIs"),
        (name = "Attendance", description = "Attendance marking APIs"),
        (name = "Reports", description = "Attendance reports and CSV export"),
        (name = "Dashboard", description = "Dashboard and department overview"),
        (name = "Sync", description = "Reload data from the backend"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
