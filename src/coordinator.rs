//! Owns the signed-in sessions and drives every mutation through the
//! workspace and the backend.
//!
//! A mutation is begun on the workspace while it is locked, sent to the
//! backend with the lock released, then committed or reverted under the lock
//! again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use futures::future::{join_all, try_join};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::backend::Backend;
use crate::error::{BackendError, SyncError};
use crate::marking::{attendance_sheet, bulk_targets};
use crate::model::{
    attendance::{AttendanceRecord, AttendanceUpdate, Status},
    student::{NewStudent, Student, StudentInsert, StudentUpdate},
    user::UserProfile,
};
use crate::store::{Confirmed, RecordWrite, SlotKey, Ticket, Workspace};

pub struct Session {
    pub id: String,
    pub profile: UserProfile,
    pub expires_at: DateTime<Utc>,
    access_token: String,
    workspace: Mutex<Workspace>,
}

impl Session {
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn workspace(&self) -> Result<MutexGuard<'_, Workspace>, SyncError> {
        self.workspace
            .lock()
            .map_err(|_| SyncError::Poisoned("workspace"))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Result of a bulk mark.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct BulkOutcome {
    /// Records created for previously unmarked students.
    pub marked: usize,
    /// Students in the filter that already had a record or were still
    /// being added.
    pub skipped: usize,
    pub failed: usize,
}

pub struct Coordinator {
    backend: Arc<dyn Backend>,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl Coordinator {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    fn registry(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Arc<Session>>>, SyncError> {
        self.sessions
            .read()
            .map_err(|_| SyncError::Poisoned("session registry"))
    }

    fn registry_mut(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Arc<Session>>>, SyncError> {
        self.sessions
            .write()
            .map_err(|_| SyncError::Poisoned("session registry"))
    }

    /// Registers a session and loads its roster and attendance.
    pub async fn open_session(
        &self,
        id: String,
        profile: UserProfile,
        access_token: String,
        expires_at: DateTime<Utc>,
    ) -> Result<Arc<Session>, SyncError> {
        let (students, attendance) = try_join(
            self.backend.list_students(&access_token),
            self.backend.list_attendance(&access_token),
        )
        .await?;
        debug!(students = students.len(), records = attendance.len(), "Workspace loaded");

        let mut workspace = Workspace::default();
        workspace.load(students, attendance);

        let session = Arc::new(Session {
            id: id.clone(),
            profile,
            expires_at,
            access_token,
            workspace: Mutex::new(workspace),
        });

        let now = Utc::now();
        let mut sessions = self.registry_mut()?;
        sessions.retain(|_, s| !s.is_expired(now));
        sessions.insert(id, session.clone());
        info!(session = %session.id, user = %session.profile.username, "Session opened");

        Ok(session)
    }

    /// Live session by id. An expired session is dropped on lookup.
    pub fn session(&self, id: &str) -> Result<Option<Arc<Session>>, SyncError> {
        let Some(found) = self.registry()?.get(id).cloned() else {
            return Ok(None);
        };

        if found.is_expired(Utc::now()) {
            self.registry_mut()?.remove(id);
            return Ok(None);
        }
        Ok(Some(found))
    }

    /// Forgets the session and signs it out at the backend.
    pub async fn close_session(&self, id: &str) -> Result<(), SyncError> {
        let removed = self.registry_mut()?.remove(id);

        match removed {
            Some(session) => {
                info!(session = %session.id, "Session closed");
                Ok(self.backend.sign_out(session.access_token()).await?)
            }
            None => Ok(()),
        }
    }

    /// Reloads both collections from the backend, dropping local state.
    pub async fn refresh(&self, session: &Session) -> Result<(), SyncError> {
        let (students, attendance) = try_join(
            self.backend.list_students(session.access_token()),
            self.backend.list_attendance(session.access_token()),
        )
        .await
        .inspect_err(|e| error!(error = %e, session = %session.id, "Refresh failed"))?;

        session.workspace()?.load(students, attendance);
        Ok(())
    }

    pub async fn add_student(
        &self,
        session: &Session,
        draft: NewStudent,
    ) -> Result<Student, SyncError> {
        let owner = session.profile.id;
        let ticket = session.workspace()?.begin_add_student(owner, &draft, Utc::now());

        let row = StudentInsert {
            user_id: owner,
            student: draft,
        };
        let outcome = self.backend.insert_student(session.access_token(), &row).await;
        settle(session, ticket, outcome, |s: &Student| Confirmed::Student(s.clone()), "add student")
    }

    pub async fn update_student(
        &self,
        session: &Session,
        id: Uuid,
        mut update: StudentUpdate,
    ) -> Result<Student, SyncError> {
        update.updated_at = Some(Utc::now());
        let ticket = session.workspace()?.begin_update_student(id, &update)?;

        let outcome = self
            .backend
            .update_student(session.access_token(), id, &update)
            .await;
        settle(session, ticket, outcome, |s: &Student| Confirmed::Student(s.clone()), "update student")
    }

    /// Deletes the student; its attendance goes with it.
    pub async fn delete_student(&self, session: &Session, id: Uuid) -> Result<(), SyncError> {
        let ticket = session.workspace()?.begin_delete_student(id)?;

        let outcome = self.backend.delete_student(session.access_token(), id).await;
        settle(session, ticket, outcome, |_| Confirmed::Deleted, "delete student")
    }

    /// Sets the status of one (student, date) slot.
    pub async fn mark(
        &self,
        session: &Session,
        student_id: Uuid,
        date: NaiveDate,
        status: Status,
        now: NaiveTime,
    ) -> Result<AttendanceRecord, SyncError> {
        let slot = SlotKey::new(student_id, date);
        let (ticket, write) = session
            .workspace()?
            .begin_mark(session.profile.id, slot, status, now)?;

        let outcome = self.send(session.access_token(), &write).await;
        settle(session, ticket, outcome, confirm_record, "mark attendance")
    }

    /// Marks every unmarked student of the filter with `status`. Students who
    /// already have a record for `date` are left as they are.
    pub async fn bulk_mark(
        &self,
        session: &Session,
        date: NaiveDate,
        department: Option<&str>,
        status: Status,
        now: NaiveTime,
    ) -> Result<BulkOutcome, SyncError> {
        let mut outcome = BulkOutcome::default();

        let planned: Vec<(Ticket, RecordWrite)> = {
            let mut workspace = session.workspace()?;
            let targets = bulk_targets(&workspace, date, department);
            outcome.skipped = attendance_sheet(&workspace, date, department).len() - targets.len();

            targets
                .into_iter()
                .filter_map(|student_id| {
                    let slot = SlotKey::new(student_id, date);
                    workspace
                        .begin_mark(session.profile.id, slot, status, now)
                        .inspect_err(|e| warn!(error = %e, %student_id, "Skipped in bulk mark"))
                        .ok()
                })
                .collect()
        };

        let token = session.access_token();
        let results = join_all(planned.iter().map(|(_, write)| self.send(token, write))).await;

        let mut workspace = session.workspace()?;
        for ((ticket, _), result) in planned.into_iter().zip(results) {
            match result {
                Ok(record) => {
                    workspace.commit(ticket, Confirmed::Record(record));
                    outcome.marked += 1;
                }
                Err(e) => {
                    error!(error = %e, session = %session.id, "Bulk mark write failed, reverted");
                    workspace.revert(ticket);
                    outcome.failed += 1;
                }
            }
        }

        info!(
            %date,
            department = department.unwrap_or("all"),
            marked = outcome.marked,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "Bulk mark finished"
        );
        Ok(outcome)
    }

    /// Changes fields of an existing record, e.g. remarks or time-out.
    pub async fn annotate(
        &self,
        session: &Session,
        record_id: Uuid,
        update: AttendanceUpdate,
    ) -> Result<AttendanceRecord, SyncError> {
        let ticket = session.workspace()?.begin_update_record(record_id, &update)?;

        let outcome = self
            .backend
            .update_attendance(session.access_token(), record_id, &update)
            .await;
        settle(session, ticket, outcome, confirm_record, "update attendance")
    }

    async fn send(
        &self,
        access_token: &str,
        write: &RecordWrite,
    ) -> Result<AttendanceRecord, BackendError> {
        match write {
            RecordWrite::Insert(row) => self.backend.insert_attendance(access_token, row).await,
            RecordWrite::Update { id, update } => {
                self.backend
                    .update_attendance(access_token, *id, update)
                    .await
            }
        }
    }
}

fn confirm_record(record: &AttendanceRecord) -> Confirmed {
    Confirmed::Record(record.clone())
}

/// Commits the ticket on success; reverts and logs on failure.
fn settle<T>(
    session: &Session,
    ticket: Ticket,
    outcome: Result<T, BackendError>,
    confirm: impl FnOnce(&T) -> Confirmed,
    action: &str,
) -> Result<T, SyncError> {
    match outcome {
        Ok(value) => {
            session.workspace()?.commit(ticket, confirm(&value));
            Ok(value)
        }
        Err(e) => {
            error!(error = %e, session = %session.id, action, "Backend write failed, reverted");
            session.workspace()?.revert(ticket);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, SignUpMetadata};
    use crate::model::{role::Role, student::Year};
    use crate::store::{StoreError, SyncStatus};
    use chrono::Duration;

    fn draft(name: &str, department: &str) -> NewStudent {
        NewStudent {
            name: name.into(),
            roll_number: format!("R-{name}"),
            department: department.into(),
            email: format!("{name}@example.com"),
            phone: "9000000000".into(),
            year: Year::First,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 14).unwrap()
    }

    fn nine() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 5, 30).unwrap()
    }

    async fn signed_in() -> (Arc<MemoryBackend>, Coordinator, Arc<Session>) {
        let backend = Arc::new(MemoryBackend::new());
        let metadata = SignUpMetadata {
            username: "meena".into(),
            full_name: "Meena R".into(),
            role: Role::Teacher,
            department: "BCA".into(),
        };
        backend.sign_up("meena@gasc.edu", "secret1", &metadata).await.unwrap();
        let auth = backend.sign_in("meena@gasc.edu", "secret1").await.unwrap();
        let profile = backend
            .fetch_profile(&auth.access_token, auth.user_id)
            .await
            .unwrap()
            .unwrap();

        let coordinator = Coordinator::new(backend.clone());
        let session = coordinator
            .open_session(
                "s-1".into(),
                profile,
                auth.access_token,
                Utc::now() + Duration::hours(1),
            )
            .await
            .unwrap();
        (backend, coordinator, session)
    }

    #[actix_web::test]
    async fn marking_twice_keeps_one_record() {
        let (backend, coordinator, session) = signed_in().await;
        let student = coordinator
            .add_student(&session, draft("asha", "BCA"))
            .await
            .unwrap();

        let first = coordinator
            .mark(&session, student.id, date(), Status::Present, nine())
            .await
            .unwrap();
        assert_eq!(first.time_in, NaiveTime::from_hms_opt(9, 5, 0));

        let second = coordinator
            .mark(&session, student.id, date(), Status::Absent, nine())
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.time_in, None);
        assert_eq!(backend.attendance_count(), 1);
        assert_eq!(session.workspace().unwrap().attendance().count(), 1);
    }

    #[actix_web::test]
    async fn bulk_mark_only_touches_unmarked_students() {
        let (backend, coordinator, session) = signed_in().await;
        let a = coordinator.add_student(&session, draft("asha", "BCA")).await.unwrap();
        let b = coordinator.add_student(&session, draft("bala", "BCA")).await.unwrap();
        coordinator.add_student(&session, draft("chitra", "BCA")).await.unwrap();
        coordinator.add_student(&session, draft("devi", "BBA")).await.unwrap();

        coordinator
            .mark(&session, a.id, date(), Status::Absent, nine())
            .await
            .unwrap();

        let outcome = coordinator
            .bulk_mark(&session, date(), Some("BCA"), Status::Present, nine())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            BulkOutcome {
                marked: 2,
                skipped: 1,
                failed: 0
            }
        );
        assert_eq!(backend.attendance_count(), 3);

        let workspace = session.workspace().unwrap();
        let kept = workspace.record_for(SlotKey::new(a.id, date())).unwrap();
        assert_eq!(kept.value.status, Status::Absent);
        let marked = workspace.record_for(SlotKey::new(b.id, date())).unwrap();
        assert_eq!(marked.value.status, Status::Present);
        assert_eq!(marked.sync, SyncStatus::Committed);
    }

    #[actix_web::test]
    async fn rejected_write_reverts_and_reports() {
        let (backend, coordinator, session) = signed_in().await;
        let student = coordinator
            .add_student(&session, draft("asha", "BCA"))
            .await
            .unwrap();

        backend.reject_writes(true);
        let err = coordinator
            .mark(&session, student.id, date(), Status::Present, nine())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Backend(BackendError::Api { status: 503, .. })));
        assert!(session
            .workspace()
            .unwrap()
            .record_for(SlotKey::new(student.id, date()))
            .is_none());

        let err = coordinator
            .update_student(
                &session,
                student.id,
                StudentUpdate {
                    name: Some("Asha K".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Backend(_)));
        let entry = session.workspace().unwrap().student(student.id).cloned().unwrap();
        assert_eq!(entry.value.name, "asha");
        assert_eq!(entry.sync, SyncStatus::Failed);
    }

    #[actix_web::test]
    async fn delete_cascades_locally_and_remotely() {
        let (backend, coordinator, session) = signed_in().await;
        let a = coordinator.add_student(&session, draft("asha", "BCA")).await.unwrap();
        let b = coordinator.add_student(&session, draft("bala", "BCA")).await.unwrap();
        coordinator
            .bulk_mark(&session, date(), None, Status::Late, nine())
            .await
            .unwrap();

        coordinator.delete_student(&session, a.id).await.unwrap();

        assert_eq!(backend.student_count(), 1);
        assert_eq!(backend.attendance_count(), 1);
        let workspace = session.workspace().unwrap();
        assert!(workspace.student(a.id).is_none());
        assert!(workspace.attendance().all(|r| r.value.student_id == b.id));
    }

    #[actix_web::test]
    async fn unknown_student_is_a_store_error() {
        let (_, coordinator, session) = signed_in().await;
        let stranger = Uuid::new_v4();
        let err = coordinator
            .mark(&session, stranger, date(), Status::Present, nine())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Store(StoreError::StudentNotFound(id)) if id == stranger));
    }

    #[actix_web::test]
    async fn refresh_picks_up_rows_written_elsewhere() {
        let (backend, coordinator, session) = signed_in().await;
        let row = StudentInsert {
            user_id: session.profile.id,
            student: draft("asha", "BCA"),
        };
        backend
            .insert_student(session.access_token(), &row)
            .await
            .unwrap();
        assert_eq!(session.workspace().unwrap().students().count(), 0);

        coordinator.refresh(&session).await.unwrap();
        assert_eq!(session.workspace().unwrap().students().count(), 1);
    }

    #[actix_web::test]
    async fn closed_session_signs_out_at_the_backend() {
        let (backend, coordinator, session) = signed_in().await;
        assert!(coordinator.session(&session.id).unwrap().is_some());
        coordinator.close_session(&session.id).await.unwrap();
        assert!(coordinator.session(&session.id).unwrap().is_none());

        let err = backend.list_students(session.access_token()).await.unwrap_err();
        assert!(matches!(err, BackendError::Unauthorized(_)));
    }

    #[actix_web::test]
    async fn expired_session_is_dropped_on_lookup() {
        let (backend, coordinator, session) = signed_in().await;
        let auth = backend.sign_in("meena@gasc.edu", "secret1").await.unwrap();
        coordinator
            .open_session(
                "s-2".into(),
                session.profile.clone(),
                auth.access_token,
                Utc::now() - Duration::seconds(1),
            )
            .await
            .unwrap();

        assert!(coordinator.session("s-2").unwrap().is_none());
        assert!(coordinator.session(&session.id).unwrap().is_some());
    }

    #[actix_web::test]
    async fn student_being_added_is_not_bulk_marked() {
        let (backend, coordinator, session) = signed_in().await;
        let a = coordinator.add_student(&session, draft("asha", "BCA")).await.unwrap();
        let _adding = session
            .workspace()
            .unwrap()
            .begin_add_student(session.profile.id, &draft("bala", "BCA"), Utc::now());

        let outcome = coordinator
            .bulk_mark(&session, date(), Some("BCA"), Status::Present, nine())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            BulkOutcome {
                marked: 1,
                skipped: 1,
                failed: 0
            }
        );
        assert_eq!(backend.attendance_count(), 1);
        let workspace = session.workspace().unwrap();
        assert!(workspace.attendance().all(|r| r.value.student_id == a.id));
    }

    #[actix_web::test]
    async fn poisoned_locks_fail_without_panicking() {
        let (_, coordinator, session) = signed_in().await;
        let student = coordinator
            .add_student(&session, draft("asha", "BCA"))
            .await
            .unwrap();

        let holder = session.clone();
        let _ = std::thread::spawn(move || {
            let _guard = holder.workspace.lock().unwrap();
            panic!("panicked while holding the workspace");
        })
        .join();

        let err = coordinator
            .mark(&session, student.id, date(), Status::Present, nine())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Poisoned("workspace")));

        std::thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = coordinator.sessions.write().unwrap();
                    panic!("panicked while holding the registry");
                })
                .join();
        });
        assert!(matches!(
            coordinator.session(&session.id),
            Err(SyncError::Poisoned("session registry"))
        ));
    }
}
