//! In-process backend with the same observable rules as the hosted one:
//! one attendance row per (student, date), cascading student deletes and
//! token-scoped access. Used by the HTTP tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{AuthSession, Backend, SignUpMetadata};
use crate::error::BackendError;
use crate::model::{
    attendance::{AttendanceInsert, AttendanceRecord, AttendanceUpdate},
    student::{Student, StudentInsert, StudentUpdate},
    user::UserProfile,
};

struct Account {
    password: String,
    profile: UserProfile,
}

#[derive(Default)]
struct Tables {
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, Uuid>,
    // newest first, like `order=created_at.desc`
    students: Vec<Student>,
    attendance: Vec<AttendanceRecord>,
}

#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<Tables>,
    reject_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every insert/update/delete fail until switched back.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn student_count(&self) -> usize {
        self.tables().students.len()
    }

    pub fn attendance_count(&self) -> usize {
        self.tables().attendance.len()
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory backend poisoned")
    }

    fn guard_write(&self) -> Result<(), BackendError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Api {
                status: 503,
                message: "backend unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl Tables {
    fn user_for(&self, access_token: &str) -> Result<Uuid, BackendError> {
        self.tokens
            .get(access_token)
            .copied()
            .ok_or_else(|| BackendError::Unauthorized("JWT expired".to_string()))
    }

    fn joined(&self, record: &AttendanceRecord) -> AttendanceRecord {
        let mut record = record.clone();
        record.student = self
            .students
            .iter()
            .find(|s| s.id == record.student_id)
            .cloned();
        record
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let mut tables = self.tables();
        let user_id = match tables.accounts.get(email) {
            Some(account) if account.password == password => account.profile.id,
            _ => {
                return Err(BackendError::Unauthorized(
                    "Invalid login credentials".to_string(),
                ));
            }
        };

        let access_token = format!("mem-{}", Uuid::new_v4());
        tables.tokens.insert(access_token.clone(), user_id);

        Ok(AuthSession {
            access_token,
            user_id,
            email: Some(email.to_string()),
        })
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<(), BackendError> {
        let mut tables = self.tables();
        if tables.accounts.contains_key(email) {
            return Err(BackendError::Api {
                status: 422,
                message: "User already registered".to_string(),
            });
        }

        let now = Utc::now();
        let profile = UserProfile {
            id: Uuid::new_v4(),
            username: metadata.username.clone(),
            full_name: metadata.full_name.clone(),
            role: metadata.role,
            department: metadata.department.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                profile,
            },
        );
        Ok(())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        self.tables().tokens.remove(access_token);
        Ok(())
    }

    async fn fetch_profile(
        &self,
        access_token: &str,
        user_id: Uuid,
    ) -> Result<Option<UserProfile>, BackendError> {
        let tables = self.tables();
        tables.user_for(access_token)?;
        Ok(tables
            .accounts
            .values()
            .find(|a| a.profile.id == user_id)
            .map(|a| a.profile.clone()))
    }

    async fn list_students(&self, access_token: &str) -> Result<Vec<Student>, BackendError> {
        let tables = self.tables();
        tables.user_for(access_token)?;
        Ok(tables.students.clone())
    }

    async fn insert_student(
        &self,
        access_token: &str,
        row: &StudentInsert,
    ) -> Result<Student, BackendError> {
        self.guard_write()?;
        let mut tables = self.tables();
        tables.user_for(access_token)?;

        let student = Student::from_draft(Uuid::new_v4(), row.user_id, &row.student, Utc::now());
        tables.students.insert(0, student.clone());
        Ok(student)
    }

    async fn update_student(
        &self,
        access_token: &str,
        id: Uuid,
        update: &StudentUpdate,
    ) -> Result<Student, BackendError> {
        self.guard_write()?;
        let mut tables = self.tables();
        tables.user_for(access_token)?;

        let student = tables
            .students
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(BackendError::NotFound)?;
        student.apply(update);
        Ok(student.clone())
    }

    async fn delete_student(&self, access_token: &str, id: Uuid) -> Result<(), BackendError> {
        self.guard_write()?;
        let mut tables = self.tables();
        tables.user_for(access_token)?;

        let before = tables.students.len();
        tables.students.retain(|s| s.id != id);
        if tables.students.len() == before {
            return Err(BackendError::NotFound);
        }
        // attendance_records.student_id references students on delete cascade
        tables.attendance.retain(|r| r.student_id != id);
        Ok(())
    }

    async fn list_attendance(
        &self,
        access_token: &str,
    ) -> Result<Vec<AttendanceRecord>, BackendError> {
        let tables = self.tables();
        tables.user_for(access_token)?;
        Ok(tables.attendance.iter().map(|r| tables.joined(r)).collect())
    }

    async fn insert_attendance(
        &self,
        access_token: &str,
        row: &AttendanceInsert,
    ) -> Result<AttendanceRecord, BackendError> {
        self.guard_write()?;
        let mut tables = self.tables();
        tables.user_for(access_token)?;

        if !tables.students.iter().any(|s| s.id == row.student_id) {
            return Err(BackendError::Api {
                status: 409,
                message: "insert or update on table \"attendance_records\" violates foreign key constraint".to_string(),
            });
        }
        if tables
            .attendance
            .iter()
            .any(|r| r.student_id == row.student_id && r.date == row.date)
        {
            return Err(BackendError::Api {
                status: 409,
                message: "duplicate key value violates unique constraint \"attendance_records_student_id_date_key\"".to_string(),
            });
        }

        let record = AttendanceRecord::from_insert(Uuid::new_v4(), row, Utc::now());
        tables.attendance.insert(0, record.clone());
        Ok(tables.joined(&record))
    }

    async fn update_attendance(
        &self,
        access_token: &str,
        id: Uuid,
        update: &AttendanceUpdate,
    ) -> Result<AttendanceRecord, BackendError> {
        self.guard_write()?;
        let mut tables = self.tables();
        tables.user_for(access_token)?;

        let record = tables
            .attendance
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(BackendError::NotFound)?;
        record.apply(update);
        let record = record.clone();
        Ok(tables.joined(&record))
    }
}
