//! Access to the hosted backend: auth endpoints plus the three tables.
//!
//! Every call is a single request. Nothing is retried or batched; failures
//! carry the backend's message back to the caller.

#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::error::BackendError;
use crate::model::{
    attendance::{AttendanceInsert, AttendanceRecord, AttendanceUpdate},
    role::Role,
    student::{Student, StudentInsert, StudentUpdate},
    user::UserProfile,
};

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryBackend;
pub use rest::SupabaseClient;

/// Result of a password sign-in.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub user_id: Uuid,
    pub email: Option<String>,
}

/// Metadata stored with a new account; the backend derives the
/// `user_profiles` row from it.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpMetadata {
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub department: String,
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<(), BackendError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;

    async fn fetch_profile(
        &self,
        access_token: &str,
        user_id: Uuid,
    ) -> Result<Option<UserProfile>, BackendError>;

    /// All visible students, newest first.
    async fn list_students(&self, access_token: &str) -> Result<Vec<Student>, BackendError>;

    async fn insert_student(
        &self,
        access_token: &str,
        row: &StudentInsert,
    ) -> Result<Student, BackendError>;

    async fn update_student(
        &self,
        access_token: &str,
        id: Uuid,
        update: &StudentUpdate,
    ) -> Result<Student, BackendError>;

    async fn delete_student(&self, access_token: &str, id: Uuid) -> Result<(), BackendError>;

    /// All visible attendance records with their student embedded, newest first.
    async fn list_attendance(
        &self,
        access_token: &str,
    ) -> Result<Vec<AttendanceRecord>, BackendError>;

    async fn insert_attendance(
        &self,
        access_token: &str,
        row: &AttendanceInsert,
    ) -> Result<AttendanceRecord, BackendError>;

    async fn update_attendance(
        &self,
        access_token: &str,
        id: Uuid,
        update: &AttendanceUpdate,
    ) -> Result<AttendanceRecord, BackendError>;
}
