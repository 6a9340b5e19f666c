use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use super::{AuthSession, Backend, SignUpMetadata};
use crate::error::BackendError;
use crate::model::{
    attendance::{AttendanceInsert, AttendanceRecord, AttendanceUpdate},
    student::{Student, StudentInsert, StudentUpdate},
    user::UserProfile,
};

const STUDENTS: &str = "students";
const ATTENDANCE: &str = "attendance_records";
const PROFILES: &str = "user_profiles";

/// Attendance rows are always read with their student embedded.
const ATTENDANCE_SELECT: &str = "*,student:students(*)";

/// PostgREST media type for "exactly one row"; zero rows comes back as 406.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// REST client for the hosted backend (GoTrue auth + PostgREST tables).
#[derive(Clone)]
pub struct SupabaseClient {
    base_url: String,
    anon_key: String,
    http: Client,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: TokenUser,
}

#[derive(Deserialize)]
struct TokenUser {
    id: Uuid,
    email: Option<String>,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self, BackendError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            http,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// Adds the project key and the caller's bearer token.
    fn authed(&self, request: RequestBuilder, access_token: &str) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
    }

    /// Write that reads back exactly one row.
    fn single_row(&self, request: RequestBuilder, access_token: &str) -> RequestBuilder {
        self.authed(request, access_token)
            .header("Prefer", "return=representation")
            .header("Accept", SINGLE_OBJECT)
    }
}

fn eq(id: Uuid) -> String {
    format!("eq.{id}")
}

/// Pulls the human-readable message out of a backend error body.
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error_description", "msg", "error"] {
            if let Some(message) = value.get(key).and_then(Value::as_str) {
                return message.to_string();
            }
        }
    }

    let body = body.trim();
    if body.is_empty() {
        "unknown backend error".to_string()
    } else {
        body.to_string()
    }
}

async fn check(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), body = %body, "Backend rejected request");

    Err(match status {
        StatusCode::NOT_ACCEPTABLE | StatusCode::NOT_FOUND => BackendError::NotFound,
        StatusCode::UNAUTHORIZED => BackendError::Unauthorized(error_message(&body)),
        _ => BackendError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        },
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let response = check(response).await?;
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
}

#[async_trait]
impl Backend for SupabaseClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let response = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        // bad credentials come back as 400 from the token endpoint
        let token: TokenResponse = match read_json(response).await {
            Err(BackendError::Api { status: 400, message }) => {
                return Err(BackendError::Unauthorized(message));
            }
            other => other?,
        };

        Ok(AuthSession {
            access_token: token.access_token,
            user_id: token.user.id,
            email: token.user.email,
        })
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<(), BackendError> {
        let response = self
            .http
            .post(self.auth_url("signup"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let response = self
            .authed(self.http.post(self.auth_url("logout")), access_token)
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    async fn fetch_profile(
        &self,
        access_token: &str,
        user_id: Uuid,
    ) -> Result<Option<UserProfile>, BackendError> {
        let response = self
            .authed(self.http.get(self.table_url(PROFILES)), access_token)
            .query(&[("select", "*".to_string()), ("id", eq(user_id))])
            .send()
            .await?;

        let mut rows: Vec<UserProfile> = read_json(response).await?;
        Ok(rows.pop())
    }

    async fn list_students(&self, access_token: &str) -> Result<Vec<Student>, BackendError> {
        let response = self
            .authed(self.http.get(self.table_url(STUDENTS)), access_token)
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await?;

        read_json(response).await
    }

    async fn insert_student(
        &self,
        access_token: &str,
        row: &StudentInsert,
    ) -> Result<Student, BackendError> {
        let response = self
            .single_row(self.http.post(self.table_url(STUDENTS)), access_token)
            .query(&[("select", "*")])
            .json(row)
            .send()
            .await?;

        read_json(response).await
    }

    async fn update_student(
        &self,
        access_token: &str,
        id: Uuid,
        update: &StudentUpdate,
    ) -> Result<Student, BackendError> {
        let response = self
            .single_row(self.http.patch(self.table_url(STUDENTS)), access_token)
            .query(&[("select", "*".to_string()), ("id", eq(id))])
            .json(update)
            .send()
            .await?;

        read_json(response).await
    }

    async fn delete_student(&self, access_token: &str, id: Uuid) -> Result<(), BackendError> {
        let response = self
            .single_row(self.http.delete(self.table_url(STUDENTS)), access_token)
            .query(&[("select", "id".to_string()), ("id", eq(id))])
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    async fn list_attendance(
        &self,
        access_token: &str,
    ) -> Result<Vec<AttendanceRecord>, BackendError> {
        let response = self
            .authed(self.http.get(self.table_url(ATTENDANCE)), access_token)
            .query(&[("select", ATTENDANCE_SELECT), ("order", "created_at.desc")])
            .send()
            .await?;

        read_json(response).await
    }

    async fn insert_attendance(
        &self,
        access_token: &str,
        row: &AttendanceInsert,
    ) -> Result<AttendanceRecord, BackendError> {
        let response = self
            .single_row(self.http.post(self.table_url(ATTENDANCE)), access_token)
            .query(&[("select", ATTENDANCE_SELECT)])
            .json(row)
            .send()
            .await?;

        read_json(response).await
    }

    async fn update_attendance(
        &self,
        access_token: &str,
        id: Uuid,
        update: &AttendanceUpdate,
    ) -> Result<AttendanceRecord, BackendError> {
        let response = self
            .single_row(self.http.patch(self.table_url(ATTENDANCE)), access_token)
            .query(&[("select", ATTENDANCE_SELECT.to_string()), ("id", eq(id))])
            .json(update)
            .send()
            .await?;

        read_json(response).await
    }
}
