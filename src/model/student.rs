use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, ToSchema,
)]
pub enum Year {
    #[serde(rename = "I Year")]
    #[strum(serialize = "I Year")]
    First,
    #[serde(rename = "II Year")]
    #[strum(serialize = "II Year")]
    Second,
    #[serde(rename = "III Year")]
    #[strum(serialize = "III Year")]
    Third,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": "0b7d4c1a-5a0e-4f0c-a1f7-3e2d9f1c6b20",
        "user_id": "6f1c1e7e-2f7a-4a43-9d0c-7d1c2b0e7a11",
        "name": "Arun Kumar",
        "roll_number": "23CS014",
        "department": "B.Sc. Computer Science",
        "email": "arun@example.com",
        "phone": "9876543210",
        "year": "II Year",
        "created_at": "2026-06-01T09:00:00Z",
        "updated_at": "2026-06-01T09:00:00Z"
    })
)]
pub struct Student {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,

    #[schema(value_type = String, format = "uuid")]
    pub user_id: Uuid,

    #[schema(example = "Arun Kumar")]
    pub name: String,

    #[schema(example = "23CS014")]
    pub roll_number: String,

    #[schema(example = "B.Sc. Computer Science")]
    pub department: String,

    #[schema(example = "arun@example.com")]
    pub email: String,

    #[schema(example = "9876543210")]
    pub phone: String,

    pub year: Year,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,

    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

/// Student form as submitted by staff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NewStudent {
    #[schema(example = "Arun Kumar")]
    pub name: String,
    #[schema(example = "23CS014")]
    pub roll_number: String,
    #[schema(example = "B.Sc. Computer Science")]
    pub department: String,
    #[schema(example = "arun@example.com", format = "email")]
    pub email: String,
    #[schema(example = "9876543210")]
    pub phone: String,
    pub year: Year,
}

impl NewStudent {
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("name", &self.name),
            ("roll_number", &self.roll_number),
            ("department", &self.department),
            ("email", &self.email),
            ("phone", &self.phone),
        ];
        match fields.iter().find(|(_, v)| v.trim().is_empty()) {
            Some((field, _)) => Err(format!("{field} must not be empty")),
            None => Ok(()),
        }
    }
}

/// Insert payload for the `students` table.
#[derive(Debug, Clone, Serialize)]
pub struct StudentInsert {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub student: NewStudent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StudentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<Year>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date-time")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StudentUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.roll_number.is_none()
            && self.department.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.year.is_none()
    }
}

impl Student {
    pub fn from_draft(id: Uuid, user_id: Uuid, draft: &NewStudent, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            name: draft.name.clone(),
            roll_number: draft.roll_number.clone(),
            department: draft.department.clone(),
            email: draft.email.clone(),
            phone: draft.phone.clone(),
            year: draft.year,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: &StudentUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(roll_number) = &update.roll_number {
            self.roll_number = roll_number.clone();
        }
        if let Some(department) = &update.department {
            self.department = department.clone();
        }
        if let Some(email) = &update.email {
            self.email = email.clone();
        }
        if let Some(phone) = &update.phone {
            self.phone = phone.clone();
        }
        if let Some(year) = update.year {
            self.year = year;
        }
        if let Some(updated_at) = update.updated_at {
            self.updated_at = updated_at;
        }
    }

    /// Case-insensitive match on name or roll number.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term) || self.roll_number.to_lowercase().contains(&term)
    }
}
