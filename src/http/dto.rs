//! JSON shapes of the CRUD API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::employee::{Employee, EmployeeInput};

/// Request body of `POST /employees` and `PUT /employees/:id`.
///
/// Fields are optional here so that a missing field is reported as a
/// validation message rather than a deserialization failure. Any `id` in
/// the body is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeBody {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub birthday: Option<NaiveDate>,
    #[serde(default)]
    pub hobbies: Vec<String>,
}

/// Response body for a single employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeView {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub birthday: NaiveDate,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hobbies: Vec<String>,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub error_id: Uuid,
    pub path: String,
}

impl EmployeeBody {
    /// Check every field and collect all messages, in field order.
    pub fn validate(self, today: NaiveDate) -> Result<EmployeeInput, Vec<String>> {
        let mut problems = Vec::new();

        let email = self.email.unwrap_or_default();
        if email.trim().is_empty() {
            problems.push("Email is required".to_string());
        } else if !looks_like_email(&email) {
            problems.push("Invalid email format".to_string());
        }

        let full_name = self.full_name.unwrap_or_default();
        if full_name.trim().is_empty() {
            problems.push("Full name is required".to_string());
        }

        match self.birthday {
            None => problems.push("Birthday is required".to_string()),
            Some(day) if day >= today => {
                problems.push("Birthday must be in the past".to_string())
            }
            Some(_) => {}
        }

        match (problems.is_empty(), self.birthday) {
            (true, Some(birthday)) => Ok(EmployeeInput {
                email,
                full_name,
                birthday,
                hobbies: self.hobbies,
            }),
            _ => Err(problems),
        }
    }
}

/// `local@domain` with no whitespace and a non-empty part on each side.
fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

impl From<Employee> for EmployeeView {
    fn from(employee: Employee) -> Self {
        EmployeeView {
            id: employee.id,
            email: employee.email,
            full_name: employee.full_name,
            birthday: employee.birthday,
            hobbies: employee.hobbies,
        }
    }
}

impl From<EmployeeInput> for EmployeeBody {
    fn from(input: EmployeeInput) -> Self {
        EmployeeBody {
            email: Some(input.email),
            full_name: Some(input.full_name),
            birthday: Some(input.birthday),
            hobbies: input.hobbies,
        }
    }
}
