use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Aggregate type tag written on every outbox record produced by an employee.
pub const AGGREGATE_TYPE: &str = "Employee";

/// A persisted employee. `email` is unique across live employees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub birthday: NaiveDate,
    #[serde(default)]
    pub hobbies: Vec<String>,
}

/// Mutable fields of an employee, as supplied to create and update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeInput {
    pub email: String,
    pub full_name: String,
    pub birthday: NaiveDate,
    #[serde(default)]
    pub hobbies: Vec<String>,
}

impl Employee {
    /// Build a new employee with a freshly assigned id.
    pub fn create(input: EmployeeInput) -> Self {
        Self::with_id(Uuid::new_v4(), input)
    }

    pub fn with_id(id: Uuid, input: EmployeeInput) -> Self {
        Employee {
            id,
            email: input.email,
            full_name: input.full_name,
            birthday: input.birthday,
            hobbies: input.hobbies,
        }
    }

    /// Overwrite every mutable field. The id never changes.
    pub fn apply(&mut self, input: EmployeeInput) {
        self.email = input.email;
        self.full_name = input.full_name;
        self.birthday = input.birthday;
        self.hobbies = input.hobbies;
    }

    pub fn to_input(&self) -> EmployeeInput {
        EmployeeInput {
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            birthday: self.birthday,
            hobbies: self.hobbies.clone(),
        }
    }
}

impl EmployeeInput {
    pub fn new(
        email: impl Into<String>,
        full_name: impl Into<String>,
        birthday: NaiveDate,
    ) -> Self {
        EmployeeInput {
            email: email.into(),
            full_name: full_name.into(),
            birthday,
            hobbies: Vec::new(),
        }
    }

    pub fn with_hobbies<I, H>(mut self, hobbies: I) -> Self
    where
        I: IntoIterator<Item = H>,
        H: Into<String>,
    {
        self.hobbies = hobbies.into_iter().map(Into::into).collect();
        self
    }
}
