//! Participant metadata reader.
//!
//! The video SDK hands every participant an opaque metadata string. Teachers
//! and students publish `{"role": "...", "topic": "..."}`, older clients
//! published the bare role string. Reading never fails.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a classroom participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "teacher" => Some(Role::Teacher),
            "student" => Some(Role::Student),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded participant metadata. Missing values are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub role: String,
    pub topic: String,
}

impl SessionMetadata {
    pub fn read(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::default();
        }

        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Self {
                role: string_field(&map, "role"),
                topic: string_field(&map, "topic"),
            },
            // Valid JSON that is not an object carries neither field.
            Ok(_) => Self::default(),
            Err(_) => Self {
                role: raw.to_string(),
                topic: String::new(),
            },
        }
    }

    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }

    /// Role of a remote participant; undeclared roles count as students.
    pub fn participant_role(&self) -> Role {
        self.role().unwrap_or(Role::Student)
    }

    /// Merges the teacher role into existing metadata, keeping other keys.
    pub fn with_teacher_role(raw: &str) -> String {
        let mut map = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        map.insert(
            "role".to_string(),
            Value::String(Role::Teacher.as_str().to_string()),
        );
        Value::Object(map).to_string()
    }
}

fn string_field(map: &serde_json::Map<String, Value>, key: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
