//! Value types shared across the contact entities.

use serde::{Deserialize, Serialize};

/// Platform account role of a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactRole {
    Investor,
    Mentor,
    Startup,
    Student,
    Admin,
}

impl ContactRole {
    /// String form as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactRole::Investor => "investor",
            ContactRole::Mentor => "mentor",
            ContactRole::Startup => "startup",
            ContactRole::Student => "student",
            ContactRole::Admin => "admin",
        }
    }

    /// Parse a stored string; unrecognized values map to Student, the
    /// platform's most common (and least privileged) role.
    pub fn parse(s: &str) -> Self {
        match s {
            "investor" => ContactRole::Investor,
            "mentor" => ContactRole::Mentor,
            "startup" => ContactRole::Startup,
            "admin" => ContactRole::Admin,
            _ => ContactRole::Student,
        }
    }
}

impl std::fmt::Display for ContactRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Priority attached to requests, messages, and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// String form as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    /// Parse a stored string; unrecognized values map to Medium.
    pub fn parse(s: &str) -> Self {
        match s {
            "low" => Priority::Low,
            "high" => Priority::High,
            "urgent" => Priority::Urgent,
            _ => Priority::Medium,
        }
    }

    /// Numeric rank for sort ordering (urgent sorts above high, etc).
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
            Priority::Urgent => 3,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// Identity snapshot of a user, denormalized onto every entity that
/// references one so list views never need a join against accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: ContactRole,
}

impl UserRef {
    /// Convenience constructor.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: ContactRole,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in [
            ContactRole::Investor,
            ContactRole::Mentor,
            ContactRole::Startup,
            ContactRole::Student,
            ContactRole::Admin,
        ] {
            assert_eq!(ContactRole::parse(role.as_str()), role);
        }
        assert_eq!(ContactRole::parse("something-else"), ContactRole::Student);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Urgent.rank() > Priority::High.rank());
        assert!(Priority::High.rank() > Priority::Medium.rank());
        assert!(Priority::Medium.rank() > Priority::Low.rank());
        assert_eq!(Priority::parse("bogus"), Priority::Medium);
    }

    #[test]
    fn test_user_ref_serde() {
        let user = UserRef::new("u-1", "Asha", "asha@example.com", ContactRole::Mentor);
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("\"mentor\""));
        let back: UserRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, user);
    }
}
