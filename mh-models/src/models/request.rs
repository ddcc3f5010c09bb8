//! Contact request entity model.

use serde::{Deserialize, Serialize};
use rusqlite::{params, Connection, Row};
use mh_core::error::{MhError, MhResult};

use super::common::{ContactRole, Priority, UserRef};

/// Why the requester wants to get in touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    GeneralInquiry,
    MeetingRequest,
    CollaborationRequest,
    InvestmentInquiry,
    MentorshipRequest,
    PartnershipRequest,
    SupportRequest,
    FeedbackRequest,
    Other,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::GeneralInquiry => "general_inquiry",
            RequestType::MeetingRequest => "meeting_request",
            RequestType::CollaborationRequest => "collaboration_request",
            RequestType::InvestmentInquiry => "investment_inquiry",
            RequestType::MentorshipRequest => "mentorship_request",
            RequestType::PartnershipRequest => "partnership_request",
            RequestType::SupportRequest => "support_request",
            RequestType::FeedbackRequest => "feedback_request",
            RequestType::Other => "other",
        }
    }

    /// Parse a stored string; unrecognized values map to Other.
    pub fn parse(s: &str) -> Self {
        match s {
            "general_inquiry" => RequestType::GeneralInquiry,
            "meeting_request" => RequestType::MeetingRequest,
            "collaboration_request" => RequestType::CollaborationRequest,
            "investment_inquiry" => RequestType::InvestmentInquiry,
            "mentorship_request" => RequestType::MentorshipRequest,
            "partnership_request" => RequestType::PartnershipRequest,
            "support_request" => RequestType::SupportRequest,
            "feedback_request" => RequestType::FeedbackRequest,
            _ => RequestType::Other,
        }
    }
}

/// Lifecycle state of a contact request.
///
/// Created pending; leaves pending exactly once. Every other state is
/// terminal except approved, which may still become completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
    Cancelled,
    Completed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Expired => "expired",
            RequestStatus::Cancelled => "cancelled",
            RequestStatus::Completed => "completed",
        }
    }

    /// Parse a stored string; unrecognized values map to Pending.
    pub fn parse(s: &str) -> Self {
        match s {
            "approved" => RequestStatus::Approved,
            "rejected" => RequestStatus::Rejected,
            "expired" => RequestStatus::Expired,
            "cancelled" => RequestStatus::Cancelled,
            "completed" => RequestStatus::Completed,
            _ => RequestStatus::Pending,
        }
    }

    /// Whether no further transitions are permitted from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Rejected
                | RequestStatus::Expired
                | RequestStatus::Cancelled
                | RequestStatus::Completed
        )
    }
}

/// An inbound contact request from one user to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRequest {
    pub id: String,
    pub requester: UserRef,
    pub target: UserRef,
    pub request_type: RequestType,
    pub subject: String,
    pub message: String,
    pub status: RequestStatus,
    pub priority: Priority,
    pub category: String,
    pub response_message: Option<String>,
    pub responded_at: Option<String>,
    pub responded_by: Option<String>,
    /// Proposed meeting details for meeting requests (free-form JSON).
    pub scheduled_meeting: Option<serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
}

impl ContactRequest {
    /// Construct from a database row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            requester: UserRef {
                id: row.get("requester_id")?,
                name: row.get("requester_name")?,
                email: row.get("requester_email")?,
                role: ContactRole::parse(&row.get::<_, String>("requester_role")?),
            },
            target: UserRef {
                id: row.get("target_id")?,
                name: row.get("target_name")?,
                email: row.get("target_email")?,
                role: ContactRole::parse(&row.get::<_, String>("target_role")?),
            },
            request_type: RequestType::parse(&row.get::<_, String>("request_type")?),
            subject: row.get("subject")?,
            message: row.get("message")?,
            status: RequestStatus::parse(&row.get::<_, String>("status")?),
            priority: Priority::parse(&row.get::<_, String>("priority")?),
            category: row.get("category")?,
            response_message: row.get("response_message")?,
            responded_at: row.get("responded_at")?,
            responded_by: row.get("responded_by")?,
            scheduled_meeting: row
                .get::<_, Option<String>>("scheduled_meeting")?
                .and_then(|s| serde_json::from_str(&s).ok()),
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert this request.
    pub fn insert(&self, conn: &Connection) -> MhResult<()> {
        conn.execute(
            "INSERT INTO contact_requests (
                id, requester_id, requester_name, requester_email, requester_role,
                target_id, target_name, target_email, target_role,
                request_type, subject, message, status, priority, category,
                response_message, responded_at, responded_by, scheduled_meeting,
                created_at, updated_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21)",
            params![
                self.id,
                self.requester.id,
                self.requester.name,
                self.requester.email,
                self.requester.role.as_str(),
                self.target.id,
                self.target.name,
                self.target.email,
                self.target.role.as_str(),
                self.request_type.as_str(),
                self.subject,
                self.message,
                self.status.as_str(),
                self.priority.as_str(),
                self.category,
                self.response_message,
                self.responded_at,
                self.responded_by,
                self.scheduled_meeting.as_ref().map(|v| v.to_string()),
                self.created_at,
                self.updated_at,
            ],
        )
        .map_err(|e| MhError::Database(e.to_string()))?;
        Ok(())
    }

    /// Write back the mutable fields (status and response details).
    pub fn update(&self, conn: &Connection) -> MhResult<()> {
        conn.execute(
            "UPDATE contact_requests SET
                status = ?1, priority = ?2, category = ?3, response_message = ?4,
                responded_at = ?5, responded_by = ?6, scheduled_meeting = ?7,
                updated_at = ?8
            WHERE id = ?9",
            params![
                self.status.as_str(),
                self.priority.as_str(),
                self.category,
                self.response_message,
                self.responded_at,
                self.responded_by,
                self.scheduled_meeting.as_ref().map(|v| v.to_string()),
                self.updated_at,
                self.id,
            ],
        )
        .map_err(|e| MhError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Input for creating a contact request. The id, pending status, and
/// timestamps are assigned on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRequestDraft {
    pub requester: UserRef,
    pub target: UserRef,
    pub request_type: RequestType,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub scheduled_meeting: Option<serde_json::Value>,
}

impl ContactRequestDraft {
    /// Materialize the draft into a pending request record.
    pub fn into_request(self) -> ContactRequest {
        ContactRequest {
            id: String::new(),
            requester: self.requester,
            target: self.target,
            request_type: self.request_type,
            subject: self.subject,
            message: self.message,
            status: RequestStatus::Pending,
            priority: self.priority,
            category: self.category,
            response_message: None,
            responded_at: None,
            responded_by: None,
            scheduled_meeting: self.scheduled_meeting,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_type_roundtrip() {
        for rt in [
            RequestType::GeneralInquiry,
            RequestType::MeetingRequest,
            RequestType::CollaborationRequest,
            RequestType::InvestmentInquiry,
            RequestType::MentorshipRequest,
            RequestType::PartnershipRequest,
            RequestType::SupportRequest,
            RequestType::FeedbackRequest,
            RequestType::Other,
        ] {
            assert_eq!(RequestType::parse(rt.as_str()), rt);
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(!RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
        assert!(RequestStatus::Expired.is_terminal());
        assert!(RequestStatus::Cancelled.is_terminal());
        assert!(RequestStatus::Completed.is_terminal());
    }

    #[test]
    fn test_draft_materializes_pending() {
        let draft = ContactRequestDraft {
            requester: UserRef::new("u-1", "Ravi", "ravi@example.com", ContactRole::Student),
            target: UserRef::new("u-2", "Asha", "asha@example.com", ContactRole::Mentor),
            request_type: RequestType::MentorshipRequest,
            subject: "Guidance".into(),
            message: "Could you mentor me this cohort?".into(),
            priority: Priority::High,
            category: "mentorship".into(),
            scheduled_meeting: None,
        };
        let request = draft.into_request();
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(request.id.is_empty());
        assert!(request.responded_at.is_none());
    }
}
