//! Contact settings entity model.
//!
//! One record per user, holding permission flags, the role contact
//! matrix, block/whitelist sets, and free-form preference blobs.

use serde::{Deserialize, Serialize};
use rusqlite::{params, Connection, Row};
use mh_core::error::{MhError, MhResult};

use super::common::ContactRole;

/// Who may see a user's profile/contact details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    Public,
    Private,
    Restricted,
    Confidential,
}

impl PrivacyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyLevel::Public => "public",
            PrivacyLevel::Private => "private",
            PrivacyLevel::Restricted => "restricted",
            PrivacyLevel::Confidential => "confidential",
        }
    }

    /// Parse a stored string; unrecognized values map to Private.
    pub fn parse(s: &str) -> Self {
        match s {
            "public" => PrivacyLevel::Public,
            "restricted" => PrivacyLevel::Restricted,
            "confidential" => PrivacyLevel::Confidential,
            _ => PrivacyLevel::Private,
        }
    }
}

/// Per-role contact permission matrix.
///
/// Admin contact is always allowed and deliberately not configurable;
/// moderation traffic must not be lockable-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissions {
    pub allow_investor_contact: bool,
    pub allow_mentor_contact: bool,
    pub allow_startup_contact: bool,
    pub allow_student_contact: bool,
}

impl RolePermissions {
    /// Whether contact from the given role is allowed.
    pub fn allows(&self, role: ContactRole) -> bool {
        match role {
            ContactRole::Investor => self.allow_investor_contact,
            ContactRole::Mentor => self.allow_mentor_contact,
            ContactRole::Startup => self.allow_startup_contact,
            ContactRole::Student => self.allow_student_contact,
            ContactRole::Admin => true,
        }
    }
}

impl Default for RolePermissions {
    fn default() -> Self {
        Self {
            allow_investor_contact: true,
            allow_mentor_contact: true,
            allow_startup_contact: true,
            allow_student_contact: true,
        }
    }
}

/// Per-user contact and privacy preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactSettings {
    pub id: String,
    pub user_id: String,
    pub allow_contact_requests: bool,
    pub allow_direct_messages: bool,
    pub allow_meeting_requests: bool,
    pub role_permissions: RolePermissions,
    pub privacy_level: PrivacyLevel,
    pub blocked_users: Vec<String>,
    pub whitelisted_users: Vec<String>,
    pub contact_preferences: Option<serde_json::Value>,
    pub notification_settings: Option<serde_json::Value>,
    pub business_hours: Option<serde_json::Value>,
    pub timezone: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ContactSettings {
    /// Permissive defaults used when settings are created lazily on the
    /// user's first write. The id and timestamps are assigned by the store.
    pub fn defaults_for(user_id: &str, timezone: &str) -> Self {
        Self {
            id: String::new(),
            user_id: user_id.to_string(),
            allow_contact_requests: true,
            allow_direct_messages: true,
            allow_meeting_requests: true,
            role_permissions: RolePermissions::default(),
            privacy_level: PrivacyLevel::Private,
            blocked_users: Vec::new(),
            whitelisted_users: Vec::new(),
            contact_preferences: None,
            notification_settings: None,
            business_hours: None,
            timezone: timezone.to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    /// Whether the candidate is on this user's block list.
    pub fn is_blocked(&self, candidate_id: &str) -> bool {
        self.blocked_users.iter().any(|u| u == candidate_id)
    }

    /// Whether the candidate is whitelisted. Whitelisted users bypass the
    /// permission flags but never an explicit block.
    pub fn is_whitelisted(&self, candidate_id: &str) -> bool {
        self.whitelisted_users.iter().any(|u| u == candidate_id)
    }

    /// Add a user to the block list. Returns false if already present.
    pub fn add_block(&mut self, target_id: &str) -> bool {
        if self.is_blocked(target_id) {
            return false;
        }
        self.blocked_users.push(target_id.to_string());
        true
    }

    /// Remove a user from the block list. Returns false if absent.
    pub fn remove_block(&mut self, target_id: &str) -> bool {
        let before = self.blocked_users.len();
        self.blocked_users.retain(|u| u != target_id);
        self.blocked_users.len() != before
    }

    /// Construct from a database row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            allow_contact_requests: row.get::<_, i32>("allow_contact_requests")? != 0,
            allow_direct_messages: row.get::<_, i32>("allow_direct_messages")? != 0,
            allow_meeting_requests: row.get::<_, i32>("allow_meeting_requests")? != 0,
            role_permissions: RolePermissions {
                allow_investor_contact: row.get::<_, i32>("allow_investor_contact")? != 0,
                allow_mentor_contact: row.get::<_, i32>("allow_mentor_contact")? != 0,
                allow_startup_contact: row.get::<_, i32>("allow_startup_contact")? != 0,
                allow_student_contact: row.get::<_, i32>("allow_student_contact")? != 0,
            },
            privacy_level: PrivacyLevel::parse(&row.get::<_, String>("privacy_level")?),
            blocked_users: serde_json::from_str(&row.get::<_, String>("blocked_users")?)
                .unwrap_or_default(),
            whitelisted_users: serde_json::from_str(&row.get::<_, String>("whitelisted_users")?)
                .unwrap_or_default(),
            contact_preferences: row
                .get::<_, Option<String>>("contact_preferences")?
                .and_then(|s| serde_json::from_str(&s).ok()),
            notification_settings: row
                .get::<_, Option<String>>("notification_settings")?
                .and_then(|s| serde_json::from_str(&s).ok()),
            business_hours: row
                .get::<_, Option<String>>("business_hours")?
                .and_then(|s| serde_json::from_str(&s).ok()),
            timezone: row.get("timezone")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert this settings record.
    pub fn insert(&self, conn: &Connection) -> MhResult<()> {
        conn.execute(
            "INSERT INTO contact_settings (
                id, user_id, allow_contact_requests, allow_direct_messages,
                allow_meeting_requests, allow_investor_contact, allow_mentor_contact,
                allow_startup_contact, allow_student_contact, privacy_level,
                blocked_users, whitelisted_users, contact_preferences,
                notification_settings, business_hours, timezone, created_at, updated_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)",
            params![
                self.id,
                self.user_id,
                self.allow_contact_requests as i32,
                self.allow_direct_messages as i32,
                self.allow_meeting_requests as i32,
                self.role_permissions.allow_investor_contact as i32,
                self.role_permissions.allow_mentor_contact as i32,
                self.role_permissions.allow_startup_contact as i32,
                self.role_permissions.allow_student_contact as i32,
                self.privacy_level.as_str(),
                serde_json::to_string(&self.blocked_users)?,
                serde_json::to_string(&self.whitelisted_users)?,
                self.contact_preferences.as_ref().map(|v| v.to_string()),
                self.notification_settings.as_ref().map(|v| v.to_string()),
                self.business_hours.as_ref().map(|v| v.to_string()),
                self.timezone,
                self.created_at,
                self.updated_at,
            ],
        )
        .map_err(|e| MhError::Database(e.to_string()))?;
        Ok(())
    }

    /// Write back all mutable fields of this settings record.
    pub fn update(&self, conn: &Connection) -> MhResult<()> {
        conn.execute(
            "UPDATE contact_settings SET
                allow_contact_requests = ?1, allow_direct_messages = ?2,
                allow_meeting_requests = ?3, allow_investor_contact = ?4,
                allow_mentor_contact = ?5, allow_startup_contact = ?6,
                allow_student_contact = ?7, privacy_level = ?8,
                blocked_users = ?9, whitelisted_users = ?10,
                contact_preferences = ?11, notification_settings = ?12,
                business_hours = ?13, timezone = ?14, updated_at = ?15
            WHERE id = ?16",
            params![
                self.allow_contact_requests as i32,
                self.allow_direct_messages as i32,
                self.allow_meeting_requests as i32,
                self.role_permissions.allow_investor_contact as i32,
                self.role_permissions.allow_mentor_contact as i32,
                self.role_permissions.allow_startup_contact as i32,
                self.role_permissions.allow_student_contact as i32,
                self.privacy_level.as_str(),
                serde_json::to_string(&self.blocked_users)?,
                serde_json::to_string(&self.whitelisted_users)?,
                self.contact_preferences.as_ref().map(|v| v.to_string()),
                self.notification_settings.as_ref().map(|v| v.to_string()),
                self.business_hours.as_ref().map(|v| v.to_string()),
                self.timezone,
                self.updated_at,
                self.id,
            ],
        )
        .map_err(|e| MhError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Partial update for settings: only the provided fields are applied,
/// omitted fields never overwrite stored values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactSettingsPatch {
    pub allow_contact_requests: Option<bool>,
    pub allow_direct_messages: Option<bool>,
    pub allow_meeting_requests: Option<bool>,
    pub role_permissions: Option<RolePermissions>,
    pub privacy_level: Option<PrivacyLevel>,
    pub blocked_users: Option<Vec<String>>,
    pub whitelisted_users: Option<Vec<String>>,
    pub contact_preferences: Option<serde_json::Value>,
    pub notification_settings: Option<serde_json::Value>,
    pub business_hours: Option<serde_json::Value>,
    pub timezone: Option<String>,
}

impl ContactSettingsPatch {
    /// Apply the provided fields onto existing settings.
    pub fn apply(&self, settings: &mut ContactSettings) {
        if let Some(v) = self.allow_contact_requests {
            settings.allow_contact_requests = v;
        }
        if let Some(v) = self.allow_direct_messages {
            settings.allow_direct_messages = v;
        }
        if let Some(v) = self.allow_meeting_requests {
            settings.allow_meeting_requests = v;
        }
        if let Some(v) = self.role_permissions {
            settings.role_permissions = v;
        }
        if let Some(v) = self.privacy_level {
            settings.privacy_level = v;
        }
        if let Some(ref v) = self.blocked_users {
            settings.blocked_users = v.clone();
        }
        if let Some(ref v) = self.whitelisted_users {
            settings.whitelisted_users = v.clone();
        }
        if let Some(ref v) = self.contact_preferences {
            settings.contact_preferences = Some(v.clone());
        }
        if let Some(ref v) = self.notification_settings {
            settings.notification_settings = Some(v.clone());
        }
        if let Some(ref v) = self.business_hours {
            settings.business_hours = Some(v.clone());
        }
        if let Some(ref v) = self.timezone {
            settings.timezone = v.clone();
        }
    }
}
