use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Moderator,
    Admin,
    Reviewer,
}

impl Role {
    /// Staff roles are offered the admin/app choice after logging in.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Moderator)
    }
}

/// Moderation lifecycle stage of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    PendingEmailVerification,
    PendingAdminApproval,
    Active,
    Rejected,
    Disabled,
    Banned,
}

impl AccountStatus {
    pub fn is_pending(self) -> bool {
        matches!(self, AccountStatus::PendingEmailVerification | AccountStatus::PendingAdminApproval)
    }

    /// Statuses that lock the account out of the app entirely.
    pub fn is_blocked(self) -> bool {
        matches!(self, AccountStatus::Rejected | AccountStatus::Disabled | AccountStatus::Banned)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub identity_id: String,
    #[serde(default)]
    pub username: Option<String>,
    pub role: Role,
    pub account_status: AccountStatus,
}

impl Profile {
    pub fn new(identity_id: impl Into<String>, role: Role, account_status: AccountStatus) -> Self {
        Self { identity_id: identity_id.into(), username: None, role, account_status }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// Why a signed-in identity has no usable profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProfileFailure {
    /// The identity never completed registration.
    ProfileMissing,
    /// Every fetch attempt failed.
    FetchFailed { message: String, attempts: u32 },
}
