//! Role-based authorization
//!
//! Roles expand into a [`CapabilitySet`] and every entry point asks the same
//! policy function, [`can_perform`], whether a user may take an [`Action`]
//! on a [`Resource`].

use serde::{Deserialize, Serialize};

use core_kernel::UserId;
use crate::claim::{Claim, ClaimStatus};
use crate::error::ClaimError;
use crate::voyage::Voyage;

text_enum! {
    /// User role
    Role {
        /// View only
        Read => "READ",
        /// View and export
        ReadExport => "READ_EXPORT",
        /// Create and edit claims and voyages
        Write => "WRITE",
        /// Write plus assigning voyages to other analysts
        TeamLead => "TEAM_LEAD",
        Admin => "ADMIN",
    }
}

/// A single permission granted by a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    View,
    Export,
    Write,
    AssignOthers,
    Administer,
}

impl Capability {
    fn bit(self) -> u8 {
        match self {
            Capability::View => 1,
            Capability::Export => 1 << 1,
            Capability::Write => 1 << 2,
            Capability::AssignOthers => 1 << 3,
            Capability::Administer => 1 << 4,
        }
    }
}

/// Set of capabilities held by a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    /// Capabilities granted to a role; each role includes the one below it
    pub fn for_role(role: Role) -> Self {
        let read = Self::empty().with(Capability::View);
        let export = read.with(Capability::Export);
        let write = export.with(Capability::Write);
        let lead = write.with(Capability::AssignOthers);
        match role {
            Role::Read => read,
            Role::ReadExport => export,
            Role::Write => write,
            Role::TeamLead => lead,
            Role::Admin => lead.with(Capability::Administer),
        }
    }
}

/// A system user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: Role,
    pub is_active: bool,
}

impl User {
    pub fn new(username: impl Into<String>, full_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId::new_v7(),
            username: username.into(),
            full_name: full_name.into(),
            email: None,
            role,
            is_active: true,
        }
    }

    /// Full name, falling back to the username
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }

    pub fn capabilities(&self) -> CapabilitySet {
        if self.is_active {
            CapabilitySet::for_role(self.role)
        } else {
            CapabilitySet::empty()
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities().contains(capability)
    }
}

/// Something a user may attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ViewClaim,
    ViewVoyage,
    CommentOnClaim,
    CreateClaim,
    /// Field edits, status changes and document attachment
    EditClaim,
    DeleteClaim,
    RecordPayment,
    RegisterVoyage,
    RecordPortActivity,
    AssignVoyageToSelf,
    AssignVoyageToOther,
    ReassignVoyage,
    /// Setting a claim's assignee to someone other than the actor
    AssignClaimToOther,
    /// Whether the user may be the target of an assignment
    HandleClaims,
    RunMaintenance,
}

/// The record an action applies to, when the decision depends on it
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    None,
    Claim(&'a Claim),
    Voyage(&'a Voyage),
}

/// The single authorization policy
pub fn can_perform(user: &User, action: Action, resource: Resource<'_>) -> bool {
    let caps = user.capabilities();
    match action {
        Action::ViewClaim | Action::ViewVoyage | Action::CommentOnClaim => {
            caps.contains(Capability::View)
        }
        Action::CreateClaim
        | Action::RegisterVoyage
        | Action::RecordPortActivity
        | Action::RecordPayment
        | Action::AssignVoyageToSelf
        | Action::HandleClaims => caps.contains(Capability::Write),
        Action::EditClaim => {
            caps.contains(Capability::Administer)
                || match resource {
                    Resource::Claim(claim) => {
                        caps.contains(Capability::Write)
                            && claim.status == ClaimStatus::Draft
                            && (claim.created_by == Some(user.id) || claim.assigned_to == Some(user.id))
                    }
                    _ => false,
                }
        }
        Action::DeleteClaim => {
            caps.contains(Capability::Administer)
                || match resource {
                    Resource::Claim(claim) => {
                        caps.contains(Capability::Write)
                            && claim.status == ClaimStatus::Draft
                            && claim.created_by == Some(user.id)
                    }
                    _ => false,
                }
        }
        Action::AssignVoyageToOther | Action::AssignClaimToOther => {
            caps.contains(Capability::AssignOthers)
        }
        Action::ReassignVoyage => {
            caps.contains(Capability::AssignOthers)
                || match resource {
                    Resource::Voyage(voyage) => {
                        caps.contains(Capability::View) && voyage.assigned_analyst_id == Some(user.id)
                    }
                    _ => false,
                }
        }
        Action::RunMaintenance => caps.contains(Capability::Administer),
    }
}

/// Like [`can_perform`] but returns a typed error on refusal
pub fn authorize(user: &User, action: Action, resource: Resource<'_>) -> Result<(), ClaimError> {
    if can_perform(user, action, resource) {
        Ok(())
    } else {
        Err(ClaimError::permission_denied(format!(
            "{} ({}) may not perform {:?}",
            user.username, user.role, action
        )))
    }
}
