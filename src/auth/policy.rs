//! Role gates and own-player scoping.
//!
//! Every route resolves a [`Caller`] first and asks this module whether the
//! operation is allowed. The checks are pure: they look only at the caller's
//! role and linked player, never at storage.

use serde::Serialize;

use crate::error::AppError;

use super::{Permission, Role};

/// The authenticated side of a caller: who they are and which player, if
/// any, their account is linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub account_id: i64,
    pub role: Role,
    pub player_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    Authenticated(Identity),
}

impl Caller {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Caller::Anonymous => None,
            Caller::Authenticated(identity) => Some(identity),
        }
    }

    /// Shorthand for [`authorize`] with the roles that hold `permission`.
    pub fn require(&self, permission: Permission) -> Result<Identity, AppError> {
        let identity = authorize(self, &permission.allowed_roles())?;
        tracing::debug!(
            account_id = identity.account_id,
            permission = ?permission,
            "Permission granted"
        );
        Ok(identity)
    }
}

/// Fails with `Unauthenticated` for anonymous callers and `Forbidden` when
/// the caller's role is not listed.
pub fn authorize(caller: &Caller, allowed_roles: &[Role]) -> Result<Identity, AppError> {
    let identity = match caller {
        Caller::Anonymous => {
            return Err(AppError::Unauthenticated(
                "no active session".to_string(),
            ));
        }
        Caller::Authenticated(identity) => *identity,
    };

    if allowed_roles.contains(&identity.role) {
        Ok(identity)
    } else {
        tracing::warn!(
            account_id = identity.account_id,
            role = %identity.role,
            allowed = ?allowed_roles,
            "Permission denied"
        );
        Err(AppError::Forbidden(format!(
            "role '{}' may not perform this operation",
            identity.role
        )))
    }
}

pub fn can_access_player(caller: &Caller, player_id: i64) -> bool {
    match caller {
        Caller::Anonymous => false,
        Caller::Authenticated(identity) => identity_can_access_player(identity, player_id),
    }
}

fn identity_can_access_player(identity: &Identity, player_id: i64) -> bool {
    match identity.role {
        Role::Admin | Role::Trainer | Role::Viewer => true,
        Role::Player => identity.player_id == Some(player_id),
    }
}

pub fn ensure_player_access(identity: &Identity, player_id: i64) -> Result<(), AppError> {
    if identity_can_access_player(identity, player_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "account {} may not access player {}",
            identity.account_id, player_id
        )))
    }
}

/// Narrows a caller-supplied `player_id` filter.
///
/// Player accounts always read their own player: an absent filter is filled
/// in, a matching one is kept and a different one is refused. Unlinked player
/// accounts are refused outright. Other roles pass through unchanged.
pub fn scope_player_filter(
    identity: &Identity,
    requested: Option<i64>,
) -> Result<Option<i64>, AppError> {
    if identity.role != Role::Player {
        return Ok(requested);
    }

    let own = identity.player_id.ok_or_else(|| {
        AppError::Forbidden("player account is not linked to a player".to_string())
    })?;

    match requested {
        Some(requested) if requested != own => Err(AppError::Forbidden(format!(
            "player accounts may only read their own records (requested player {})",
            requested
        ))),
        _ => Ok(Some(own)),
    }
}

/// A record with a narrower shape for callers who must not see coach notes
/// or other players' details.
pub trait Redact {
    type Redacted: Serialize;

    fn redact(self, viewer: &Identity) -> Self::Redacted;
}

/// A record projected for a particular caller.
#[derive(Serialize)]
#[serde(untagged, bound = "T: Serialize")]
pub enum RoleView<T: Redact> {
    Full(T),
    Redacted(T::Redacted),
}

pub fn project<T: Redact>(identity: &Identity, record: T) -> RoleView<T> {
    match identity.role {
        Role::Player => RoleView::Redacted(record.redact(identity)),
        Role::Admin | Role::Trainer | Role::Viewer => RoleView::Full(record),
    }
}

pub fn project_all<T: Redact>(identity: &Identity, records: Vec<T>) -> Vec<RoleView<T>> {
    records
        .into_iter()
        .map(|record| project(identity, record))
        .collect()
}
