use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ViewOwnPlayer,
    ViewOwnGoals,
    ViewOwnProgress,
    ViewOwnTrainings,
    ViewOwnTestResults,
    ChangeOwnPassword,
    ViewCatalog,

    ViewAllPlayers,
    ViewDashboard,

    ManagePlayers,
    ManageCatalog,
    ManageTrainings,
    ManageGoals,
    ManageProgress,
    ManageTestResults,

    DeletePlayers,
    ManageAccounts,
    RunFixtures,
    SeedCatalog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Trainer,
    Viewer,
    Player,
}

pub const ALL_ROLES: [Role; 4] = [Role::Admin, Role::Trainer, Role::Viewer, Role::Player];

static PLAYER_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.insert(Permission::ViewOwnPlayer);
    permissions.insert(Permission::ViewOwnGoals);
    permissions.insert(Permission::ViewOwnProgress);
    permissions.insert(Permission::ViewOwnTrainings);
    permissions.insert(Permission::ViewOwnTestResults);
    permissions.insert(Permission::ChangeOwnPassword);
    permissions.insert(Permission::ViewCatalog);

    permissions
});

static VIEWER_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(PLAYER_PERMISSIONS.iter().copied());

    permissions.insert(Permission::ViewAllPlayers);
    permissions.insert(Permission::ViewDashboard);

    permissions
});

static TRAINER_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(VIEWER_PERMISSIONS.iter().copied());

    permissions.insert(Permission::ManagePlayers);
    permissions.insert(Permission::ManageCatalog);
    permissions.insert(Permission::ManageTrainings);
    permissions.insert(Permission::ManageGoals);
    permissions.insert(Permission::ManageProgress);
    permissions.insert(Permission::ManageTestResults);

    permissions
});

static ADMIN_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(TRAINER_PERMISSIONS.iter().copied());

    permissions.insert(Permission::DeletePlayers);
    permissions.insert(Permission::ManageAccounts);
    permissions.insert(Permission::RunFixtures);
    permissions.insert(Permission::SeedCatalog);

    permissions
});

impl Permission {
    /// Roles whose permission set contains this permission.
    pub fn allowed_roles(self) -> Vec<Role> {
        ALL_ROLES
            .into_iter()
            .filter(|role| role.has_permission(self))
            .collect()
    }
}

impl Role {
    pub fn permissions(&self) -> &'static HashSet<Permission> {
        match self {
            Role::Player => &PLAYER_PERMISSIONS,
            Role::Viewer => &VIEWER_PERMISSIONS,
            Role::Trainer => &TRAINER_PERMISSIONS,
            Role::Admin => &ADMIN_PERMISSIONS,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Trainer => "trainer",
            Role::Viewer => "viewer",
            Role::Player => "player",
        }
    }

    /// Roles that may be listed as a player's trainers.
    pub fn can_coach(&self) -> bool {
        matches!(self, Role::Admin | Role::Trainer)
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "trainer" => Ok(Role::Trainer),
            "viewer" => Ok(Role::Viewer),
            "player" => Ok(Role::Player),
            other => Err(AppError::validation(
                "role",
                format!("Unknown role: {}", other),
            )),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
