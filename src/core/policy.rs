use serde::{Deserialize, Serialize};
use std::fmt;

use super::AppError;

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("{0} is not a known role")]
pub struct UnknownRole(pub String);

impl From<UnknownRole> for AppError {
    fn from(error: UnknownRole) -> Self {
        AppError::forbidden_error(error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Student,
    Lecturer,
    Admin,
}

/// Operations gated by role. Each handler checks exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Create, edit, submit, delete and attach files to one's own achievements.
    AuthorAchievements,
    ViewAchievements,
    VerifyAchievements,
    ViewReports,
    OnboardStudent,
    OnboardLecturer,
    ViewAcademicProfiles,
    AssignAdvisor,
    ManageUsers,
    ManagePermissions,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Lecturer => "Lecturer",
            Role::Admin => "Admin",
        }
    }

    pub fn capabilities(&self) -> &'static [Capability] {
        use Capability::*;
        match self {
            Role::Student => &[AuthorAchievements, ViewAchievements, OnboardStudent],
            Role::Lecturer => &[
                ViewAchievements,
                VerifyAchievements,
                ViewReports,
                OnboardLecturer,
                ViewAcademicProfiles,
            ],
            Role::Admin => &[
                ViewAchievements,
                VerifyAchievements,
                ViewReports,
                OnboardLecturer,
                ViewAcademicProfiles,
                AssignAdvisor,
                ManageUsers,
                ManagePermissions,
            ],
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    // Role rows written by the first deployment use the Indonesian names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" | "mahasiswa" => Ok(Role::Student),
            "lecturer" | "dosen" => Ok(Role::Lecturer),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
