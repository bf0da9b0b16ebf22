use crate::contracts::role::Role;
use serde::Serialize;

/// Roles granted to a principal of another cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleResolutionEvent {
    pub cell: String,
    pub ext_cell: String,
    pub subject: String,
    pub roles: Vec<String>,
}

impl RoleResolutionEvent {
    pub fn new(cell: &str, ext_cell: &str, subject: &str, roles: &[Role]) -> Self {
        Self {
            cell: cell.to_string(),
            ext_cell: ext_cell.to_string(),
            subject: subject.to_string(),
            roles: roles.iter().map(Role::create_url).collect(),
        }
    }
}
