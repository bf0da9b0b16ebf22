
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

/// Name of the box a role belongs to when it is not scoped to a specific box.
pub const DEFAULT_BOX_NAME: &str = "__";

const ROLE_PATH_SEGMENT: &str = "/__role/";

/// A named permission grouping, optionally scoped to a box and its schema.
/// Two roles are equal when their canonical URLs are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub box_name: Option<String>,
    pub box_schema: Option<String>,
    pub base_url: Option<String>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Role {
            name: name.into(),
            box_name: None,
            box_schema: None,
            base_url: None,
        }
    }

    pub fn with_box(mut self, box_name: impl Into<String>, box_schema: Option<String>) -> Self {
        self.box_name = Some(box_name.into());
        self.box_schema = box_schema.filter(|schema| !schema.is_empty());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Places a role that names neither a cell nor a box schema in `cell_url`.
    pub fn with_default_base_url(self, cell_url: &str) -> Self {
        if self.base_url.is_some() || self.box_schema.is_some() {
            self
        } else {
            self.with_base_url(cell_url)
        }
    }

    /// The canonical URL `{base}/__role/{box}/{name}`, where `base` is the box schema
    /// for box-scoped roles and the issuing cell URL otherwise.
    pub fn create_url(&self) -> String {
        let base = self
            .box_schema
            .as_deref()
            .or(self.base_url.as_deref())
            .unwrap_or_default();
        format_role_url(base, self.box_name_or_default(), &self.name)
    }

    /// The URL asserted for this role inside a trans-cell token.
    /// Schema-scoped roles are always expressed relative to the default box of the schema.
    pub fn scheme_create_url_for_trans_cell(&self, cell_url: &str) -> String {
        match self.box_schema.as_deref() {
            Some(schema) => format_role_url(schema, DEFAULT_BOX_NAME, &self.name),
            None => format_role_url(cell_url, self.box_name_or_default(), &self.name),
        }
    }

    /// Rebuilds a role from a URL of the shape `{base}/__role/{box}/{name}`.
    pub fn from_url(url: &str) -> Option<Role> {
        let index = url.find(ROLE_PATH_SEGMENT)?;
        let base = &url[..index];
        let mut segments = url[index + ROLE_PATH_SEGMENT.len()..].split('/');
        let (box_name, name) = match (segments.next(), segments.next(), segments.next()) {
            (Some(box_name), Some(name), None) if !box_name.is_empty() && !name.is_empty() => (box_name, name),
            _ => return None,
        };
        if base.is_empty() {
            return None;
        }

        let role = Role::new(name).with_base_url(format!("{}/", base));
        if box_name == DEFAULT_BOX_NAME {
            Some(role)
        } else {
            Some(Role {
                box_name: Some(box_name.to_string()),
                ..role
            })
        }
    }

    fn box_name_or_default(&self) -> &str {
        self.box_name.as_deref().unwrap_or(DEFAULT_BOX_NAME)
    }
}

fn format_role_url(base: &str, box_name: &str, name: &str) -> String {
    format!("{}{}{}/{}", base.trim_end_matches('/'), ROLE_PATH_SEGMENT, box_name, name)
}

impl PartialEq for Role {
    fn eq(&self, other: &Self) -> bool {
        self.create_url() == other.create_url()
    }
}

impl Eq for Role {}

impl Hash for Role {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.create_url().hash(state);
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.create_url())
    }
}
