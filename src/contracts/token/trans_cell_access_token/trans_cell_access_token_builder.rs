use crate::contracts::role::Role;
use crate::contracts::token::trans_cell_access_token::{TransCellAccessToken, new_assertion_id};
use crate::contracts::token::{TRANS_CELL_TOKEN_LIFESPAN_MILLIS, TokenClaims, now_millis};
use anyhow::anyhow;

pub struct TransCellAccessTokenBuilder {
    id: Option<String>,
    issued_at: Option<u64>,
    issuer: Option<String>,
    subject: Option<String>,
    target: Option<String>,
    schema: Option<String>,
    roles: Vec<Role>,
}

impl TransCellAccessTokenBuilder {
    pub fn new() -> Self {
        Self {
            id: None,
            issued_at: None, // Defaults to the build time
            issuer: None,
            subject: None,
            target: None,
            schema: None,
            roles: Vec::new(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn issued_at(mut self, issued_at: u64) -> Self {
        self.issued_at = Some(issued_at);
        self
    }

    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    pub fn roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles.extend(roles);
        self
    }

    pub fn build(self) -> Result<TransCellAccessToken, anyhow::Error> {
        let issuer = self.issuer.ok_or(anyhow!("Issuer is required"))?;
        let subject = self.subject.ok_or(anyhow!("Subject is required"))?;
        let target = self.target.ok_or(anyhow!("Target is required"))?;
        if issuer.is_empty() || subject.is_empty() || target.is_empty() {
            return Err(anyhow!("Issuer, subject and target must not be empty"));
        }

        let roles = self
            .roles
            .into_iter()
            .map(|role| role.with_default_base_url(&issuer))
            .collect();
        Ok(TransCellAccessToken {
            id: self.id.unwrap_or_else(new_assertion_id),
            claims: TokenClaims::new(
                self.issued_at.unwrap_or_else(now_millis),
                TRANS_CELL_TOKEN_LIFESPAN_MILLIS,
                issuer,
                subject,
                self.schema,
            ),
            target,
            roles,
        })
    }
}

impl Default for TransCellAccessTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
