use super::{roles_of, AuthorizationRequest, Authorizer, AuthorizerError, Principal};
use std::collections::HashMap;
use tracing::debug;

/// Bearer tokens mapped to fixed principals.
///
/// A request is granted when its `Authorization: Bearer <token>` names a known token and
/// the principal's role claim (`role` unless configured otherwise) holds one of the
/// route's required roles. Everything else is a rejection.
///
/// ```rust
/// use bendf::security::StaticTokenAuthorizer;
/// use serde_json::json;
///
/// let auth = StaticTokenAuthorizer::new()
///     .token("admin-token", json!({"id": "1", "name": "Ada", "role": "ADMIN"}))
///     .token("member-token", json!({"id": "2", "name": "Bo", "role": "MEMBER"}));
/// assert_eq!(auth.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct StaticTokenAuthorizer {
    tokens: HashMap<String, Principal>,
    role_claim: String,
}

impl StaticTokenAuthorizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tokens: HashMap::new(),
            role_claim: "role".to_string(),
        }
    }

    /// Register a token; a later registration of the same token replaces the principal.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>, principal: Principal) -> Self {
        self.tokens.insert(token.into(), principal);
        self
    }

    #[must_use]
    pub fn role_claim(mut self, claim: impl Into<String>) -> Self {
        self.role_claim = claim.into();
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Default for StaticTokenAuthorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Authorizer for StaticTokenAuthorizer {
    fn authorize(
        &self,
        req: &AuthorizationRequest<'_>,
    ) -> Result<Option<Principal>, AuthorizerError> {
        let Some(token) = req.bearer_token() else {
            debug!("Static token authorization failed: missing bearer token");
            return Ok(None);
        };
        let Some(principal) = self.tokens.get(token) else {
            debug!("Static token authorization failed: unknown token");
            return Ok(None);
        };

        let roles = roles_of(principal, &self.role_claim);
        if roles.iter().any(|role| req.requires(role)) {
            Ok(Some(principal.clone()))
        } else {
            debug!(
                roles = ?roles,
                required = ?req.required_roles,
                "Static token authorization failed: role not permitted"
            );
            Ok(None)
        }
    }
}
