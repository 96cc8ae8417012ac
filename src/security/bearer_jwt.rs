use super::{roles_of, AuthorizationRequest, Authorizer, AuthorizerError, Principal};
use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;
use tracing::{debug, warn};

/// Role check against the payload of a bearer JWT.
///
/// Tokens are expected to have the form `header.payload.signature`. The payload is
/// base64url-decoded and parsed as a JSON object; the configured role claim (`role` by
/// default, string or array of strings) must contain one of the route's required roles.
/// On success the full claim set is the principal.
///
/// The signature is **not** verified. Malformed tokens are rejections, never errors.
#[derive(Debug, Clone)]
pub struct JwtRoleAuthorizer {
    role_claim: String,
    required_claims: Vec<String>,
}

impl JwtRoleAuthorizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            role_claim: "role".to_string(),
            required_claims: Vec::new(),
        }
    }

    /// Claim that carries the caller's role(s).
    #[must_use]
    pub fn role_claim(mut self, claim: impl Into<String>) -> Self {
        self.role_claim = claim.into();
        self
    }

    /// Reject tokens whose payload lacks `claim` (or has it `null`).
    #[must_use]
    pub fn require_claim(mut self, claim: impl Into<String>) -> Self {
        self.required_claims.push(claim.into());
        self
    }

    /// Decode the claim set of `token` without checking its signature.
    pub(crate) fn decode_claims(token: &str) -> Option<Value> {
        let mut parts = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            debug!("JWT role authorization failed: token is not three dot-separated parts");
            return None;
        };

        let payload_bytes = match general_purpose::URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
        {
            Ok(b) => b,
            Err(e) => {
                debug!(error = %e, "JWT role authorization failed: invalid base64 payload");
                return None;
            }
        };
        match serde_json::from_slice::<Value>(&payload_bytes) {
            Ok(claims @ Value::Object(_)) => Some(claims),
            Ok(_) => {
                debug!("JWT role authorization failed: payload is not an object");
                None
            }
            Err(e) => {
                debug!(error = %e, "JWT role authorization failed: invalid JSON payload");
                None
            }
        }
    }
}

impl Default for JwtRoleAuthorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Authorizer for JwtRoleAuthorizer {
    fn authorize(
        &self,
        req: &AuthorizationRequest<'_>,
    ) -> Result<Option<Principal>, AuthorizerError> {
        let Some(token) = req.bearer_token() else {
            debug!("JWT role authorization failed: missing bearer token");
            return Ok(None);
        };
        let Some(claims) = Self::decode_claims(token) else {
            return Ok(None);
        };

        if let Some(missing) = self
            .required_claims
            .iter()
            .find(|c| claims.get(c.as_str()).map_or(true, Value::is_null))
        {
            debug!(claim = %missing, "JWT role authorization failed: required claim missing");
            return Ok(None);
        }

        let roles = roles_of(&claims, &self.role_claim);
        if roles.iter().any(|role| req.requires(role)) {
            debug!(roles = ?roles, "JWT role authorization succeeded");
            Ok(Some(claims))
        } else {
            warn!(
                roles = ?roles,
                required = ?req.required_roles,
                "JWT role authorization failed: role not permitted"
            );
            Ok(None)
        }
    }
}
