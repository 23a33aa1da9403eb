use anyhow::{anyhow, Result};
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

const TOKEN_ISSUER: &str = "portal";

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// Issues and verifies PASETO v4.local access tokens sealed with
/// `PASETO_ACCESS_KEY`. Any service holding the key can mint them.
#[derive(Clone)]
pub struct AuthService {
    access_key: [u8; 32],
    access_ttl_minutes: u64,
}

impl AuthService {
    pub fn new(access_key: [u8; 32], access_ttl_minutes: u64) -> Self {
        Self {
            access_key,
            access_ttl_minutes,
        }
    }

    pub fn issue_access_token(&self, user_id: Uuid) -> Result<AccessToken> {
        let duration = std::time::Duration::from_secs(self.access_ttl_minutes * 60);
        let mut claims = Claims::new_expires_in(&duration)?;
        claims.issuer(TOKEN_ISSUER)?;
        claims.audience(TOKEN_ISSUER)?;
        claims.subject(&user_id.to_string())?;
        claims.add_additional("typ", "access")?;

        let key = SymmetricKey::<V4>::from(&self.access_key)?;
        let token = local::encrypt(&key, &claims, None, None)?;
        let expires_at =
            OffsetDateTime::now_utc() + Duration::minutes(self.access_ttl_minutes as i64);

        Ok(AccessToken { token, expires_at })
    }

    /// `Ok(None)` for tokens that are malformed, expired, or of another type.
    pub fn authenticate_access_token(&self, token: &str) -> Result<Option<AuthSession>> {
        let key = SymmetricKey::<V4>::from(&self.access_key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(TOKEN_ISSUER);
        rules.validate_audience_with(TOKEN_ISSUER);

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let Some(claims) = trusted.payload_claims() else {
            return Ok(None);
        };

        let is_access = claims
            .get_claim("typ")
            .and_then(|value| value.as_str())
            .map(|value| value == "access")
            .unwrap_or(false);
        if !is_access {
            return Ok(None);
        }

        let subject = claims
            .get_claim("sub")
            .and_then(|value| value.as_str())
            .ok_or_else(|| anyhow!("missing sub claim"))?;
        Ok(Some(AuthSession {
            user_id: Uuid::parse_str(subject)?,
        }))
    }
}
