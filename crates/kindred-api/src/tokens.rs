use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use kindred_types::api::Claims;

use crate::error::{ApiError, ApiResult};

/// Default bearer token lifetime, 24 hours.
pub fn default_lifetime() -> Duration {
    Duration::hours(24)
}

/// Longest lifetime a token may be issued with.
pub fn max_lifetime() -> Duration {
    Duration::days(365)
}

/// Identity embedded in a token at sign time.
#[derive(Debug, Clone)]
pub struct TokenSubject<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub username: &'a str,
}

/// Signs and verifies HS256 bearer tokens.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, lifetime: Duration) -> anyhow::Result<Self> {
        if secret.is_empty() {
            anyhow::bail!("JWT secret must not be empty");
        }
        if lifetime <= Duration::zero() {
            anyhow::bail!("token lifetime must be positive");
        }
        if lifetime > max_lifetime() {
            anyhow::bail!("token lifetime must not exceed {} days", max_lifetime().num_days());
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        })
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn sign(&self, subject: &TokenSubject<'_>) -> anyhow::Result<String> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.lifetime)
            .ok_or_else(|| anyhow::anyhow!("token expiry is out of range"))?;
        let claims = Claims {
            sub: subject.id,
            email: subject.email.to_string(),
            username: subject.username.to_string(),
            iat: now.timestamp() as usize,
            exp: expires.timestamp() as usize,
        };

        let token = encode(&Header::default(), &claims, &self.encoding)?;
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => ApiError::Auth("Token expired".into()),
                _ => ApiError::Auth("Invalid token".into()),
            })
    }

    /// Reads claims without checking signature or expiry. Diagnostics only,
    /// never use the result for an authorization decision.
    pub fn decode(token: &str) -> Option<Claims> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .ok()
            .map(|data| data.claims)
    }
}

/// Parses a lifetime such as `24h`, `30m`, `7d`, `90s` or bare seconds.
/// Anything longer than [`max_lifetime`] is rejected.
pub fn parse_lifetime(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => raw.split_at(idx),
        None => (raw, "s"),
    };
    let amount: i64 = digits.parse().ok()?;
    if amount <= 0 {
        return None;
    }
    let lifetime = match unit {
        "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        _ => None,
    }?;
    (lifetime <= max_lifetime()).then_some(lifetime)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> (Uuid, TokenSubject<'static>) {
        let id = Uuid::new_v4();
        (
            id,
            TokenSubject {
                id,
                email: "a@example.com",
                username: "alice",
            },
        )
    }

    #[test]
    fn sign_then_verify_returns_claims() {
        let issuer = TokenIssuer::new("test-secret", default_lifetime()).unwrap();
        let (id, subject) = subject();

        let token = issuer.sign(&subject).unwrap();
        let claims = issuer.verify(&token).unwrap();

        assert_eq!(claims.sub, id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issuer = TokenIssuer::new("secret-a", default_lifetime()).unwrap();
        let other = TokenIssuer::new("secret-b", default_lifetime()).unwrap();
        let (_, subject) = subject();

        let token = issuer.sign(&subject).unwrap();
        assert!(matches!(other.verify(&token), Err(ApiError::Auth(msg)) if msg == "Invalid token"));
        assert!(matches!(issuer.verify("not.a.token"), Err(ApiError::Auth(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = TokenIssuer::new("test-secret", default_lifetime()).unwrap();
        let now = Utc::now().timestamp() as usize;
        let stale = Claims {
            sub: Uuid::new_v4(),
            email: "a@example.com".into(),
            username: "alice".into(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(&Header::default(), &stale, &issuer.encoding).unwrap();

        assert!(matches!(issuer.verify(&token), Err(ApiError::Auth(msg)) if msg == "Token expired"));
        // decode still reads it for diagnostics
        assert_eq!(TokenIssuer::decode(&token).unwrap().username, "alice");
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(TokenIssuer::new("", default_lifetime()).is_err());
    }

    #[test]
    fn parses_lifetimes() {
        assert_eq!(parse_lifetime("24h"), Some(Duration::hours(24)));
        assert_eq!(parse_lifetime("30m"), Some(Duration::minutes(30)));
        assert_eq!(parse_lifetime("7d"), Some(Duration::days(7)));
        assert_eq!(parse_lifetime("3600"), Some(Duration::seconds(3600)));
        assert_eq!(parse_lifetime("0h"), None);
        assert_eq!(parse_lifetime("soon"), None);
        assert_eq!(parse_lifetime("5w"), None);
    }

    #[test]
    fn oversized_lifetimes_are_refused_without_panicking() {
        assert_eq!(parse_lifetime("365d"), Some(max_lifetime()));
        assert_eq!(parse_lifetime("366d"), None);
        assert_eq!(parse_lifetime("9999999999d"), None);
        assert_eq!(parse_lifetime("999999999999999d"), None);
        assert_eq!(parse_lifetime("9223372036854775807s"), None);
        assert_eq!(parse_lifetime("99999999999999999999h"), None);

        assert!(TokenIssuer::new("test-secret", Duration::days(400)).is_err());
        let issuer = TokenIssuer::new("test-secret", max_lifetime()).unwrap();
        let (_, subject) = subject();
        let claims = issuer.verify(&issuer.sign(&subject).unwrap()).unwrap();
        assert_eq!(claims.exp - claims.iat, 365 * 24 * 3600);
    }
}
