use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::{auth::claims::Claims, config::JwtConfig, state::AppState, users::UserView};

/// Session lifetime; the cookie's `Max-Age` matches it.
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl JwtKeys {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl: SESSION_TTL,
        }
    }

    pub fn sign(&self, user: &UserView) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user.id(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            user: user.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = claims.sub, "jwt signed");
        Ok(token)
    }

    /// Checks signature, expiry, issuer and audience.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::new(&state.config.jwt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::User;
    use time::macros::datetime;

    fn keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
        })
    }

    fn user() -> UserView {
        UserView::Basic(User {
            id: 42,
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$hash".into(),
            verification_token: None,
            role_id: 1,
            status_id: 2,
            created_at: datetime!(2024-01-01 0:00 UTC),
            updated_at: datetime!(2024-01-01 0:00 UTC),
        })
    }

    #[test]
    fn sign_and_verify() {
        let keys = keys("dev-secret", "test-issuer", "test-aud");
        let token = keys.sign(&user()).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.user.email(), "ada@example.com");
        // The hash is never part of the token.
        assert_eq!(claims.user.password_hash(), "");
    }

    #[test]
    fn rejects_wrong_issuer_or_audience() {
        let token = keys("same", "good-iss", "good-aud").sign(&user()).unwrap();
        assert!(keys("same", "bad-iss", "good-aud").verify(&token).is_err());
        assert!(keys("same", "good-iss", "bad-aud").verify(&token).is_err());
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = keys("one", "iss", "aud").sign(&user()).unwrap();
        assert!(keys("two", "iss", "aud").verify(&token).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let keys = keys("secret", "iss", "aud");
        let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
        let claims = Claims {
            sub: 42,
            iat: now - 7200,
            exp: now - 3600,
            iss: "iss".into(),
            aud: "aud".into(),
            user: user(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert!(keys.verify(&token).is_err());
    }
}
