//! Password hashing and access tokens
//!
//! Passwords are stored as `rounds$salt$digest` (iterated, salted SHA-256,
//! hex encoded). Access tokens are `hex(claims_json).hex(ed25519_signature)`
//! signed with the service key; the claims carry the principal and lifetime.

use crate::config::AuthConfig;
use chrono::{DateTime, Duration, TimeZone, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use survey_core::{Principal, SurveyError, SurveyResult, TokenError};

const SALT_LEN: usize = 16;

/// Token returned by registration and login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Principal,
    iat: i64,
    exp: i64,
}

pub struct CredentialService {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    token_ttl: Duration,
    hash_rounds: u32,
    decoy_hash: String,
}

impl fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialService")
            .field("verifying_key", &hex::encode(self.verifying_key.as_bytes()))
            .field("token_ttl", &self.token_ttl)
            .field("hash_rounds", &self.hash_rounds)
            .finish_non_exhaustive()
    }
}

impl CredentialService {
    /// Build from configuration; without a seed a fresh key is generated.
    pub fn from_config(config: &AuthConfig) -> SurveyResult<Self> {
        let signing_key = match &config.signing_seed {
            Some(seed) => {
                let mut bytes = [0u8; 32];
                hex::decode_to_slice(seed, &mut bytes)
                    .map_err(|e| SurveyError::Config(format!("auth.signing_seed: {e}")))?;
                SigningKey::from_bytes(&bytes)
            }
            None => SigningKey::generate(&mut OsRng),
        };
        let token_ttl = i64::try_from(config.token_ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| SurveyError::Config("auth.token_ttl_secs out of range".into()))?;
        let hash_rounds = config.password_hash_rounds.max(1);
        let decoy_hash = format!(
            "{hash_rounds}${}${}",
            hex::encode([0u8; SALT_LEN]),
            hex::encode([0u8; 32])
        );
        Ok(Self {
            verifying_key: signing_key.verifying_key(),
            signing_key,
            token_ttl,
            hash_rounds,
            decoy_hash,
        })
    }

    /// Dummy hash checked when a login names no account, so misses cost the same.
    #[must_use]
    pub fn decoy_hash(&self) -> &str {
        &self.decoy_hash
    }

    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.verifying_key
    }

    // ---- passwords ----

    #[must_use]
    pub fn hash_password(&self, plain: &str) -> String {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let digest = stretch(plain, &salt, self.hash_rounds);
        format!("{}${}${}", self.hash_rounds, hex::encode(salt), hex::encode(digest))
    }

    /// Check `plain` against a stored hash. Uses the rounds recorded in the hash.
    #[must_use]
    pub fn verify_password(&self, plain: &str, stored: &str) -> bool {
        let mut parts = stored.splitn(3, '$');
        let (Some(rounds), Some(salt), Some(digest)) = (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        let (Ok(rounds), Ok(salt), Ok(expected)) =
            (rounds.parse::<u32>(), hex::decode(salt), hex::decode(digest))
        else {
            return false;
        };
        constant_time_eq(&stretch(plain, &salt, rounds.max(1)), &expected)
    }

    // ---- tokens ----

    pub fn issue_token(&self, principal: Principal, now: DateTime<Utc>) -> SurveyResult<IssuedToken> {
        let expires_at = now
            .checked_add_signed(self.token_ttl)
            .ok_or_else(|| SurveyError::Config("auth.token_ttl_secs overflows the clock".into()))?;
        let claims = Claims {
            sub: principal,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let payload = serde_json::to_vec(&claims)
            .map_err(|e| SurveyError::payload(format!("token claims: {e}")))?;
        let signature: Signature = self.signing_key.sign(&payload);
        Ok(IssuedToken {
            access_token: format!("{}.{}", hex::encode(&payload), hex::encode(signature.to_bytes())),
            token_type: "bearer".to_string(),
            expires_at,
        })
    }

    /// Verify signature and lifetime, returning the principal the token names.
    pub fn validate_token(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::Missing);
        }
        let (payload_hex, signature_hex) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let payload = hex::decode(payload_hex).map_err(|_| TokenError::Malformed)?;
        let signature_bytes = hex::decode(signature_hex).map_err(|_| TokenError::Malformed)?;
        let signature =
            Signature::from_slice(&signature_bytes).map_err(|_| TokenError::Malformed)?;

        self.verifying_key
            .verify(&payload, &signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(TokenError::Malformed)?;
        if now >= expires_at {
            return Err(TokenError::Expired);
        }
        Ok(claims.sub)
    }
}

fn stretch(plain: &str, salt: &[u8], rounds: u32) -> [u8; 32] {
    let mut digest: [u8; 32] = Sha256::new()
        .chain_update(salt)
        .chain_update(plain.as_bytes())
        .finalize()
        .into();
    for _ in 1..rounds {
        digest = Sha256::new()
            .chain_update(salt)
            .chain_update(digest)
            .finalize()
            .into();
    }
    digest
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_core::{SubjectId, UserId};

    fn service() -> CredentialService {
        CredentialService::from_config(&AuthConfig {
            password_hash_rounds: 16,
            ..AuthConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn password_round_trip() {
        let svc = service();
        let stored = svc.hash_password("hunter2");
        assert!(stored.starts_with("16$"));
        assert!(svc.verify_password("hunter2", &stored));
        assert!(!svc.verify_password("hunter3", &stored));
        assert!(!svc.verify_password("hunter2", "garbage"));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let svc = service();
        assert_ne!(svc.hash_password("pw"), svc.hash_password("pw"));
    }

    #[test]
    fn token_names_its_principal() {
        let svc = service();
        let now = Utc::now();
        let issued = svc.issue_token(Principal::Subject(SubjectId(5)), now).unwrap();
        assert_eq!(issued.token_type, "bearer");
        assert_eq!(svc.validate_token(&issued.access_token, now), Ok(Principal::Subject(SubjectId(5))));
    }

    #[test]
    fn expired_token_rejected() {
        let svc = service();
        let now = Utc::now();
        let issued = svc.issue_token(Principal::Researcher(UserId(1)), now).unwrap();
        assert_eq!(
            svc.validate_token(&issued.access_token, issued.expires_at),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn foreign_key_rejected() {
        let now = Utc::now();
        let issued = service().issue_token(Principal::Researcher(UserId(1)), now).unwrap();
        assert_eq!(
            service().validate_token(&issued.access_token, now),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let svc = service();
        let now = Utc::now();
        assert_eq!(svc.validate_token("", now), Err(TokenError::Missing));
        assert_eq!(svc.validate_token("abc", now), Err(TokenError::Malformed));
        assert_eq!(svc.validate_token("zz.zz", now), Err(TokenError::Malformed));
    }

    #[test]
    fn lifetime_past_the_calendar_is_an_error() {
        let svc = CredentialService::from_config(&AuthConfig {
            token_ttl_secs: 10_000_000_000_000,
            password_hash_rounds: 1,
            ..AuthConfig::default()
        })
        .unwrap();
        assert!(matches!(
            svc.issue_token(Principal::Researcher(UserId(1)), Utc::now()),
            Err(SurveyError::Config(_))
        ));
    }

    #[test]
    fn decoy_hash_never_matches() {
        let svc = service();
        assert!(svc.decoy_hash().starts_with("16$"));
        assert!(!svc.verify_password("", svc.decoy_hash()));
        assert!(!svc.verify_password("hunter2", svc.decoy_hash()));
    }

    #[test]
    fn seeded_keys_are_stable() {
        let config = AuthConfig {
            signing_seed: Some("07".repeat(32)),
            ..AuthConfig::default()
        };
        let a = CredentialService::from_config(&config).unwrap();
        let b = CredentialService::from_config(&config).unwrap();
        assert_eq!(a.verifying_key(), b.verifying_key());
    }
}
