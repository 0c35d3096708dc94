//! Local user directory backed by `auth.json`.
//!
//! Passwords are stored as Argon2id PHC strings. Bearer tokens are
//! `base64url(claims).hex(hmac_sha256(secret, base64url(claims)))` with an
//! expiry claim in unix seconds.

use std::collections::BTreeMap;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use elephant_core::defaults::SEED_USERS;
use elephant_core::{Error, Identity, LoginResult, PublicUser, Result, User, UserDirectory};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, info, warn};

use crate::json_store::JsonStore;
use crate::paths::AUTH_FILE;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct AuthDoc {
    users: BTreeMap<String, User>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Claims {
    user_id: String,
    name: String,
    exp: i64,
}

/// User directory loaded once at startup.
pub struct FsUserDirectory {
    users: BTreeMap<String, User>,
    secret: Vec<u8>,
    token_ttl: Duration,
}

impl FsUserDirectory {
    /// Load `auth.json`, seeding the default accounts when it does not exist.
    pub async fn open(store: &JsonStore, secret: &str, token_ttl_hours: i64) -> Result<Self> {
        let users = match store.try_read::<AuthDoc>(AUTH_FILE).await? {
            Some(doc) => {
                debug!(count = doc.users.len(), "Loaded users");
                doc.users
            }
            None => {
                let mut users = BTreeMap::new();
                for (id, name, password) in SEED_USERS {
                    let user = User {
                        id: id.to_string(),
                        name: name.to_string(),
                        password_hash: hash_password(password.to_string()).await?,
                    };
                    users.insert(user.id.clone(), user);
                }
                let doc = AuthDoc { users };
                store.write(AUTH_FILE, &doc).await?;
                info!(count = doc.users.len(), "Seeded default users");
                doc.users
            }
        };

        Ok(Self {
            users,
            secret: secret.as_bytes().to_vec(),
            token_ttl: Duration::hours(token_ttl_hours),
        })
    }

    fn sign(&self, payload: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| Error::Internal(format!("Invalid token secret: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn issue_token(&self, user: &User) -> Result<String> {
        let claims = Claims {
            user_id: user.id.clone(),
            name: user.name.clone(),
            exp: (Utc::now() + self.token_ttl).timestamp(),
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signature = self.sign(&payload)?;
        Ok(format!("{}.{}", payload, signature))
    }

    fn decode_token(&self, token: &str) -> Option<Claims> {
        let (payload, signature) = token.split_once('.')?;
        let signature = hex::decode(signature).ok()?;

        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let claims: Claims = serde_json::from_slice(&bytes).ok()?;
        if claims.exp <= Utc::now().timestamp() {
            debug!(user_id = %claims.user_id, "Token expired");
            return None;
        }
        Some(claims)
    }
}

#[async_trait]
impl UserDirectory for FsUserDirectory {
    async fn login(&self, user_id: &str, password: &str) -> Result<LoginResult> {
        let Some(user) = self.users.get(user_id) else {
            warn!(user_id, "Login for unknown user");
            return Err(Error::Unauthorized("Invalid user ID".to_string()));
        };

        if !verify_password(password.to_string(), user.password_hash.clone()).await? {
            warn!(user_id, "Login with wrong password");
            return Err(Error::Unauthorized("Invalid password".to_string()));
        }

        let token = self.issue_token(user)?;
        info!(user_id, "User logged in");
        Ok(LoginResult {
            token,
            user: PublicUser::from(user),
        })
    }

    async fn verify_token(&self, token: &str) -> Option<Identity> {
        let claims = self.decode_token(token)?;
        let user = self.users.get(&claims.user_id)?;
        Some(Identity {
            user_id: user.id.clone(),
            name: user.name.clone(),
        })
    }

    async fn users(&self) -> Result<Vec<PublicUser>> {
        Ok(self.users.values().map(PublicUser::from).collect())
    }
}

/// Hash a password into an Argon2id PHC string off the async runtime.
pub async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let mut salt_bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| Error::Internal(format!("Salt encoding failed: {}", e)))?;
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::Internal(format!("Password hashing failed: {}", e)))
    })
    .await
    .map_err(|e| Error::Internal(format!("Hashing task failed: {}", e)))?
}

async fn verify_password(password: String, phc: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&phc)
            .map_err(|e| Error::Internal(format!("Stored password hash is invalid: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| Error::Internal(format!("Verification task failed: {}", e)))?
}
