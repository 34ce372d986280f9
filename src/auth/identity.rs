//! Caller identity from a bearer token
//!
//! Protected actions go through [`Identity::verify`], which also checks that
//! the account behind the token still exists. Read-only routes that merely
//! personalize their output use [`Identity::verify_optional`].

use bson::oid::ObjectId;
use std::sync::Arc;
use tracing::debug;

use crate::auth::jwt::{extract_token_from_header, JwtValidator};
use crate::store::{ContentStore, UserStore};
use crate::types::{BattleError, Result};

#[derive(Clone)]
pub struct Identity {
    jwt: JwtValidator,
    store: Arc<dyn ContentStore>,
}

impl Identity {
    pub fn new(jwt: JwtValidator, store: Arc<dyn ContentStore>) -> Self {
        Self { jwt, store }
    }

    pub fn jwt(&self) -> &JwtValidator {
        &self.jwt
    }

    /// Resolve the caller or fail with Unauthenticated
    pub async fn verify(&self, auth_header: Option<&str>) -> Result<ObjectId> {
        let token = extract_token_from_header(auth_header).ok_or_else(|| {
            BattleError::Unauthenticated("No token provided. Please login.".into())
        })?;

        let user_id = self.jwt.verify_token(token).into_claims()?.user_object_id()?;

        match self.store.find_user(&user_id).await? {
            Some(_) => Ok(user_id),
            None => Err(BattleError::Unauthenticated("User no longer exists".into())),
        }
    }

    /// Resolve the caller if a valid token for an existing user is present.
    /// Never fails; anything short of that reads as anonymous.
    pub async fn verify_optional(&self, auth_header: Option<&str>) -> Option<ObjectId> {
        // Anonymous reads are the common case and not worth a log line
        auth_header?;

        match self.verify(auth_header).await {
            Ok(user_id) => Some(user_id),
            Err(e) => {
                debug!("Ignoring unusable token on optional auth: {}", e);
                None
            }
        }
    }
}
