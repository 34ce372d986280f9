//! Accounts: signup, login, profile lookup and username change

use bson::oid::ObjectId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tracing::{info, warn};

use crate::auth::{check_password_policy, hash_password, verify_password, JwtValidator};
use crate::db::schemas::{PublicUser, UserDoc};
use crate::store::{ContentStore, UserStore};
use crate::types::{BattleError, Result};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 30;

#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Token plus the account it was issued for
#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub message: &'static str,
    pub token: String,
    pub user: PublicUser,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn username_problem(username: &str) -> Option<String> {
    let len = username.chars().count();
    if len < USERNAME_MIN {
        Some(format!("Username must be at least {} characters", USERNAME_MIN))
    } else if len > USERNAME_MAX {
        Some(format!("Username cannot exceed {} characters", USERNAME_MAX))
    } else {
        None
    }
}

/// Non-blank local part, `@`, and a dotted domain, with no whitespace
static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern compiles"));

fn is_valid_email(email: &str) -> bool {
    EMAIL_SHAPE.is_match(email)
}

pub struct Accounts {
    store: Arc<dyn ContentStore>,
    jwt: JwtValidator,
}

impl Accounts {
    pub fn new(store: Arc<dyn ContentStore>, jwt: JwtValidator) -> Self {
        Self { store, jwt }
    }

    pub async fn signup(&self, req: SignupRequest) -> Result<AuthSession> {
        let (username, email, password) = match (
            non_empty(req.username),
            non_empty(req.email),
            non_empty(req.password),
        ) {
            (Some(u), Some(e), Some(p)) => (u.trim().to_string(), e.trim().to_lowercase(), p),
            _ => {
                return Err(BattleError::InvalidArgument(
                    "Please provide username, email, and password".into(),
                ))
            }
        };

        // Report every field problem at once
        let mut problems = Vec::new();
        problems.extend(username_problem(&username));
        if !is_valid_email(&email) {
            problems.push("Please enter a valid email".to_string());
        }
        if let Err(e) = check_password_policy(&password) {
            problems.push(e.to_string());
        }
        if !problems.is_empty() {
            return Err(BattleError::InvalidArgument(problems.join(", ")));
        }

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(BattleError::Conflict("Email already registered".into()));
        }
        if self.store.find_user_by_username(&username).await?.is_some() {
            return Err(BattleError::Conflict("Username already taken".into()));
        }

        let password_hash = hash_password(&password)?;
        let user = self
            .store
            .insert_user(UserDoc::new(username, email, password_hash))
            .await?;
        let user_id = user
            ._id
            .ok_or_else(|| BattleError::Internal("Inserted user has no id".into()))?;

        info!(user_id = %user_id, username = %user.username, "User signed up");

        Ok(AuthSession {
            message: "User created successfully",
            token: self.jwt.generate_token(&user_id)?,
            user: user.public(),
        })
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthSession> {
        let (email, password) = match (non_empty(req.email), non_empty(req.password)) {
            (Some(e), Some(p)) => (e.trim().to_lowercase(), p),
            _ => {
                return Err(BattleError::InvalidArgument(
                    "Please provide email and password".into(),
                ))
            }
        };

        let rejected = || BattleError::Unauthenticated("Invalid email or password".into());

        let user = self.store.find_user_by_email(&email).await?.ok_or_else(rejected)?;
        if !verify_password(&password, &user.password_hash)? {
            warn!(user_id = ?user._id, "Failed login attempt");
            return Err(rejected());
        }
        let user_id = user
            ._id
            .ok_or_else(|| BattleError::Internal("Stored user has no id".into()))?;

        Ok(AuthSession {
            message: "Login successful",
            token: self.jwt.generate_token(&user_id)?,
            user: user.public(),
        })
    }

    pub async fn me(&self, user_id: &ObjectId) -> Result<PublicUser> {
        self.store
            .find_user(user_id)
            .await?
            .map(|u| u.public())
            .ok_or_else(|| BattleError::NotFound("User not found".into()))
    }

    pub async fn update_username(&self, user_id: &ObjectId, username: Option<String>) -> Result<PublicUser> {
        let username = non_empty(username)
            .map(|u| u.trim().to_string())
            .ok_or_else(|| BattleError::InvalidArgument("Username is required".into()))?;

        if username_problem(&username).is_some() {
            return Err(BattleError::InvalidArgument(format!(
                "Username must be between {} and {} characters",
                USERNAME_MIN, USERNAME_MAX
            )));
        }

        if let Some(existing) = self.store.find_user_by_username(&username).await? {
            if existing._id != Some(*user_id) {
                return Err(BattleError::Conflict("Username already taken".into()));
            }
        }

        let user = self
            .store
            .update_username(user_id, &username)
            .await?
            .ok_or_else(|| BattleError::NotFound("User not found".into()))?;

        info!(user_id = %user_id, username = %user.username, "Username updated");
        Ok(user.public())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn accounts() -> Accounts {
        let jwt = JwtValidator::new("accounts-test-secret-at-least-32-chars".into(), 3600).unwrap();
        Accounts::new(Arc::new(MemoryStore::new()), jwt)
    }

    fn signup(username: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            username: Some(username.into()),
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("cat@example.com"));
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("cat@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("cat@.com"));
        assert!(!is_valid_email("cat@example."));
        assert!(!is_valid_email("c at@example.com"));

        // Greedy \S+ lets the domain carry further '@' and trailing dots
        assert!(is_valid_email("a@b.c@"));
        assert!(is_valid_email("x@y.z@w"));
        assert!(is_valid_email("a@b.c.@"));
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let accounts = accounts();

        let session = accounts
            .signup(signup(" grumpy ", "Grumpy@Example.com", "tardar-sauce"))
            .await
            .unwrap();
        assert_eq!(session.user.username, "grumpy");
        assert_eq!(session.user.email, "grumpy@example.com");

        let claims = accounts.jwt.verify_token(&session.token).into_claims().unwrap();
        assert_eq!(claims.user_id, session.user.id);

        let login = accounts
            .login(LoginRequest {
                email: Some("GRUMPY@example.com".into()),
                password: Some("tardar-sauce".into()),
            })
            .await
            .unwrap();
        assert_eq!(login.user.id, session.user.id);
        assert_eq!(login.message, "Login successful");
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let accounts = accounts();

        let missing = accounts
            .signup(SignupRequest {
                username: Some("x".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(missing.to_string(), "Please provide username, email, and password");

        let invalid = accounts
            .signup(signup("ab", "not-an-email", "123"))
            .await
            .unwrap_err();
        assert_eq!(
            invalid.to_string(),
            "Username must be at least 3 characters, Please enter a valid email, \
             Password must be at least 6 characters"
        );
    }

    #[tokio::test]
    async fn test_duplicates_conflict() {
        let accounts = accounts();
        accounts
            .signup(signup("keyboardcat", "kc@example.com", "play-him-off"))
            .await
            .unwrap();

        let email = accounts
            .signup(signup("pianocat", "KC@example.com", "play-him-off"))
            .await;
        assert!(matches!(email, Err(BattleError::Conflict(m)) if m == "Email already registered"));

        let name = accounts
            .signup(signup("keyboardcat", "other@example.com", "play-him-off"))
            .await;
        assert!(matches!(name, Err(BattleError::Conflict(m)) if m == "Username already taken"));
    }

    #[tokio::test]
    async fn test_login_does_not_say_which_part_failed() {
        let accounts = accounts();
        accounts
            .signup(signup("lolcat", "lol@example.com", "i-can-has"))
            .await
            .unwrap();

        let wrong_password = accounts
            .login(LoginRequest {
                email: Some("lol@example.com".into()),
                password: Some("cheezburger".into()),
            })
            .await
            .unwrap_err();
        let unknown_email = accounts
            .login(LoginRequest {
                email: Some("nobody@example.com".into()),
                password: Some("cheezburger".into()),
            })
            .await
            .unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert!(matches!(wrong_password, BattleError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_update_username() {
        let accounts = accounts();
        let a = accounts
            .signup(signup("first", "first@example.com", "secret1"))
            .await
            .unwrap();
        accounts
            .signup(signup("second", "second@example.com", "secret2"))
            .await
            .unwrap();
        let a_id = ObjectId::parse_str(&a.user.id).unwrap();

        let taken = accounts.update_username(&a_id, Some("second".into())).await;
        assert!(matches!(taken, Err(BattleError::Conflict(_))));

        let short = accounts.update_username(&a_id, Some("no".into())).await;
        assert!(matches!(short, Err(BattleError::InvalidArgument(_))));

        let blank = accounts.update_username(&a_id, Some("   ".into())).await;
        assert!(matches!(blank, Err(BattleError::InvalidArgument(m)) if m == "Username is required"));

        // Re-saving your own name is fine
        let same = accounts.update_username(&a_id, Some("first".into())).await.unwrap();
        assert_eq!(same.username, "first");

        let renamed = accounts.update_username(&a_id, Some(" third ".into())).await.unwrap();
        assert_eq!(renamed.username, "third");
        assert_eq!(accounts.me(&a_id).await.unwrap().username, "third");

        let gone = accounts.me(&ObjectId::new()).await;
        assert!(matches!(gone, Err(BattleError::NotFound(_))));
    }
}
