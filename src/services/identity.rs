use crate::cli::Role;
use crate::config::Config;
use crate::domain::constants::{
    CREDENTIALS, MIN_PASSWORD_CHARS, MIN_WAR_NAME_CHARS, RANK_OPTIONS, USERS,
};
use crate::domain::models::{Credential, SessionFile, SessionInfo, Stored, UserProfile};
use crate::error::AppError;
use crate::services::storage::{audit, clear_session, now_ms, save_session};
use crate::session::Session;
use crate::store::{fetch, fetch_all, new_id, DocumentStore, Query, WriteBatch};
use rand::RngCore;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use subtle::ConstantTimeEq;

#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

/// Email/password accounts. Profiles live in `users`; the provider only owns
/// credentials.
pub trait IdentityProvider {
    fn create_user(
        &self,
        store: &mut dyn DocumentStore,
        email: &str,
        password: &str,
    ) -> Result<Identity, AppError>;

    fn authenticate(
        &self,
        store: &dyn DocumentStore,
        email: &str,
        password: &str,
    ) -> Result<Identity, AppError>;
}

/// Salted SHA-256 credentials kept in the document store.
pub struct LocalIdentity;

fn is_email_shaped(email: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\S+@\S+\.\S+").ok())
        .as_ref()
        .map(|re| re.is_match(email))
        .unwrap_or(false)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

fn find_credential(
    store: &dyn DocumentStore,
    email: &str,
) -> Result<Option<Stored<Credential>>, AppError> {
    let found = fetch_all::<Credential>(store, CREDENTIALS, &Query::new().where_eq("email", email))
        .map_err(AppError::load("reading credentials"))?;
    Ok(found.into_iter().next())
}

impl IdentityProvider for LocalIdentity {
    fn create_user(
        &self,
        store: &mut dyn DocumentStore,
        email: &str,
        password: &str,
    ) -> Result<Identity, AppError> {
        let email = normalize_email(email);
        if !is_email_shaped(&email) {
            return Err(AppError::Validation("invalid email".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AppError::Validation(format!(
                "password must have at least {} characters",
                MIN_PASSWORD_CHARS
            )));
        }
        if find_credential(store, &email)?.is_some() {
            return Err(AppError::Validation(
                "this email is already in use".to_string(),
            ));
        }

        let mut salt = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        let credential = Credential {
            email: email.clone(),
            salt: hex::encode(salt),
            hash: hex::encode(hash_password(&salt, password)),
            created_at: now_ms(),
        };
        let uid = new_id();
        let mut batch = WriteBatch::new();
        batch
            .set(CREDENTIALS, &uid, &credential)
            .map_err(AppError::save("creating account"))?;
        store
            .commit(batch)
            .map_err(AppError::save("creating account"))?;
        Ok(Identity { uid, email })
    }

    fn authenticate(
        &self,
        store: &dyn DocumentStore,
        email: &str,
        password: &str,
    ) -> Result<Identity, AppError> {
        let email = normalize_email(email);
        if !is_email_shaped(&email) {
            return Err(AppError::Validation("invalid email".to_string()));
        }
        let Some(stored) = find_credential(store, &email)? else {
            return Err(AppError::Auth("user not found".to_string()));
        };
        let salt = hex::decode(&stored.doc.salt)
            .map_err(|_| AppError::Auth("invalid credentials".to_string()))?;
        let expected = hex::decode(&stored.doc.hash)
            .map_err(|_| AppError::Auth("invalid credentials".to_string()))?;
        let actual = hash_password(&salt, password);
        if !bool::from(actual.as_slice().ct_eq(expected.as_slice())) {
            return Err(AppError::Auth("wrong password".to_string()));
        }
        Ok(Identity {
            uid: stored.id,
            email,
        })
    }
}

pub struct SignUpForm<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub war_name: &'a str,
    pub rank: &'a str,
}

fn validate_sign_up(form: &SignUpForm) -> Result<(), AppError> {
    let mut problems = Vec::new();
    let email = form.email.trim();
    if email.is_empty() {
        problems.push("email is required".to_string());
    } else if !is_email_shaped(email) {
        problems.push("invalid email".to_string());
    }
    let war_name = form.war_name.trim();
    if war_name.is_empty() {
        problems.push("war name is required".to_string());
    } else if war_name.chars().count() < MIN_WAR_NAME_CHARS {
        problems.push(format!(
            "war name must have at least {} characters",
            MIN_WAR_NAME_CHARS
        ));
    }
    if form.rank.trim().is_empty() {
        problems.push("rank is required".to_string());
    } else if !RANK_OPTIONS.contains(&form.rank.trim()) {
        problems.push(format!("rank must be one of: {}", RANK_OPTIONS.join(", ")));
    }
    if form.password.is_empty() {
        problems.push("password is required".to_string());
    } else if form.password.chars().count() < MIN_PASSWORD_CHARS {
        problems.push(format!(
            "password must have at least {} characters",
            MIN_PASSWORD_CHARS
        ));
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(problems.join("; ")))
    }
}

fn session_info(file: &SessionFile) -> SessionInfo {
    let profile = file.profile.clone().unwrap_or_default();
    SessionInfo {
        uid: file.uid.clone(),
        email: file.email.clone(),
        rank: profile.rank,
        war_name: profile.war_name,
        role: profile.role,
    }
}

/// Creates the account and its profile, then signs the new user in.
pub fn sign_up(
    provider: &dyn IdentityProvider,
    store: &mut dyn DocumentStore,
    cfg: &Config,
    form: SignUpForm,
) -> anyhow::Result<SessionInfo> {
    validate_sign_up(&form)?;
    let identity = provider.create_user(store, form.email, form.password)?;

    let role = if cfg.is_bootstrap_admin(&identity.email) {
        Role::Admin
    } else {
        Role::User
    };
    let profile = UserProfile {
        email: identity.email.clone(),
        rank: form.rank.trim().to_string(),
        war_name: form.war_name.trim().to_string(),
        role,
        created_at: now_ms(),
    };
    let mut batch = WriteBatch::new();
    batch
        .set(USERS, &identity.uid, &profile)
        .map_err(AppError::save("writing user profile"))?;
    store
        .commit(batch)
        .map_err(AppError::save("writing user profile"))?;

    let file = SessionFile {
        uid: identity.uid.clone(),
        email: identity.email.clone(),
        profile: Some(profile),
    };
    save_session(&file)?;
    tracing::info!(uid = %identity.uid, ?role, "account created");
    audit(
        "sign_up",
        serde_json::json!({"uid": identity.uid, "email": identity.email}),
    );
    Ok(session_info(&file))
}

pub fn sign_in(
    provider: &dyn IdentityProvider,
    store: &dyn DocumentStore,
    email: &str,
    password: &str,
) -> anyhow::Result<SessionInfo> {
    let identity = provider.authenticate(store, email, password)?;
    let profile = fetch::<UserProfile>(store, USERS, &identity.uid)
        .map_err(AppError::load("reading user profile"))?
        .map(|p| p.doc)
        .unwrap_or_else(|| UserProfile {
            email: identity.email.clone(),
            ..UserProfile::default()
        });
    let file = SessionFile {
        uid: identity.uid.clone(),
        email: identity.email.clone(),
        profile: Some(profile),
    };
    save_session(&file)?;
    tracing::info!(uid = %identity.uid, "signed in");
    Ok(session_info(&file))
}

pub fn sign_out() -> anyhow::Result<bool> {
    let cleared = clear_session()?;
    if cleared {
        tracing::info!("signed out");
    }
    Ok(cleared)
}

pub fn whoami(session: &Session) -> anyhow::Result<SessionInfo> {
    Ok(session_info(session.require_user()?))
}
