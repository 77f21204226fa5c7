use crate::cli::Role;
use crate::domain::constants::USERS;
use crate::domain::models::{Stored, UserProfile};
use crate::error::AppError;
use crate::fields;
use crate::services::storage::audit;
use crate::session::Session;
use crate::store::{fetch_all, Direction, DocumentStore, Query};

pub fn list(store: &dyn DocumentStore, session: &Session) -> anyhow::Result<Vec<Stored<UserProfile>>> {
    session.require_admin(store)?;
    let query = Query::new().order_by("email", Direction::Asc);
    Ok(fetch_all::<UserProfile>(store, USERS, &query).map_err(AppError::load("loading users"))?)
}

pub fn set_role(
    store: &mut dyn DocumentStore,
    session: &Session,
    email: &str,
    role: Role,
) -> anyhow::Result<Stored<UserProfile>> {
    let admin = session.require_admin(store)?;
    let email = email.trim().to_lowercase();
    let found = fetch_all::<UserProfile>(store, USERS, &Query::new().where_eq("email", email.as_str()))
        .map_err(AppError::load("loading users"))?;
    let Some(mut user) = found.into_iter().next() else {
        return Err(AppError::NotFound(format!("no user with email {}", email)).into());
    };
    if user.id == admin.uid && role != Role::Admin {
        return Err(AppError::Validation("admins cannot demote themselves".to_string()).into());
    }
    store
        .update(USERS, &user.id, fields! {"role" => role})
        .map_err(AppError::save("updating role"))?;
    user.doc.role = role;
    tracing::info!(uid = %user.id, ?role, "role changed");
    audit(
        "set_role",
        serde_json::json!({"uid": user.id, "email": email, "role": role}),
    );
    Ok(user)
}
