use super::error::ServiceError;
use crate::models::{Item, LoginRequest, NewSession, NewUser, RegisterRequest, TokenResponse, User, UserInfo};
use crate::store::{Store, StoreError};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use uuid::Uuid;

pub const TOKEN_TYPE: &str = "bearer";

/// Why a bearer token did not resolve to a usable account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    InvalidToken,
    InactiveUser,
}

pub fn register_user(store: &dyn Store, req: &RegisterRequest) -> Result<UserInfo, ServiceError> {
    let username = req.username.trim();
    let email = req.email.trim();

    if username.is_empty() {
        return Err(ServiceError::InvalidRequest("Username must not be empty".to_string()));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(ServiceError::InvalidRequest("A valid email address is required".to_string()));
    }
    if req.password.is_empty() {
        return Err(ServiceError::InvalidRequest("Password must not be empty".to_string()));
    }

    // Check if user already exists
    if store.user_by_email(email)?.is_some() {
        return Err(ServiceError::Conflict("Email already registered".to_string()));
    }
    if store.user_by_username(username)?.is_some() {
        return Err(ServiceError::Conflict("Username already taken".to_string()));
    }

    let hashed_password = hash(&req.password, DEFAULT_COST)?;

    let new_user = NewUser {
        username,
        email,
        full_name: req.full_name.as_deref().map(str::trim).filter(|name| !name.is_empty()),
        password_hash: &hashed_password,
    };

    let user = store.insert_user(new_user).map_err(|e| match e {
        // Lost a race with a concurrent registration.
        StoreError::UniqueViolation(_) => ServiceError::Conflict("Username or email already registered".to_string()),
        other => other.into(),
    })?;

    tracing::info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user.into())
}

/// Looks a user up by username first, then by email.
pub fn find_by_identifier(store: &dyn Store, identifier: &str) -> Result<Option<User>, ServiceError> {
    if let Some(user) = store.user_by_username(identifier)? {
        return Ok(Some(user));
    }
    Ok(store.user_by_email(identifier)?)
}

pub fn login_user(store: &dyn Store, req: &LoginRequest, session_ttl: Duration) -> Result<TokenResponse, ServiceError> {
    let bad_credentials = || ServiceError::Unauthorized("Incorrect username or password".to_string());

    let user = find_by_identifier(store, req.username.trim())?.ok_or_else(bad_credentials)?;
    if !verify(&req.password, &user.password_hash)? {
        return Err(bad_credentials());
    }
    if !user.is_active {
        return Err(ServiceError::Forbidden("Inactive user".to_string()));
    }

    let session = store.insert_session(NewSession {
        user_id: user.id,
        expires_at: Utc::now().naive_utc() + session_ttl,
    })?;

    tracing::info!(user_id = %user.id, "session opened");
    Ok(TokenResponse {
        access_token: session.id.to_string(),
        token_type: TOKEN_TYPE.to_string(),
    })
}

/// Ends the session behind `token`. Unknown or malformed tokens are ignored.
pub fn logout_user(store: &dyn Store, token: &str) -> Result<(), ServiceError> {
    let Ok(session_id) = Uuid::parse_str(token) else {
        return Ok(());
    };
    store.delete_session(session_id)?;
    Ok(())
}

/// Resolves a bearer token to its user. Expired sessions are removed.
pub fn authenticate(store: &dyn Store, token: &str) -> Result<Result<User, AuthFailure>, ServiceError> {
    let Ok(session_id) = Uuid::parse_str(token) else {
        return Ok(Err(AuthFailure::InvalidToken));
    };
    let Some(session) = store.session_by_id(session_id)? else {
        return Ok(Err(AuthFailure::InvalidToken));
    };
    if session.expires_at <= Utc::now().naive_utc() {
        store.delete_session(session.id)?;
        return Ok(Err(AuthFailure::InvalidToken));
    }
    match store.user_by_id(session.user_id)? {
        Some(user) if user.is_active => Ok(Ok(user)),
        Some(_) => Ok(Err(AuthFailure::InactiveUser)),
        None => Ok(Err(AuthFailure::InvalidToken)),
    }
}

pub fn list_users(store: &dyn Store, skip: i64, limit: i64) -> Result<Vec<UserInfo>, ServiceError> {
    Ok(store.list_users(skip, limit)?.into_iter().map(UserInfo::from).collect())
}

pub fn user_items(store: &dyn Store, user_id: Uuid) -> Result<Vec<Item>, ServiceError> {
    if store.user_by_id(user_id)?.is_none() {
        return Err(ServiceError::NotFound("User not found".to_string()));
    }
    Ok(store.items_by_owner(user_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn register(store: &dyn Store, username: &str, email: &str) -> UserInfo {
        register_user(
            store,
            &RegisterRequest {
                username: username.into(),
                email: email.into(),
                password: "hunter22".into(),
                full_name: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn login_accepts_email_as_identifier() {
        let store = MemoryStore::new();
        let user = register(&store, "casey", "casey@example.com");
        let token = login_user(
            &store,
            &LoginRequest { username: "casey@example.com".into(), password: "hunter22".into() },
            Duration::minutes(5),
        )
        .unwrap();
        let resolved = authenticate(&store, &token.access_token).unwrap().unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[test]
    fn expired_sessions_are_rejected_and_removed() {
        let store = MemoryStore::new();
        let user = register(&store, "robin", "robin@example.com");
        let session = store
            .insert_session(NewSession { user_id: user.id, expires_at: Utc::now().naive_utc() - Duration::minutes(1) })
            .unwrap();
        let outcome = authenticate(&store, &session.id.to_string()).unwrap();
        assert_eq!(outcome.unwrap_err(), AuthFailure::InvalidToken);
        assert!(store.session_by_id(session.id).unwrap().is_none());
    }

    #[test]
    fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        register(&store, "alex", "alex@example.com");
        let err = register_user(
            &store,
            &RegisterRequest {
                username: "alex2".into(),
                email: "alex@example.com".into(),
                password: "pw".into(),
                full_name: None,
            },
        )
        .unwrap_err();
        assert_eq!(err, ServiceError::Conflict("Email already registered".to_string()));
    }
}
