use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use super::dto::{
    field_errors, parse_assignable, ChangePasswordRequest, CreateUserRequest, PageParams,
    Pagination, PatchUserRequest, UpdateUserRequest, UserPage,
};
use super::password::PasswordHashing;
use super::repo::UserStore;
use super::repo_types::{NewUser, RestrictionStatus, User};
use crate::config::PaginationConfig;
use crate::error::UserError;

pub async fn list_users(
    store: &dyn UserStore,
    cfg: &PaginationConfig,
    params: PageParams,
) -> Result<UserPage, UserError> {
    let (per_page, page) = page_window(cfg, &params);
    let offset = (page - 1).saturating_mul(per_page);
    let result = store.page(per_page, offset).await?;
    debug!(total = result.total, page, per_page, "users page loaded");
    let pagination = pagination(result.total, page, per_page, result.items.len() as i64);
    Ok(UserPage {
        data: result.items,
        pagination,
    })
}

pub async fn create_user(
    store: &dyn UserStore,
    hasher: &dyn PasswordHashing,
    req: CreateUserRequest,
) -> Result<User, UserError> {
    let mut errors = match req.validate() {
        Ok(()) => Default::default(),
        Err(e) => field_errors(&e),
    };
    if let (Some(email), false) = (&req.email, errors.contains_key("email")) {
        if store.email_taken(email).await? {
            errors
                .entry("email".to_string())
                .or_default()
                .push("The email has already been taken.".to_string());
        }
    }
    if !errors.is_empty() {
        return Err(UserError::Validation(errors));
    }

    let password = present("password", req.password)?;
    let new = NewUser {
        name: present("name", req.name)?,
        lastname: present("lastname", req.lastname)?,
        email: present("email", req.email)?,
        phone: present("phone", req.phone)?,
        password: hasher.hash(&password)?,
        created_by: present("created_by", req.created_by)?,
    };
    let user = store.insert(new).await?;
    info!(user_id = %user.id, created_by = %user.created_by, "user created");
    Ok(user)
}

pub async fn get_user(store: &dyn UserStore, id: Uuid) -> Result<User, UserError> {
    store.find(id).await?.ok_or(UserError::NotFound)
}

// The update operations take the already loaded `user`, so a missing id is
// reported before anything in the request body is looked at.

/// Full update: every attribute is overwritten and the password is always rehashed.
pub async fn replace_user(
    store: &dyn UserStore,
    hasher: &dyn PasswordHashing,
    mut user: User,
    req: UpdateUserRequest,
) -> Result<User, UserError> {
    req.validate()
        .map_err(|e| UserError::Validation(field_errors(&e)))?;

    let password = present("password", req.password)?;
    user.name = present("name", req.name)?;
    user.lastname = present("lastname", req.lastname)?;
    user.email = present("email", req.email)?;
    user.phone = present("phone", req.phone)?;
    user.password = hasher.hash(&password)?;
    if let Some(status) = req.is_restricted.as_deref() {
        user.is_restricted = assignable(status)?;
    }

    let user = store.save(&user).await?;
    info!(user_id = %user.id, "user replaced");
    Ok(user)
}

/// Partial update: only attributes present in the request are touched.
pub async fn patch_user(
    store: &dyn UserStore,
    hasher: &dyn PasswordHashing,
    mut user: User,
    req: PatchUserRequest,
) -> Result<User, UserError> {
    req.validate()
        .map_err(|e| UserError::Validation(field_errors(&e)))?;

    if let Some(name) = req.name {
        user.name = name;
    }
    if let Some(lastname) = req.lastname {
        user.lastname = lastname;
    }
    if let Some(email) = req.email {
        user.email = email;
    }
    if let Some(phone) = req.phone {
        user.phone = phone;
    }
    if let Some(password) = req.password {
        user.password = hasher.hash(&password)?;
    }
    if let Some(status) = req.is_restricted.as_deref() {
        user.is_restricted = assignable(status)?;
    }

    let user = store.save(&user).await?;
    info!(user_id = %user.id, "user patched");
    Ok(user)
}

pub async fn restrict_user(store: &dyn UserStore, id: Uuid) -> Result<User, UserError> {
    let mut user = get_user(store, id).await?;
    let from = user.is_restricted;
    user.is_restricted = from.restricted();
    let user = store.save(&user).await?;
    info!(user_id = %user.id, %from, to = %user.is_restricted, "user restriction toggled");
    Ok(user)
}

pub async fn delete_user(store: &dyn UserStore, id: Uuid) -> Result<(), UserError> {
    if !store.delete(id).await? {
        return Err(UserError::NotFound);
    }
    info!(user_id = %id, "user deleted");
    Ok(())
}

pub async fn change_password(
    store: &dyn UserStore,
    hasher: &dyn PasswordHashing,
    mut user: User,
    req: ChangePasswordRequest,
) -> Result<(), UserError> {
    let id = user.id;
    let current = req.current_password.as_deref().unwrap_or_default();
    if current.is_empty() || !hasher.verify(current, &user.password)? {
        warn!(user_id = %id, "current password mismatch");
        return Err(UserError::InvalidCurrentPassword);
    }

    req.validate()
        .map_err(|e| UserError::Validation(field_errors(&e)))?;
    let new_password = present("new_password", req.new_password)?;

    user.password = hasher.hash(&new_password)?;
    store.save(&user).await?;
    info!(user_id = %id, "password changed");
    Ok(())
}

/// Resolves `(per_page, page)` from the query, falling back to configured defaults.
fn page_window(cfg: &PaginationConfig, params: &PageParams) -> (i64, i64) {
    let per_page = match params.per_page {
        Some(n) if n >= 1 => n.min(cfg.max_per_page.max(1)),
        _ => cfg.default_per_page.max(1),
    };
    let page = params.page.filter(|p| *p >= 1).unwrap_or(1);
    (per_page, page)
}

fn pagination(total: i64, page: i64, per_page: i64, count: i64) -> Pagination {
    let last_page = ((total + per_page - 1) / per_page).max(1);
    let (from, to) = if count > 0 {
        let from = (page - 1) * per_page + 1;
        (Some(from), Some(from + count - 1))
    } else {
        (None, None)
    };
    Pagination {
        total,
        current_page: page,
        last_page,
        per_page,
        from,
        to,
    }
}

fn present(field: &str, value: Option<String>) -> Result<String, UserError> {
    value.ok_or_else(|| {
        UserError::invalid(
            field,
            format!("The {} field is required.", field.replace('_', " ")),
        )
    })
}

fn assignable(raw: &str) -> Result<RestrictionStatus, UserError> {
    parse_assignable(raw)
        .ok_or_else(|| UserError::invalid("is_restricted", "The selected is restricted is invalid."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::memory::MemoryUserStore;
    use crate::users::password::Argon2Hashing;

    fn new_user(email: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: Some("Ana".into()),
            lastname: Some("Perez".into()),
            email: Some(email.into()),
            phone: Some("5512345678".into()),
            password: Some("secreto1".into()),
            created_by: Some("admin".into()),
        }
    }

    #[test]
    fn page_window_applies_defaults_and_bounds() {
        let cfg = PaginationConfig::default();
        assert_eq!(page_window(&cfg, &PageParams::default()), (10, 1));
        let p = PageParams {
            per_page: Some(0),
            page: Some(-3),
        };
        assert_eq!(page_window(&cfg, &p), (10, 1));
        let p = PageParams {
            per_page: Some(5000),
            page: Some(2),
        };
        assert_eq!(page_window(&cfg, &p), (100, 2));
    }

    #[test]
    fn pagination_meta_matches_page_position() {
        let meta = pagination(23, 3, 10, 3);
        assert_eq!(meta.last_page, 3);
        assert_eq!(meta.from, Some(21));
        assert_eq!(meta.to, Some(23));

        let empty = pagination(0, 1, 10, 0);
        assert_eq!(empty.last_page, 1);
        assert_eq!(empty.from, None);
        assert_eq!(empty.to, None);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_validation_error() {
        let store = MemoryUserStore::default();
        create_user(&store, &Argon2Hashing, new_user("ana@example.com"))
            .await
            .unwrap();
        let err = create_user(&store, &Argon2Hashing, new_user("ana@example.com"))
            .await
            .unwrap_err();
        match err {
            UserError::Validation(map) => {
                assert_eq!(map["email"], vec!["The email has already been taken."])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn created_user_starts_valid_with_hashed_password() {
        let store = MemoryUserStore::default();
        let user = create_user(&store, &Argon2Hashing, new_user("ana@example.com"))
            .await
            .unwrap();
        assert_eq!(user.is_restricted, RestrictionStatus::Valido);
        assert_ne!(user.password, "secreto1");
        assert!(Argon2Hashing.verify("secreto1", &user.password).unwrap());
    }

    #[tokio::test]
    async fn missing_user_is_not_found_everywhere() {
        let store = MemoryUserStore::default();
        let id = Uuid::new_v4();
        assert!(matches!(get_user(&store, id).await, Err(UserError::NotFound)));
        assert!(matches!(restrict_user(&store, id).await, Err(UserError::NotFound)));
        assert!(matches!(delete_user(&store, id).await, Err(UserError::NotFound)));
    }

    #[tokio::test]
    async fn empty_patch_changes_nothing() {
        let store = MemoryUserStore::default();
        let user = create_user(&store, &Argon2Hashing, new_user("ana@example.com"))
            .await
            .unwrap();
        let patched = patch_user(&store, &Argon2Hashing, user.clone(), PatchUserRequest::default())
            .await
            .unwrap();
        assert_eq!(patched.name, user.name);
        assert_eq!(patched.phone, user.phone);
        assert_eq!(patched.password, user.password);
        assert_eq!(patched.is_restricted, user.is_restricted);
    }

    #[tokio::test]
    async fn empty_password_request_is_a_mismatch() {
        let store = MemoryUserStore::default();
        let user = create_user(&store, &Argon2Hashing, new_user("ana@example.com"))
            .await
            .unwrap();
        assert!(matches!(
            change_password(&store, &Argon2Hashing, user, ChangePasswordRequest::default()).await,
            Err(UserError::InvalidCurrentPassword)
        ));
    }

    #[tokio::test]
    async fn full_update_without_status_keeps_current_one() {
        let store = MemoryUserStore::default();
        let user = create_user(&store, &Argon2Hashing, new_user("ana@example.com"))
            .await
            .unwrap();
        let restricted = restrict_user(&store, user.id).await.unwrap();
        let req = UpdateUserRequest {
            name: Some("Ana".into()),
            lastname: Some("Lopez".into()),
            email: Some("ana@example.com".into()),
            phone: Some("5512345678".into()),
            password: Some("secreto1".into()),
            is_restricted: None,
        };
        let updated = replace_user(&store, &Argon2Hashing, restricted, req).await.unwrap();
        assert_eq!(updated.lastname, "Lopez");
        assert_eq!(updated.is_restricted, RestrictionStatus::Invalido);
        assert_ne!(updated.password, user.password);
    }

    #[tokio::test]
    async fn short_new_password_is_rejected_after_current_check() {
        let store = MemoryUserStore::default();
        let user = create_user(&store, &Argon2Hashing, new_user("ana@example.com"))
            .await
            .unwrap();

        let wrong_and_short = ChangePasswordRequest {
            current_password: Some("nope".into()),
            new_password: Some("123".into()),
        };
        assert!(matches!(
            change_password(&store, &Argon2Hashing, user.clone(), wrong_and_short).await,
            Err(UserError::InvalidCurrentPassword)
        ));

        let right_but_short = ChangePasswordRequest {
            current_password: Some("secreto1".into()),
            new_password: Some("123".into()),
        };
        match change_password(&store, &Argon2Hashing, user.clone(), right_but_short).await {
            Err(UserError::Validation(map)) => assert!(map.contains_key("new_password")),
            other => panic!("unexpected result: {other:?}"),
        }
        let stored = get_user(&store, user.id).await.unwrap();
        assert_eq!(stored.password, user.password);
    }
}
