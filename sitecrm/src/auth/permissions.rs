//! Access control rules.
//!
//! There are two roles. Admins may do anything. Regular users see and modify rows that are
//! either unowned or owned by themselves, and may only assign rows to themselves. Rows outside a
//! user's view are reported as missing rather than forbidden, so their existence is not leaked.

use crate::{
    api::models::users::CurrentUser,
    errors::Error,
    types::{Operation, Resource, UserId},
};

/// Fail with 403 unless the caller is an admin.
pub fn require_admin(user: &CurrentUser, action: Operation, resource: Resource) -> Result<(), Error> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(Error::InsufficientPermissions { action, resource })
    }
}

/// The owner restriction to apply when listing: `None` for admins, the caller's id otherwise.
pub fn visibility_scope(user: &CurrentUser) -> Option<UserId> {
    if user.is_admin() { None } else { Some(user.id) }
}

/// Whether `user` may see a row owned by `owner`.
pub fn can_see(user: &CurrentUser, owner: Option<UserId>) -> bool {
    user.is_admin() || owner.is_none_or(|owner| owner == user.id)
}

/// 404 unless `user` may see a row owned by `owner`.
pub fn ensure_visible(user: &CurrentUser, owner: Option<UserId>, resource: &str, id: i64) -> Result<(), Error> {
    if can_see(user, owner) {
        Ok(())
    } else {
        Err(Error::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        })
    }
}

/// Check a requested owner assignment. Regular users may only assign rows to themselves.
pub fn ensure_can_assign(user: &CurrentUser, requested: Option<UserId>, action: Operation, resource: Resource) -> Result<(), Error> {
    match requested {
        Some(owner) if owner != user.id && !user.is_admin() => Err(Error::InsufficientPermissions { action, resource }),
        _ => Ok(()),
    }
}

/// Resolve the owner of a newly created row: the requested owner if allowed, else the caller.
///
/// When the row ends up owned by the caller and no owner name was supplied, the caller's full
/// name (or email) is used.
pub fn resolve_new_owner(
    user: &CurrentUser,
    requested: Option<UserId>,
    owner_name: Option<String>,
    resource: Resource,
) -> Result<(UserId, Option<String>), Error> {
    ensure_can_assign(user, requested, Operation::CreateAll, resource)?;
    let owner = requested.unwrap_or(user.id);
    let owner_name = match owner_name {
        Some(name) => Some(name),
        None if owner == user.id => Some(user.full_name.clone().unwrap_or_else(|| user.email.clone())),
        None => None,
    };
    Ok((owner, owner_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;

    fn user(id: UserId, role: Role) -> CurrentUser {
        CurrentUser {
            id,
            email: format!("user{id}@example.com"),
            full_name: Some(format!("User {id}")),
            role,
        }
    }

    #[test]
    fn test_admin_sees_everything() {
        let admin = user(1, Role::Admin);
        assert!(can_see(&admin, None));
        assert!(can_see(&admin, Some(99)));
        assert_eq!(visibility_scope(&admin), None);
    }

    #[test]
    fn test_user_sees_own_and_unowned() {
        let u = user(2, Role::User);
        assert!(can_see(&u, None));
        assert!(can_see(&u, Some(2)));
        assert!(!can_see(&u, Some(3)));
        assert_eq!(visibility_scope(&u), Some(2));
        assert!(matches!(ensure_visible(&u, Some(3), "Deal", 10), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_user_cannot_assign_to_others() {
        let u = user(2, Role::User);
        let err = resolve_new_owner(&u, Some(3), None, Resource::Deals).unwrap_err();
        assert!(matches!(err, Error::InsufficientPermissions { .. }));

        let (owner, name) = resolve_new_owner(&u, None, None, Resource::Deals).unwrap();
        assert_eq!(owner, 2);
        assert_eq!(name.as_deref(), Some("User 2"));
    }

    #[test]
    fn test_admin_can_assign_to_others() {
        let admin = user(1, Role::Admin);
        let (owner, name) = resolve_new_owner(&admin, Some(5), None, Resource::Leads).unwrap();
        assert_eq!(owner, 5);
        assert_eq!(name, None);

        let (_, name) = resolve_new_owner(&admin, Some(5), Some("Pat".to_string()), Resource::Leads).unwrap();
        assert_eq!(name.as_deref(), Some("Pat"));
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&user(1, Role::Admin), Operation::CreateAll, Resource::Workspaces).is_ok());
        assert!(require_admin(&user(2, Role::User), Operation::CreateAll, Resource::Workspaces).is_err());
    }
}
