//! Magic-link access resolution
//!
//! A magic link carries one bearer token. Each application row stores the
//! digests of two independent tokens: one granting read access, one
//! granting edit access. Tokens are never rotated once issued.

use crate::security::{hash_magic_link_token, secure_compare};

/// Access granted by a presented token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    None,
    View,
    Edit,
}

impl AccessLevel {
    /// Read access is granted to both view and edit tokens
    pub fn can_view(self) -> bool {
        matches!(self, AccessLevel::View | AccessLevel::Edit)
    }

    pub fn can_edit(self) -> bool {
        self == AccessLevel::Edit
    }
}

/// Resolve the access level of `token` against a record's stored digests
///
/// The edit digest is checked first so an edit token always reports
/// [`AccessLevel::Edit`].
///
/// # Examples
///
/// ```
/// use nyvoro_common::access::{resolve_access, AccessLevel};
/// use nyvoro_common::security::hash_magic_link_token;
///
/// let view = hash_magic_link_token("view-token", "salt");
/// let edit = hash_magic_link_token("edit-token", "salt");
///
/// assert_eq!(resolve_access("edit-token", &view, &edit, "salt"), AccessLevel::Edit);
/// assert_eq!(resolve_access("view-token", &view, &edit, "salt"), AccessLevel::View);
/// assert_eq!(resolve_access("guess", &view, &edit, "salt"), AccessLevel::None);
/// ```
pub fn resolve_access(
    token: &str,
    view_token_hash: &str,
    edit_token_hash: &str,
    salt: &str,
) -> AccessLevel {
    let token_hash = hash_magic_link_token(token, salt);

    if secure_compare(edit_token_hash, &token_hash) {
        return AccessLevel::Edit;
    }

    if secure_compare(view_token_hash, &token_hash) {
        return AccessLevel::View;
    }

    AccessLevel::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::generate_token;

    const SALT: &str = "magic-salt";

    fn issued() -> (String, String, String, String) {
        let view = generate_token();
        let edit = generate_token();
        let view_hash = hash_magic_link_token(&view, SALT);
        let edit_hash = hash_magic_link_token(&edit, SALT);
        (view, edit, view_hash, edit_hash)
    }

    #[test]
    fn test_edit_token_grants_edit() {
        let (_, edit, view_hash, edit_hash) = issued();
        let level = resolve_access(&edit, &view_hash, &edit_hash, SALT);
        assert_eq!(level, AccessLevel::Edit);
        assert!(level.can_view());
        assert!(level.can_edit());
    }

    #[test]
    fn test_view_token_grants_view_only() {
        let (view, _, view_hash, edit_hash) = issued();
        let level = resolve_access(&view, &view_hash, &edit_hash, SALT);
        assert_eq!(level, AccessLevel::View);
        assert!(level.can_view());
        assert!(!level.can_edit());
    }

    #[test]
    fn test_unknown_token_and_wrong_salt_grant_nothing() {
        let (view, edit, view_hash, edit_hash) = issued();
        assert_eq!(
            resolve_access("not-a-token", &view_hash, &edit_hash, SALT),
            AccessLevel::None
        );
        assert_eq!(
            resolve_access(&view, &view_hash, &edit_hash, "other-salt"),
            AccessLevel::None
        );
        assert_eq!(
            resolve_access(&edit, &view_hash, &edit_hash, "other-salt"),
            AccessLevel::None
        );
    }

    #[test]
    fn test_rows_without_digests_grant_nothing() {
        // Rows created before token columns existed carry empty digests
        let (view, _, _, _) = issued();
        assert_eq!(resolve_access(&view, "", "", SALT), AccessLevel::None);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let (view, edit, view_hash, edit_hash) = issued();
        for token in [&view, &edit] {
            let first = resolve_access(token, &view_hash, &edit_hash, SALT);
            let second = resolve_access(token, &view_hash, &edit_hash, SALT);
            assert_eq!(first, second);
        }
    }
}
