//! Authorization guards for mutating operations.
//!
//! Handlers ask a guard before touching state and branch on the tagged
//! result instead of unwinding through errors.

use serde::Serialize;

/// The authenticated user behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Viewer {
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Forbidden,
    Unauthenticated,
}

impl Access {
    pub fn is_allowed(self) -> bool {
        matches!(self, Access::Allowed)
    }
}

/// Any signed-in viewer may proceed.
pub fn require_viewer(viewer: Option<&Viewer>) -> Access {
    match viewer {
        Some(_) => Access::Allowed,
        None => Access::Unauthenticated,
    }
}

/// Only the author of a post may change it.
pub fn can_edit_post(viewer: Option<&Viewer>, author_id: i64) -> Access {
    match viewer {
        None => Access::Unauthenticated,
        Some(viewer) if viewer.user_id == author_id => Access::Allowed,
        Some(_) => Access::Forbidden,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer(id: i64) -> Viewer {
        Viewer {
            user_id: id,
            username: format!("user{id}"),
        }
    }

    #[test]
    fn anonymous_viewers_are_unauthenticated() {
        assert_eq!(require_viewer(None), Access::Unauthenticated);
        assert_eq!(can_edit_post(None, 1), Access::Unauthenticated);
    }

    #[test]
    fn only_the_author_may_edit() {
        assert_eq!(can_edit_post(Some(&viewer(1)), 1), Access::Allowed);
        assert_eq!(can_edit_post(Some(&viewer(2)), 1), Access::Forbidden);
        assert!(require_viewer(Some(&viewer(2))).is_allowed());
    }
}
