//! Mock auth helpers for integration tests.
//!
//! Services behind the gateway receive `x-oasis-user-id` + `x-oasis-user-roles` headers
//! injected by the gateway. In tests, `MockAuth` builds these headers directly
//! so no real gateway or token is needed.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use oasis_domain::role::Role;
use oasis_identity::{Identity, ROLES_HEADER, USER_ID_HEADER};

/// Configurable identity injected into test requests.
pub struct MockAuth {
    pub user_id: i64,
    pub roles: Vec<Role>,
}

impl MockAuth {
    pub fn new(user_id: i64, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            user_id,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn admin(user_id: i64) -> Self {
        Self::new(user_id, [Role::Admin])
    }

    pub fn cashier(user_id: i64) -> Self {
        Self::new(user_id, [Role::Cashier])
    }

    pub fn client(user_id: i64) -> Self {
        Self::new(user_id, [Role::Client])
    }

    /// The identity a handler would extract from [`MockAuth::headers`].
    pub fn identity(&self) -> Identity {
        Identity::new(self.user_id, self.roles.iter().copied())
    }

    /// Return headers as if the gateway injected them.
    pub fn headers(&self) -> HeaderMap {
        let roles = self
            .roles
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let mut map = HeaderMap::new();
        map.insert(
            HeaderName::from_static(USER_ID_HEADER),
            HeaderValue::from(self.user_id),
        );
        map.insert(
            HeaderName::from_static(ROLES_HEADER),
            HeaderValue::from_str(&roles).expect("role names are valid header values"),
        );
        map
    }
}
