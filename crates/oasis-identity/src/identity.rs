//! Gateway-injected identity headers extractor.

use std::collections::BTreeSet;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use http::StatusCode;
use http::request::Parts;

use oasis_domain::role::Role;

pub const USER_ID_HEADER: &str = "x-oasis-user-id";
pub const ROLES_HEADER: &str = "x-oasis-user-roles";

/// Authenticated caller, injected by the gateway via `x-oasis-user-id` and
/// `x-oasis-user-roles` (comma-separated role names).
///
/// Returns 401 if either header is absent, the id is not an integer, or a role
/// name is unknown. Permission checks (403) happen in the usecases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub roles: BTreeSet<Role>,
}

impl Identity {
    pub fn new(user_id: i64, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            user_id,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Admin or cashier.
    pub fn is_privileged(&self) -> bool {
        self.roles.iter().any(|r| r.is_privileged())
    }

    fn from_headers(user_id: Option<&str>, roles: Option<&str>) -> Option<Self> {
        let user_id = user_id?.trim().parse::<i64>().ok()?;
        let roles = roles?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<Role>)
            .collect::<Result<BTreeSet<_>, _>>()
            .ok()?;
        Some(Self { user_id, roles })
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    // axum-core 0.5 defines this as `fn -> impl Future + Send` (not `async fn`).
    // Extract synchronously, return a 'static async move block.
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let identity = Self::from_headers(
            header_str(parts, USER_ID_HEADER),
            header_str(parts, ROLES_HEADER),
        );

        async move { identity.ok_or(StatusCode::UNAUTHORIZED) }
    }
}

/// Anonymous when the gateway injected no user id; a present but malformed
/// identity is still rejected.
impl<S> OptionalFromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Option<Self>, Self::Rejection>> + Send {
        let user_id = header_str(parts, USER_ID_HEADER);
        let result = match user_id {
            None => Ok(None),
            Some(_) => Self::from_headers(user_id, header_str(parts, ROLES_HEADER))
                .map(Some)
                .ok_or(StatusCode::UNAUTHORIZED),
        };

        async move { result }
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}
