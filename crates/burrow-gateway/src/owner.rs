use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use burrow_core::OwnerId;

use crate::error::AppError;

/// Header set by the authenticating proxy in front of the server.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Owner recorded for submissions without a user.
pub const ANONYMOUS_OWNER: OwnerId = 0;

/// The user a request acts for.
///
/// Required on the per-user routes; `Option<Owner>` elsewhere, where a
/// missing header means [`ANONYMOUS_OWNER`]. A malformed header is always
/// rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner(pub OwnerId);

impl Owner {
    fn parse(parts: &Parts) -> Result<Option<Self>, AppError> {
        let Some(value) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(None);
        };
        value
            .to_str()
            .ok()
            .and_then(|raw| raw.trim().parse::<OwnerId>().ok())
            .map(|id| Some(Owner(id)))
            .ok_or(AppError::Unauthorized)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Owner::parse(parts)?.ok_or(AppError::Unauthorized)
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for Owner {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Owner::parse(parts)
    }
}

/// Owner of an optional-identity request.
pub fn owner_or_anonymous(owner: Option<Owner>) -> OwnerId {
    owner.map_or(ANONYMOUS_OWNER, |Owner(id)| id)
}
