//! `CurrentActor` extractor: the caller as resolved by the upstream session layer.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use ulid::Ulid;

use crate::model::{Actor, Role};

use super::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Trusted identity headers. Session issuance lives upstream; this layer
/// only parses what the gateway forwards.
#[derive(Debug, Clone, Copy)]
pub struct CurrentActor(pub Actor);

impl std::ops::Deref for CurrentActor {
    type Target = Actor;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthenticated(format!("missing {name} header")))
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER)?
            .parse::<Ulid>()
            .map_err(|_| ApiError::unauthenticated(format!("malformed {USER_ID_HEADER} header")))?;
        let role = header(parts, USER_ROLE_HEADER)?
            .parse::<Role>()
            .map_err(ApiError::unauthenticated)?;
        Ok(CurrentActor(Actor { user_id, role }))
    }
}
