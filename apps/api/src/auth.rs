use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Header the upstream auth gateway sets to the provider's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity of the caller, if any. Never rejects: each operation decides what a
/// missing identity means.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentUser(pub Option<String>);

impl CurrentUser {
    pub fn id(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        Ok(CurrentUser(user_id))
    }
}
