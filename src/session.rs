//! Session identity
//!
//! A server-managed opaque UUID cookie correlates requests to one
//! conversation. The index page mints it; API routes fall back to a fresh
//! id when the cookie is absent or unreadable, which simply resolves to an
//! empty conversation.

use std::convert::Infallible;
use uuid::Uuid;
use warp::Filter;

pub const SESSION_COOKIE: &str = "bujji_session";

/// Extract the session id from the cookie, minting a throwaway one when
/// missing. Never rejects.
pub fn session_id() -> impl Filter<Extract = (Uuid,), Error = Infallible> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE)
        .map(|cookie: Option<String>| parse_session(cookie.as_deref()))
}

/// Parse a cookie value, or mint a new id.
pub fn parse_session(cookie: Option<&str>) -> Uuid {
    cookie
        .and_then(|value| Uuid::parse_str(value).ok())
        .unwrap_or_else(Uuid::new_v4)
}

/// `Set-Cookie` value for a freshly minted session.
pub fn session_cookie(session: Uuid) -> String {
    format!("{SESSION_COOKIE}={session}; Path=/; HttpOnly; SameSite=Lax")
}
