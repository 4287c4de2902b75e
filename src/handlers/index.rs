// GET / and static asset handlers

use std::convert::Infallible;
use uuid::Uuid;
use warp::http::header::{CONTENT_TYPE, SET_COOKIE};
use warp::Reply;

use crate::session::{parse_session, session_cookie};

const INDEX_HTML: &str = include_str!("../../static/index.html");
const APP_JS: &str = include_str!("../../static/js/app.js");

/// Serve the chat page, minting the session cookie when absent or invalid.
pub async fn index_handler(cookie: Option<String>) -> Result<impl warp::Reply, Infallible> {
    let page = warp::reply::html(INDEX_HTML);

    let valid = cookie
        .as_deref()
        .is_some_and(|value| Uuid::parse_str(value).is_ok());
    if valid {
        return Ok(page.into_response());
    }

    let session = parse_session(cookie.as_deref());
    Ok(
        warp::reply::with_header(page, SET_COOKIE, session_cookie(session))
            .into_response(),
    )
}

/// Serve the embedded browser client.
pub async fn app_js_handler() -> Result<impl warp::Reply, Infallible> {
    Ok(warp::reply::with_header(
        APP_JS,
        CONTENT_TYPE,
        "application/javascript; charset=utf-8",
    ))
}
