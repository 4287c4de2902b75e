// Route definitions

use warp::Filter;

use crate::handlers::{self, AppContext};
use crate::session::{session_id, SESSION_COOKIE};

pub fn configure_routes(
    ctx: AppContext,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let with_ctx = warp::any().map(move || ctx.clone());
    let api = warp::path("api");

    // GET /
    let index = warp::path::end()
        .and(warp::get())
        .and(warp::cookie::optional::<String>(SESSION_COOKIE))
        .and_then(handlers::index_handler);

    // GET /static/js/app.js
    let app_js = warp::path!("static" / "js" / "app.js")
        .and(warp::get())
        .and_then(handlers::app_js_handler);

    // POST /api/chat
    let chat = api
        .and(warp::path("chat"))
        .and(warp::path::end())
        .and(warp::post())
        .and(session_id())
        .and(warp::body::json())
        .and(with_ctx.clone())
        .and_then(handlers::chat_handler);

    // POST /api/regenerate (no body required)
    let regenerate = api
        .and(warp::path("regenerate"))
        .and(warp::path::end())
        .and(warp::post())
        .and(session_id())
        .and(with_ctx.clone())
        .and_then(handlers::regenerate_handler);

    // POST /api/clear
    let clear = api
        .and(warp::path("clear"))
        .and(warp::path::end())
        .and(warp::post())
        .and(session_id())
        .and(with_ctx.clone())
        .and_then(handlers::clear_handler);

    // GET /api/history
    let history = api
        .and(warp::path("history"))
        .and(warp::path::end())
        .and(warp::get())
        .and(session_id())
        .and(with_ctx)
        .and_then(handlers::history_handler);

    // Combine routes
    index
        .or(app_js)
        .or(chat)
        .or(regenerate)
        .or(clear)
        .or(history)
}
