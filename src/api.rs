use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use cookie::{Cookie, SameSite};
use http::{header, StatusCode};
use log::{error, info, warn};
use serde::Deserialize;
use warp::filters::method;
use warp::reject::Reject;
use warp::reply::{self, Response};
use warp::{filters, Filter, Rejection, Reply};

use crate::error::{Error, ErrorCell};
use crate::forms::{DeleteForm, LinkForm, LoginForm, RegisterForm};
use crate::ui::Message;
use crate::{account, crypto, database, models, ui, Result};

pub const COOKIE_NAME : &str = "link-manager-token";

const FORM_LIMIT : u64 = 16 * 1024;

type BoxReply = Box<dyn Reply>;
type HandlerResult = std::result::Result<BoxReply, Infallible>;

pub struct ServerInner {
    pub server_name :      String,
    pub token_secret :     Vec<u8>,
    pub session_lifetime : Duration,
    pub db :               database::Db,
    pub render :           ui::Renderer,
}

pub type Server = Arc<ServerInner>;

/// Who a request acts as. Handlers that need a login take one of these
/// instead of reaching for any shared state.
#[derive(Debug)]
pub struct Session {
    pub user : models::User,
}

fn with_server(
    server : &Server,
) -> impl Filter<Extract = (Server,), Error = Infallible> + Clone {
    let server = Arc::clone(server);
    warp::any().map(move || Arc::clone(&server))
}

async fn session_from_cookie(
    server : &ServerInner,
    cookie : Option<String>,
) -> Result<Session> {
    let value = cookie.ok_or(Error::Unauthenticated)?;

    let tok = crypto::Token::validate(
        &value,
        &server.token_secret,
        &server.server_name,
    )
    .map_err(|_| Error::Unauthenticated)?;

    let user_id : u32 = tok.sub.parse().map_err(|_| Error::Unauthenticated)?;

    match server.db.get_user(user_id).await {
        Ok(user) => Ok(Session { user }),
        Err(Error::UserIdNotFound(_)) => Err(Error::Unauthenticated),
        Err(err) => Err(err),
    }
}

fn with_session(
    server : &Server,
) -> impl Filter<Extract = (Session,), Error = Rejection> + Clone {
    with_server(server)
        .and(filters::cookie::optional(COOKIE_NAME))
        .and_then(|server : Server, cookie : Option<String>| async move {
            session_from_cookie(&server, cookie)
                .await
                .map_err(Rejection::from)
        })
}

fn form_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T : serde::de::DeserializeOwned + Send + 'static,
{
    filters::body::content_length_limit(FORM_LIMIT).and(filters::body::form())
}

fn session_cookie(server : &ServerInner, user : &models::User) -> Result<String> {
    let token = crypto::Token {
        iss : server.server_name.clone(),
        sub : user.id.to_string(),
    }
    .issue(&server.token_secret, server.session_lifetime)?;

    Ok(Cookie::build(COOKIE_NAME, token)
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .finish()
        .to_string())
}

fn see_other(location : &'static str, cookie : Option<String>) -> BoxReply {
    let mut res = http::Response::builder()
        .status(StatusCode::SEE_OTHER)
        .header(header::LOCATION, location);

    if let Some(cookie) = cookie {
        res = res.header(header::SET_COOKIE, cookie);
    }

    Box::new(res.body("redirecting"))
}

fn html(page : Result<String>) -> BoxReply {
    match page {
        Ok(page) => Box::new(reply::html(page)),
        Err(err) => Box::new(err),
    }
}

macro_rules! handler {
    ($name:ident ( $($aname:ident : $atype:ty),*) $body:block) => {
        pub fn $name (
            $(
                $aname : $atype,
            )*
        ) -> impl Filter<Extract = (BoxReply,) , Error = Rejection> + Clone {
            $body
        }
    }
}

macro_rules! handler_or{
    ($head:expr $(, $tail:expr)*) => {
        $head
        $(
            .or($tail)
            .unify()
            .boxed()
        )*
    };
    ($head:expr $(, $tail:expr)*,) => {
        handler_or!($head $(, $tail)*)
    }
}

pub fn routes(
    server : &Server,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    handler_or!(
        get_index(server),
        get_login(server),
        post_login(server),
        get_register(server),
        post_register(server),
        post_logout(server),
        get_dashboard(server),
        get_new_link(server),
        post_new_link(server),
        get_search(server),
        get_manage(server),
        post_manage_edit(server),
        post_manage_delete(server)
    )
    .recover(recover)
    .with(warp::log::custom(|info| {
        info!(
            "{} {} {} in {:?}",
            info.status(),
            info.method(),
            info.path(),
            info.elapsed()
        );
    }))
}

async fn recover(err : Rejection) -> std::result::Result<Error, Rejection> {
    use warp::reject::{InvalidQuery, MethodNotAllowed, PayloadTooLarge};

    let err = if let Some(cell) = err.find::<ErrorCell>() {
        cell.take().unwrap_or(Error::Internal)
    } else if err.is_not_found() || err.find::<MethodNotAllowed>().is_some()
    {
        Error::RouteNotFound
    } else if err.find::<filters::body::BodyDeserializeError>().is_some()
        || err.find::<InvalidQuery>().is_some()
        || err.find::<PayloadTooLarge>().is_some()
    {
        Error::BadRequest
    } else {
        warn!("unhandled rejection: {:?}", err);
        Error::Internal
    };

    Ok(err)
}

handler! { get_index (server : &Server) {
    warp::path::end()
        .and(method::get())
        .and(with_server(server))
        .and(filters::cookie::optional(COOKIE_NAME))
        .and_then(|server : Server, cookie : Option<String>| async move {
            let to = match session_from_cookie(&server, cookie).await {
                Ok(_) => "/dashboard",
                Err(_) => "/login",
            };

            Ok::<_, Infallible>(see_other(to, None))
        })
}}

handler! { get_login (server : &Server) {
    warp::path!("login")
        .and(method::get())
        .and(with_server(server))
        .and_then(|server : Server| async move {
            Ok::<_, Infallible>(html(server.render.login("", None)))
        })
}}

handler! { post_login (server : &Server) {
    warp::path!("login")
        .and(method::post())
        .and(with_server(server))
        .and(form_body())
        .and_then(login)
}}

async fn login(server : Server, form : LoginForm) -> HandlerResult {
    let cookie : Result<String> = async {
        form.validate()?;
        let user =
            account::authenticate(&server.db, &form.email, &form.password)
                .await?;
        info!("user {} logged in", user.id);
        session_cookie(&server, &user)
    }
    .await;

    Ok(match cookie {
        Ok(cookie) => see_other("/dashboard", Some(cookie)),
        Err(err) => html(
            server
                .render
                .login(form.email.trim(), Some(Message::from(&err))),
        ),
    })
}

handler! { get_register (server : &Server) {
    warp::path!("register")
        .and(method::get())
        .and(with_server(server))
        .and_then(|server : Server| async move {
            Ok::<_, Infallible>(html(server.render.register("", "", None)))
        })
}}

handler! { post_register (server : &Server) {
    warp::path!("register")
        .and(method::post())
        .and(with_server(server))
        .and(form_body())
        .and_then(register)
}}

async fn register(server : Server, form : RegisterForm) -> HandlerResult {
    let res : Result<u32> = async {
        form.validate()?;
        account::register(&server.db, &form.name, &form.email, &form.password)
            .await
    }
    .await;

    Ok(html(match res {
        Ok(_) => server.render.login(
            form.email.trim(),
            Some(Message::success(
                "Registration successful! Please log in to continue.",
            )),
        ),
        Err(err) => server.render.register(
            &form.name,
            &form.email,
            Some(Message::from(&err)),
        ),
    }))
}

handler! { post_logout (server : &Server) {
    warp::path!("logout")
        .and(method::post())
        .and(with_server(server))
        .and_then(|_server : Server| async move {
            let cookie = Cookie::build(COOKIE_NAME, "")
                .http_only(true)
                .same_site(SameSite::Strict)
                .path("/")
                .max_age(time::Duration::ZERO)
                .finish()
                .to_string();

            Ok::<_, Infallible>(see_other("/login", Some(cookie)))
        })
}}

handler! { get_dashboard (server : &Server) {
    warp::path!("dashboard")
        .and(method::get())
        .and(with_server(server))
        .and(with_session(server))
        .and_then(|server : Server, session : Session| async move {
            let page = match server.db.get_links(session.user.id).await {
                Ok(links) => server.render.dashboard(&session.user, &links),
                Err(err) => Err(err),
            };

            Ok::<_, Infallible>(html(page))
        })
}}

handler! { get_new_link (server : &Server) {
    warp::path!("links" / "new")
        .and(method::get())
        .and(with_server(server))
        .and(with_session(server))
        .and_then(|server : Server, session : Session| async move {
            Ok::<_, Infallible>(html(server.render.add_link(&session.user, None)))
        })
}}

handler! { post_new_link (server : &Server) {
    warp::path!("links" / "new")
        .and(method::post())
        .and(with_server(server))
        .and(with_session(server))
        .and(form_body())
        .and_then(add_link)
}}

async fn add_link(
    server : Server,
    session : Session,
    form : LinkForm,
) -> HandlerResult {
    let res : Result<u32> = async {
        form.validate()?;
        server
            .db
            .insert_link(
                session.user.id,
                form.name(),
                &form.url(),
                form.description(),
            )
            .await
    }
    .await;

    let message = match res {
        Ok(id) => {
            info!("user {} added link {}", session.user.id, id);
            Message::success("Link added successfully!")
        },
        Err(err) => Message::from(&err),
    };

    Ok(html(server.render.add_link(&session.user, Some(message))))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchQuery {
    q : String,
}

handler! { get_search (server : &Server) {
    warp::path!("search")
        .and(method::get())
        .and(with_server(server))
        .and(with_session(server))
        .and(warp::query::<SearchQuery>())
        .and_then(search)
}}

async fn search(
    server : Server,
    session : Session,
    query : SearchQuery,
) -> HandlerResult {
    let q = query.q.trim();

    // an empty query would match everything; show the bare form instead
    let page = if q.is_empty() {
        server.render.search(&session.user, "", None)
    } else {
        match server.db.search_links(session.user.id, q).await {
            Ok(links) => server.render.search(&session.user, q, Some(links.as_slice())),
            Err(err) => Err(err),
        }
    };

    Ok(html(page))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ManageQuery {
    link : Option<u32>,
}

async fn manage_page(
    server : &ServerInner,
    session : &Session,
    selected : Option<u32>,
    message : Option<Message>,
) -> BoxReply {
    let page = match server.db.get_links(session.user.id).await {
        Ok(links) => {
            server.render.manage(&session.user, &links, selected, message)
        },
        Err(err) => Err(err),
    };

    html(page)
}

handler! { get_manage (server : &Server) {
    warp::path!("manage")
        .and(method::get())
        .and(with_server(server))
        .and(with_session(server))
        .and(warp::query::<ManageQuery>())
        .and_then(|server : Server, session : Session, query : ManageQuery| async move {
            Ok::<_, Infallible>(manage_page(&server, &session, query.link, None).await)
        })
}}

handler! { post_manage_edit (server : &Server) {
    warp::path!("manage" / "edit")
        .and(method::post())
        .and(with_server(server))
        .and(with_session(server))
        .and(form_body())
        .and_then(edit_link)
}}

async fn edit_link(
    server : Server,
    session : Session,
    form : LinkForm,
) -> HandlerResult {
    let res : Result<u32> = async {
        let id = form.link_id.ok_or(Error::BadRequest)?;
        form.validate()?;
        server
            .db
            .update_link(
                id,
                session.user.id,
                form.name(),
                &form.url(),
                form.description(),
            )
            .await?;
        Ok(id)
    }
    .await;

    let message = match &res {
        Ok(id) => {
            info!("user {} updated link {}", session.user.id, id);
            Message::success("Link updated successfully!")
        },
        Err(err) => Message::from(err),
    };

    Ok(manage_page(&server, &session, form.link_id, Some(message)).await)
}

handler! { post_manage_delete (server : &Server) {
    warp::path!("manage" / "delete")
        .and(method::post())
        .and(with_server(server))
        .and(with_session(server))
        .and(form_body())
        .and_then(delete_link)
}}

async fn delete_link(
    server : Server,
    session : Session,
    form : DeleteForm,
) -> HandlerResult {
    let res : Result<u32> = async {
        let id = form.link_id.ok_or(Error::BadRequest)?;
        server.db.delete_link(id, session.user.id).await?;
        Ok(id)
    }
    .await;

    let message = match &res {
        Ok(id) => {
            info!("user {} deleted link {}", session.user.id, id);
            Message::success("Link deleted successfully!")
        },
        Err(err) => Message::from(err),
    };

    Ok(manage_page(&server, &session, None, Some(message)).await)
}

impl Reject for ErrorCell {}

impl From<Error> for Rejection {
    fn from(err : Error) -> Rejection {
        ErrorCell::new(err).into()
    }
}

impl Reply for Error {
    fn into_response(self) -> Response {
        use Error::*;

        match self {
            Unauthenticated => see_other("/login", None).into_response(),
            RouteNotFound => {
                reply::with_status("route not found", StatusCode::NOT_FOUND)
                    .into_response()
            },
            BadRequest => {
                reply::with_status("bad request", StatusCode::BAD_REQUEST)
                    .into_response()
            },
            err => {
                error!("{}", err);
                reply::with_status(
                    "internal server error",
                    StatusCode::INTERNAL_SERVER_ERROR,
                )
                .into_response()
            },
        }
    }
}
