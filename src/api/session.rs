//! Identifies the browser making a request with a long lived cookie.
use anyhow::{Error, Result};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;
use tokio_rusqlite::Connection;

use crate::chat::User;
use crate::chat::db::{find_user, get_or_create_user};

pub const USER_COOKIE: &str = "naviable_uid";
const USER_COOKIE_MAX_AGE_DAYS: i64 = 365;

pub fn cookie_user_id(jar: &CookieJar) -> Option<String> {
    jar.get(USER_COOKIE).map(|c| c.value().to_string())
}

pub fn user_cookie(user_id: &str) -> Cookie<'static> {
    Cookie::build((USER_COOKIE, user_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::days(USER_COOKIE_MAX_AGE_DAYS))
        .build()
}

/// The user the cookie points to, without creating one.
pub async fn existing_user(db: &Connection, jar: &CookieJar) -> Result<Option<User>, Error> {
    match cookie_user_id(jar) {
        Some(id) => find_user(db, &id).await,
        None => Ok(None),
    }
}

/// The user the cookie points to, creating one if needed. The returned
/// jar always carries the cookie so it gets refreshed on each visit.
pub async fn current_user(db: &Connection, jar: CookieJar) -> Result<(User, CookieJar), Error> {
    let user = get_or_create_user(db, cookie_user_id(&jar).as_deref()).await?;
    let jar = jar.add(user_cookie(&user.id));
    Ok((user, jar))
}
