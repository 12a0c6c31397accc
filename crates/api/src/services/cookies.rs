//! Session cookie helper.
//!
//! The session token travels in an httpOnly cookie; the browser never sees
//! it from script.

use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue};
use axum_extra::extract::CookieJar;

use crate::config::SessionConfig;

#[derive(Debug, Clone)]
pub struct SessionCookie {
    name: String,
    secure: bool,
    same_site: String,
    max_age_secs: i64,
}

impl SessionCookie {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            name: config.cookie_name.clone(),
            secure: config.cookie_secure,
            same_site: config.cookie_same_site.clone(),
            max_age_secs: config.ttl_days * 24 * 60 * 60,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The session token carried by the request, if any.
    pub fn token<'a>(&self, jar: &'a CookieJar) -> Option<&'a str> {
        jar.get(&self.name)
            .map(|cookie| cookie.value())
            .filter(|value| !value.is_empty())
    }

    /// Set-Cookie value issuing `token`.
    pub fn build(&self, token: &str) -> String {
        self.with_attributes(format!(
            "{}={}; Path=/; Max-Age={}",
            self.name, token, self.max_age_secs
        ))
    }

    /// Set-Cookie value that removes the session cookie.
    pub fn build_clear(&self) -> String {
        self.with_attributes(format!(
            "{}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            self.name
        ))
    }

    pub fn set(&self, headers: &mut HeaderMap, token: &str) {
        if let Ok(value) = HeaderValue::from_str(&self.build(token)) {
            headers.append(SET_COOKIE, value);
        }
    }

    pub fn clear(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.build_clear()) {
            headers.append(SET_COOKIE, value);
        }
    }

    fn with_attributes(&self, mut cookie: String) -> String {
        cookie.push_str("; HttpOnly");
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!("; SameSite={}", self.same_site));
        cookie
    }
}
