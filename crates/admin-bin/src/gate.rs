//! One CGI request: secure transport, cookie check, refreshed cookie, ETag.

use std::env;
use std::io::{self, Write};

use admin_auth::{AuthResult, CookieAuthenticator, SetCookie};
use site_config::ConfigCache;
use tracing::{debug, warn};

use crate::commands::Context;

const ENV_HTTPS: &str = "HTTPS";
const ENV_COOKIE: &str = "HTTP_COOKIE";

/// The parts of the CGI environment the gate looks at.
#[derive(Debug, Default, Clone)]
pub struct RequestEnv {
    pub https: Option<String>,
    pub cookie: Option<String>,
}

impl RequestEnv {
    pub fn from_env() -> Self {
        Self {
            https: env::var(ENV_HTTPS).ok(),
            cookie: env::var(ENV_COOKIE).ok(),
        }
    }

    /// `HTTPS` is `on` or `1`, any case.
    pub fn is_secure(&self) -> bool {
        self.https
            .as_deref()
            .map(str::trim)
            .is_some_and(|v| v.eq_ignore_ascii_case("on") || v == "1")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Unauthorized,
    Forbidden,
}

impl Status {
    fn line(self) -> &'static str {
        match self {
            Status::Ok => "200 OK",
            Status::Unauthorized => "401 Unauthorized",
            Status::Forbidden => "403 Forbidden",
        }
    }
}

/// CGI response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateResponse {
    pub status: Status,
    pub etag: Option<String>,
    pub set_cookie: Option<SetCookie>,
}

impl GateResponse {
    fn forbidden() -> Self {
        Self {
            status: Status::Forbidden,
            etag: None,
            set_cookie: None,
        }
    }

    /// Header block followed by the empty line.
    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "Status: {}", self.status.line())?;
        if let Some(etag) = &self.etag {
            writeln!(out, "ETag: {etag}")?;
        }
        if let Some(cookie) = &self.set_cookie {
            writeln!(out, "{}", cookie.header_line())?;
        }
        writeln!(out)
    }
}

/// Answer a request at `now` (unix seconds).
///
/// Insecure requests are refused before the database is opened. An
/// authenticated caller gets a refreshed cookie; anyone else gets the cookie
/// canceled.
pub fn handle(env: &RequestEnv, ctx: &Context, now: i64) -> AuthResult<GateResponse> {
    if !env.is_secure() {
        warn!("Refusing request without secure transport");
        return Ok(GateResponse::forbidden());
    }

    let mut session = ctx.open_session()?;
    let cache = ConfigCache::load(&mut session)?;
    session.close()?;

    let auth = CookieAuthenticator::new(&cache, now);
    let cookie = env.cookie.as_deref().unwrap_or_default();

    let response = if auth.validate(cookie) {
        debug!(minute = auth.current_minute(), "Authenticated request");
        GateResponse {
            status: Status::Ok,
            etag: Some(cache.etag()),
            set_cookie: Some(auth.issue()),
        }
    } else {
        debug!("Unauthenticated request");
        GateResponse {
            status: Status::Unauthorized,
            etag: None,
            set_cookie: Some(auth.cancel()),
        }
    };
    Ok(response)
}
