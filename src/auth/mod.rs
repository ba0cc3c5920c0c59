use cookie::{Cookie, SameSite};

pub mod csrf;
pub mod guard;
pub mod session;

pub use csrf::CsrfService;
pub use session::Session;

/// Cookie holding the backend session token.
pub const SESSION_COOKIE: &str = "portal_session";

pub fn create_session_cookie(token: &str, secure: bool, duration_hours: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .same_site(SameSite::Lax)
        .http_only(true)
        .secure(secure)
        .max_age(cookie::time::Duration::hours(duration_hours))
        .build()
}

pub fn create_logout_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .same_site(SameSite::Lax)
        .http_only(true)
        .max_age(cookie::time::Duration::seconds(0))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_is_http_only() {
        let cookie = create_session_cookie("tok", true, 24);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(create_logout_cookie().value(), "");
    }
}
