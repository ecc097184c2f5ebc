/// Token Cookies
///
/// Both tokens travel as HttpOnly cookies whose max-age matches the token lifetime.

use actix_web::cookie::{time::Duration, Cookie, SameSite};

use crate::auth::CredentialPair;
use crate::configuration::AuthSettings;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Cookies carrying a freshly issued credential pair
pub fn token_cookies(tokens: &CredentialPair, settings: &AuthSettings) -> [Cookie<'static>; 2] {
    [
        token_cookie(
            ACCESS_COOKIE,
            tokens.access_token.clone(),
            settings.access_token_seconds(),
            settings.secure_cookies,
        ),
        token_cookie(
            REFRESH_COOKIE,
            tokens.refresh_token.clone(),
            settings.refresh_token_seconds(),
            settings.secure_cookies,
        ),
    ]
}

/// Cookies that clear both tokens on the client
pub fn removal_cookies() -> [Cookie<'static>; 2] {
    [ACCESS_COOKIE, REFRESH_COOKIE].map(|name| {
        let mut cookie = Cookie::build(name, "").path("/").finish();
        cookie.make_removal();
        cookie
    })
}

fn token_cookie(name: &'static str, value: String, max_age: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(max_age))
        .finish()
}
