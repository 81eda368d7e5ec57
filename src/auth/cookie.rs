//! The session stored in the private auth cookie.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{Error, user::UserID};

/// The name of the cookie holding the session.
pub(crate) const COOKIE_TOKEN: &str = "token";
/// The default duration for which auth cookies are valid.
pub(crate) const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(5);

/// A logged in user and when their session ends.
///
/// The cookie is private, so clients cannot read or forge the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Session {
    pub user_id: UserID,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl Session {
    fn starting_at(user_id: UserID, now: OffsetDateTime, duration: Duration) -> Self {
        Self {
            user_id,
            expires_at: now + duration,
        }
    }

    fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }

    /// The session lasting until at least `now + duration`, or `None` if it
    /// already lasts that long.
    fn extended_to(&self, now: OffsetDateTime, duration: Duration) -> Option<Self> {
        let expires_at = now + duration;

        (expires_at > self.expires_at).then(|| Self {
            user_id: self.user_id,
            expires_at,
        })
    }

    fn into_cookie(self) -> Result<Cookie<'static>, Error> {
        let expires_at = self.expires_at;
        let value = serde_json::to_string(&self).map_err(|error| {
            tracing::error!("could not serialize session: {error}");
            Error::JSONSerializationError(error.to_string())
        })?;

        Ok(Cookie::build((COOKIE_TOKEN, value))
            .expires(expires_at)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true)
            .path("/")
            .build())
    }
}

/// Start a session for `user_id` that lasts `duration` from now.
///
/// You can use [DEFAULT_COOKIE_DURATION] for the default duration.
///
/// # Errors
///
/// Returns [Error::JSONSerializationError] if the session cannot be serialized.
pub(crate) fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let session = Session::starting_at(user_id, OffsetDateTime::now_utc(), duration);

    Ok(jar.add(session.into_cookie()?))
}

/// Set the auth cookie to an invalid value and set its max age to zero, which should delete the
/// cookie on the client side.
pub(crate) fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_TOKEN, "deleted"))
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true)
            .path("/"),
    )
}

/// Read and check the session in `jar`.
///
/// # Errors
///
/// Returns:
/// - [Error::Unauthorized] if the cookie is missing or does not hold a session.
/// - [Error::SessionExpired] if the session has ended.
pub(crate) fn get_session(jar: &PrivateCookieJar) -> Result<Session, Error> {
    let cookie = jar.get(COOKIE_TOKEN).ok_or(Error::Unauthorized)?;
    let session: Session =
        serde_json::from_str(cookie.value_trimmed()).map_err(|_| Error::Unauthorized)?;

    if session.is_expired_at(OffsetDateTime::now_utc()) {
        return Err(Error::SessionExpired);
    }

    Ok(session)
}

/// Make the session in `jar` last at least `duration` from now.
///
/// Sessions that already last longer, e.g. "remember me" sessions, are left as they are.
///
/// # Errors
///
/// The cookie jar is not modified if an error is returned.
///
/// Returns the errors of [get_session], or [Error::JSONSerializationError] if the
/// updated session cannot be serialized.
pub(crate) fn extend_auth_cookie_duration_if_needed(
    jar: PrivateCookieJar,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let session = get_session(&jar)?;

    match session.extended_to(OffsetDateTime::now_utc(), duration) {
        Some(extended) => Ok(jar.add(extended.into_cookie()?)),
        None => Ok(jar),
    }
}

#[cfg(test)]
mod cookie_tests {
    use axum_extra::extract::{
        PrivateCookieJar,
        cookie::{Cookie, Key},
    };
    use sha2::{Digest, Sha512};
    use time::{Duration, OffsetDateTime, macros::datetime};

    use crate::{Error, user::UserID};

    use super::{
        COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, Session, extend_auth_cookie_duration_if_needed,
        get_session, invalidate_auth_cookie, set_auth_cookie,
    };

    fn get_jar() -> PrivateCookieJar {
        PrivateCookieJar::new(Key::from(&Sha512::digest(b"foobar")))
    }

    #[track_caller]
    fn assert_date_time_close(left: OffsetDateTime, right: OffsetDateTime) {
        assert!(
            (left - right).abs() < Duration::seconds(1),
            "got date time {left:?}, want {right:?}"
        );
    }

    #[test]
    fn set_cookie_stores_session() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), DEFAULT_COOKIE_DURATION).unwrap();

        let session = get_session(&jar).unwrap();

        assert_eq!(session.user_id, UserID::new(1));
        assert_date_time_close(
            session.expires_at,
            OffsetDateTime::now_utc() + DEFAULT_COOKIE_DURATION,
        );
        let cookie = jar.get(COOKIE_TOKEN).unwrap();
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn missing_cookie_is_unauthorized() {
        assert_eq!(get_session(&get_jar()), Err(Error::Unauthorized));
    }

    #[test]
    fn garbage_cookie_is_unauthorized() {
        let jar = get_jar().add(Cookie::new(COOKIE_TOKEN, "FOOBAR"));

        assert_eq!(get_session(&jar), Err(Error::Unauthorized));
    }

    #[test]
    fn expired_session_is_rejected() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), Duration::seconds(-1)).unwrap();

        assert_eq!(get_session(&jar), Err(Error::SessionExpired));
    }

    #[test]
    fn extend_pushes_expiry_forward() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), Duration::seconds(5)).unwrap();

        let jar = extend_auth_cookie_duration_if_needed(jar, Duration::minutes(10)).unwrap();

        let session = get_session(&jar).unwrap();
        assert_date_time_close(session.expires_at, OffsetDateTime::now_utc() + Duration::minutes(10));
    }

    #[test]
    fn extend_keeps_later_expiry() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), Duration::days(7)).unwrap();
        let want = get_session(&jar).unwrap().expires_at;

        let jar = extend_auth_cookie_duration_if_needed(jar, DEFAULT_COOKIE_DURATION).unwrap();

        assert_eq!(get_session(&jar).unwrap().expires_at, want);
    }

    #[test]
    fn invalidate_removes_session() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), DEFAULT_COOKIE_DURATION).unwrap();

        let jar = invalidate_auth_cookie(jar);

        let cookie = jar.get(COOKIE_TOKEN).unwrap();
        assert_eq!(cookie.value(), "deleted");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert_eq!(get_session(&jar), Err(Error::Unauthorized));
    }

    #[test]
    fn session_stores_expiry_as_rfc3339() {
        let session = Session {
            user_id: UserID::new(7),
            expires_at: datetime!(2025-12-21 00:00:00 UTC),
        };

        let json = serde_json::to_string(&session).unwrap();

        assert_eq!(json, r#"{"user_id":7,"expires_at":"2025-12-21T00:00:00Z"}"#);
        assert_eq!(serde_json::from_str::<Session>(&json).unwrap(), session);
    }

    #[test]
    fn session_extends_only_forwards() {
        let now = datetime!(2025-06-01 12:00:00 UTC);
        let session = Session::starting_at(UserID::new(1), now, Duration::minutes(1));

        let extended = session.extended_to(now, DEFAULT_COOKIE_DURATION).unwrap();

        assert_eq!(extended.expires_at, now + DEFAULT_COOKIE_DURATION);
        assert_eq!(extended.extended_to(now, Duration::minutes(1)), None);
        assert!(extended.is_expired_at(now + Duration::minutes(5)));
        assert!(!extended.is_expired_at(now));
    }
}
