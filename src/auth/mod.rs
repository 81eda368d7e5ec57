//! Sessions, passwords and the endpoints for logging in and out.

mod change_password;
mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod password;
mod register;

pub use change_password::change_password_endpoint;
pub use log_in::log_in_endpoint;
pub use log_out::log_out_endpoint;
pub use middleware::auth_guard;
pub use password::{PasswordHash, ValidatedPassword};
pub use register::register_endpoint;

pub(crate) use cookie::DEFAULT_COOKIE_DURATION;

#[cfg(test)]
pub(crate) use cookie::{COOKIE_TOKEN, set_auth_cookie};
