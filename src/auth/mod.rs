//! User accounts, sessions, and the endpoints for registering, logging in and out.

mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod password;
mod profile;
mod register;
mod session;
mod user;

pub use log_in::post_log_in;
pub use log_out::get_log_out;
pub use middleware::{AuthState, auth_guard};
pub use password::{PasswordHash, ValidatedPassword};
pub use profile::{UserProfile, current_user, get_is_authenticated};
pub use register::register_user;
pub use session::{DEFAULT_SESSION_DURATION, Session, SessionToken, create_session_table};
pub use user::{NewUser, User, UserID, count_users, create_user, create_user_table};

#[cfg(test)]
pub(crate) use cookie::COOKIE_SESSION;
