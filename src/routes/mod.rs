mod health_check;
mod users;
pub mod users_auth;

pub use health_check::health_check;
pub use users::get_current_user;
pub use users_auth::{login, refresh, register, revoke};
