pub mod prelude;

pub mod companies;
pub mod login_history;
pub mod password_reset_tokens;
pub mod profiles;
pub mod refresh_tokens;
pub mod users;
