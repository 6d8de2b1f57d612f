pub use super::companies::Entity as Companies;
pub use super::login_history::Entity as LoginHistory;
pub use super::password_reset_tokens::Entity as PasswordResetTokens;
pub use super::profiles::Entity as Profiles;
pub use super::refresh_tokens::Entity as RefreshTokens;
pub use super::users::Entity as Users;
