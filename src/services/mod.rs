pub mod access_token;
pub use access_token::{AccessTokenSigner, Claims};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, ClientContext, LoginResult};
pub use auth_service_impl::SeaOrmAuthService;

pub mod device;

pub mod mailer;
pub use mailer::Mailer;

pub mod scheduler;
pub use scheduler::Scheduler;
