//! Request middleware.

pub mod auth;

pub use auth::{
    AuthConfig, AuthContext, AuthError, AuthLayer, AuthMethod, AuthService, Claims,
    RevocationStore,
};
