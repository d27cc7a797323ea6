pub mod auth;
pub mod recommendations;

pub use auth::{PasswordHasher, TokenManager};
pub use recommendations::Recommender;
