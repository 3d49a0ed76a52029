//! HTTP request handlers

pub mod auth;
pub mod authors;
pub mod categories;
pub mod comments;
pub mod posts;
pub mod system;
pub mod tags;

pub use auth::*;
pub use authors::*;
pub use categories::*;
pub use comments::*;
pub use posts::*;
pub use system::*;
pub use tags::*;
