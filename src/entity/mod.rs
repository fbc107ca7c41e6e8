pub mod followers;
pub mod post;
pub mod user;
