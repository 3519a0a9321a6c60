pub mod health;
pub mod url;
pub mod user;
