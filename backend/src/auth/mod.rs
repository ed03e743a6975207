pub mod handlers;
pub mod middleware;

pub const USER_SESSION_KEY: &str = "user";
