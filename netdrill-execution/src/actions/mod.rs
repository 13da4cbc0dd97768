//! Built-in actions

pub mod discovery;
pub mod fund;
pub mod groups;
pub mod keyloader;
pub mod rotate;
pub mod soft_limit;
pub mod stop;
pub mod traffic;
pub mod wait;
