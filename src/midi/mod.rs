pub mod core;
pub mod time;
