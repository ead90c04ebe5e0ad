pub mod line;
pub mod process;
