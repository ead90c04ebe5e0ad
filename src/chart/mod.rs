pub mod note;
pub mod sentence;
pub mod voice;
