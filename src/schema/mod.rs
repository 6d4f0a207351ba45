pub mod partner;
pub mod story;
