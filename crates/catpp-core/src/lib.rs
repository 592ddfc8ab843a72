pub mod compile;
pub mod error;
pub mod manifest;
pub mod navigation;
pub mod openai;
pub mod page;
pub mod shortcut;
pub mod slug;
