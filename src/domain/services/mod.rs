pub mod actions;
mod architect;
pub mod clipboard;
pub mod events;
pub mod export;
pub mod parser;
pub mod prompts;
pub mod rules;
mod sessions;

pub use architect::*;
pub use prompts::PromptComposer;
pub use sessions::*;
