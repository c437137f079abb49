mod action;
mod architecture;
mod backend;
mod errors;
mod event;
mod message;
mod renderer;
mod service_type;
mod session;
mod slash_commands;

pub use action::*;
pub use architecture::*;
pub use backend::*;
pub use errors::*;
pub use event::*;
pub use message::*;
pub use renderer::*;
pub use service_type::*;
pub use session::*;
pub use slash_commands::*;
