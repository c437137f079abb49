use super::Architecture;
use super::BackendResponse;
use super::Message;

#[derive(Debug)]
pub enum Event {
    ArchitectureReady(Box<Architecture>, Vec<String>),
    BackendMessage(Message),
    BackendPromptResponse(BackendResponse),
    BackendWaiting(bool),
    InputClosed(),
    KeyboardCTRLC(),
    UserInput(String),
}
