#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageType {
    Normal,
    Warning,
    Error,
}

/// A line of feedback for the person at the terminal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    mtype: MessageType,
}

impl Message {
    pub fn new_with_type(mtype: MessageType, text: &str) -> Message {
        return Message {
            text: text.to_string().replace('\t', "  "),
            mtype,
        };
    }

    pub fn message_type(&self) -> MessageType {
        return self.mtype;
    }
}
