use super::Message;
use super::MessageType;

#[test]
fn it_keeps_the_message_type() {
    let msg = Message::new_with_type(MessageType::Warning, "Hi there!");
    assert_eq!(msg.message_type(), MessageType::Warning);
    assert_eq!(msg.text, "Hi there!");
}

#[test]
fn it_replaces_tabs() {
    let msg = Message::new_with_type(MessageType::Error, "\tfailed\tagain");
    assert_eq!(msg.text, "  failed  again");
    assert_eq!(msg.message_type(), MessageType::Error);
}
