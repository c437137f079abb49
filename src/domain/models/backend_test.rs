use super::BackendName;
use super::BackendPrompt;

#[test]
fn it_parses_backend_names() {
    assert_eq!(
        BackendName::parse("qianwen".to_string()),
        Some(BackendName::Qianwen)
    );
    assert_eq!(
        BackendName::parse("gemini".to_string()),
        Some(BackendName::Gemini)
    );
    assert_eq!(BackendName::parse("openai".to_string()), None);
}

#[test]
fn it_displays_lowercase() {
    assert_eq!(BackendName::Qianwen.to_string(), "qianwen");
}

#[test]
fn it_keeps_prompt_text() {
    let prompt = BackendPrompt::new("Design a web app".to_string());
    assert_eq!(prompt.text, "Design a web app");
}
