use anyhow::Result;
use tokio::sync::mpsc;

/// Holds the system clipboard open for the lifetime of the app, so copied
/// text survives on platforms where ownership ends with the handle.
pub struct ClipboardService {}

impl ClipboardService {
    pub async fn start(mut rx: mpsc::UnboundedReceiver<String>) -> Result<()> {
        let mut clipboard = arboard::Clipboard::new()?;

        while let Some(text) = rx.recv().await {
            if let Err(err) = clipboard.set_text(text) {
                tracing::error!(error = ?err, "Failed to set clipboard text");
            }
        }

        return Ok(());
    }

    pub fn healthcheck() -> Result<()> {
        arboard::Clipboard::new()?;
        return Ok(());
    }
}
