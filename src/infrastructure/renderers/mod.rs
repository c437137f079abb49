#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

pub mod graphviz;
pub mod mermaid;

use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use tokio::process::Command;

use crate::domain::models::Architecture;
use crate::domain::models::RenderError;
use crate::domain::models::RendererBox;
use crate::domain::models::RendererName;

pub const IMAGE_FORMATS: [&str; 2] = ["png", "svg"];

pub struct RendererManager {}

impl RendererManager {
    pub fn get(name: RendererName, icons_dir: &str) -> RendererBox {
        match name {
            RendererName::Dot => return Box::new(graphviz::Graphviz::new(icons_dir)),
            RendererName::Mermaid => return Box::<mermaid::Mermaid>::default(),
        }
    }
}

async fn run_dot(
    binary: &str,
    dot_source: &str,
    path: &Path,
    format: &str,
) -> Result<PathBuf, RenderError> {
    let source_path = path.with_extension("dot");
    tokio::fs::write(&source_path, dot_source)
        .await
        .map_err(|err| return RenderError::Io(format!("{}: {err}", source_path.display())))?;

    let output = Command::new(binary)
        .arg(format!("-T{format}"))
        .arg("-o")
        .arg(path)
        .arg(&source_path)
        .output()
        .await;

    let output = match output {
        Ok(output) => output,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::warn!(binary = binary, "Graphviz binary missing");
            return Err(RenderError::MissingBinary);
        }
        Err(err) => return Err(RenderError::Failed(err.to_string())),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::error!(status = ?output.status.code(), stderr = stderr, "Graphviz render failed");
        return Err(RenderError::Failed(format!(
            "dot exited with {}: {stderr}",
            output.status
        )));
    }

    return Ok(path.to_path_buf());
}

/// Writes `dot_source` next to `path` as a `.dot` file, then renders it to
/// `path` in `format` with Graphviz. The source file is kept when rendering
/// fails.
pub async fn write_image(
    dot_source: &str,
    path: &Path,
    format: &str,
) -> Result<PathBuf, RenderError> {
    return run_dot("dot", dot_source, path, format).await;
}

fn image_format(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_string_lossy().to_lowercase();
    if IMAGE_FORMATS.contains(&extension.as_str()) {
        return Some(extension);
    }

    return None;
}

/// Writes the diagram of an architecture to `path`. With the DOT renderer a
/// `.png` or `.svg` path is rendered by Graphviz; anything else receives the
/// diagram source.
pub async fn write_diagram(
    renderer: &RendererBox,
    architecture: &Architecture,
    path: &Path,
) -> Result<PathBuf, RenderError> {
    let source = renderer
        .render(architecture)
        .map_err(|err| return RenderError::Failed(err.to_string()))?;

    if renderer.name() == RendererName::Dot {
        if let Some(format) = image_format(path) {
            return write_image(&source, path, &format).await;
        }
    }

    tokio::fs::write(path, source)
        .await
        .map_err(|err| return RenderError::Io(format!("{}: {err}", path.display())))?;

    return Ok(path.to_path_buf());
}
