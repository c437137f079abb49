use anyhow::Result;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;

use super::Architecture;

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum RendererName {
    Dot,
    Mermaid,
}

impl RendererName {
    pub fn parse(text: String) -> Option<RendererName> {
        return RendererName::iter().find(|e| return e.to_string() == text);
    }
}

pub trait Renderer {
    fn name(&self) -> RendererName;

    /// File extension for the diagram source, without the leading dot.
    fn extension(&self) -> &'static str;

    /// Produces diagram source text for the architecture. An architecture
    /// without diagram nodes is drawn from its component list.
    fn render(&self, architecture: &Architecture) -> Result<String>;
}

pub type RendererBox = Box<dyn Renderer + Send + Sync>;
