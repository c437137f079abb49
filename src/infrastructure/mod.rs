pub mod backends;
pub mod renderers;
