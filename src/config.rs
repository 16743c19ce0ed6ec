use crate::render::Renderer;

/// Knobs of a comparison. Plain data, cheap to clone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Name of the compared value at the root of every path.
    pub root_name: String,
    pub renderer: Renderer,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_name: "DATA".to_string(),
            renderer: Renderer::default(),
        }
    }
}

impl Config {
    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }

    pub fn with_max_render_depth(mut self, depth: usize) -> Self {
        self.renderer.max_depth = depth;
        self
    }
}
