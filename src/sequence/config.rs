//! Navigation configuration

/// Configuration for a [`super::PlaylistTree`]
#[derive(Debug, Clone, Default)]
pub struct TreeConfig {
    /// Continue from the other end when navigation runs past the first or
    /// last track (off: stop and return nothing)
    pub wrap_around: bool,
}

impl TreeConfig {
    /// Create the default configuration (no wrap-around)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set wrap-around navigation
    pub fn with_wrap_around(mut self, wrap_around: bool) -> Self {
        self.wrap_around = wrap_around;
        self
    }
}
