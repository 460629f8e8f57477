use crate::foundation::error::{SubError, SubResult};

/// Largest accepted `render_ahead`.
pub const MAX_RENDER_AHEAD: usize = 500;

/// Cache slots allocated beyond `render_ahead`.
pub const CACHE_SLACK: usize = 10;

/// Per-stream coordinator options.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubOpts {
    /// Number of future frames to pre-render on a worker thread. `0` renders synchronously.
    pub render_ahead: usize,
    /// Whether subtitles are shown. Text extraction returns nothing while hidden.
    pub visibility: bool,
}

impl Default for SubOpts {
    fn default() -> Self {
        Self {
            render_ahead: 0,
            visibility: true,
        }
    }
}

impl SubOpts {
    /// Parse options from JSON. Missing fields take their defaults.
    pub fn from_json_str(s: &str) -> SubResult<Self> {
        let opts: Self = serde_json::from_str(s)
            .map_err(|e| SubError::validation(format!("invalid subtitle options: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Check option ranges.
    pub fn validate(&self) -> SubResult<()> {
        if self.render_ahead > MAX_RENDER_AHEAD {
            return Err(SubError::validation(format!(
                "render_ahead must be <= {MAX_RENDER_AHEAD}, got {}",
                self.render_ahead
            )));
        }
        Ok(())
    }

    /// Fixed capacity of the render-ahead cache.
    pub fn cache_capacity(&self) -> usize {
        self.render_ahead + CACHE_SLACK
    }
}

#[cfg(test)]
#[path = "../../tests/unit/coordinator/opts.rs"]
mod tests;
