use std::path::Path;

use anyhow::Context as _;

use crate::animation::keyframe::KeyframeKind;
use crate::foundation::core::Fps;
use crate::foundation::error::{KeyframeError, KeyframeResult};

/// User-facing knobs shared by keyframe models, lists and the undo stack.
///
/// Every field has a default, so a settings file only needs to name what it changes:
///
/// ```json
/// { "fps": { "num": 30000, "den": 1001 }, "default_kind": "smooth" }
/// ```
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyframeSettings {
    /// Frame rate used to build keyframe positions.
    pub fps: Fps,
    /// Kind given to keyframes created without an explicit kind, and to parsed
    /// animation text that carries no operators at all.
    pub default_kind: KeyframeKind,
    /// Write the opacity component of rect values.
    pub use_opacity: bool,
    /// Maximum number of retained undo entries (`None` keeps everything).
    pub undo_limit: Option<usize>,
}

impl Default for KeyframeSettings {
    fn default() -> Self {
        Self {
            fps: Fps::default(),
            default_kind: KeyframeKind::Linear,
            use_opacity: true,
            undo_limit: None,
        }
    }
}

impl KeyframeSettings {
    pub fn from_json_str(s: &str) -> KeyframeResult<Self> {
        let settings: Self =
            serde_json::from_str(s).map_err(|e| KeyframeError::serde(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> KeyframeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read keyframe settings '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> KeyframeResult<()> {
        Fps::new(self.fps.num, self.fps.den)?;
        if self.undo_limit == Some(0) {
            return Err(KeyframeError::validation("undo_limit must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
