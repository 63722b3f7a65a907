//! Static assets served alongside the views (viewpoint panoramas).

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fs;
use std::path::PathBuf;

use crate::viewpoint::Background;

#[derive(Debug, Clone)]
pub struct AssetDir {
    root: PathBuf,
}

impl AssetDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_of(&self, background: &Background) -> PathBuf {
        self.root.join(background.file)
    }

    /// The panorama as an inline `data:image/png;base64,...` URI.
    pub fn background_data_uri(&self, background: &Background) -> Result<String> {
        let path = self.path_of(background);
        let bytes = fs::read(&path).with_context(|| format!("read background {}", path.display()))?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewpoint::Viewpoint;

    #[test]
    fn encodes_file_as_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let bg = Viewpoint::Two.background();
        fs::write(dir.path().join(bg.file), b"png").unwrap();
        let assets = AssetDir::new(dir.path());
        assert_eq!(
            assets.background_data_uri(bg).unwrap(),
            "data:image/png;base64,cG5n"
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let assets = AssetDir::new(dir.path());
        let err = assets
            .background_data_uri(Viewpoint::One.background())
            .unwrap_err();
        assert!(err.to_string().contains("viewpoint-1.png"));
    }
}
