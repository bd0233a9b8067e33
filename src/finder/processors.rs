//! Item processors of the image finder

use crate::component::Item;
use crate::local::ProcessItem;
use anyhow::{anyhow, bail, Context};
use std::path::{Path, PathBuf};
use tracing::info;

/// Returns the finder's item processors: save, then record
pub fn item_processors(dir: impl Into<PathBuf>) -> Vec<ProcessItem> {
    let dir = dir.into();
    vec![
        Box::new(move |item: &Item| save_image(item, &dir)) as ProcessItem,
        Box::new(record_image) as ProcessItem,
    ]
}

/// Writes the item's `body` to `dir/name`
///
/// Creates `dir` if needed. The returned item drops `body` and gains
/// `file_path` and `file_size`.
pub fn save_image(item: &Item, dir: &Path) -> anyhow::Result<Option<Item>> {
    let name = item
        .get("name")
        .ok_or_else(|| anyhow!("missing image name"))?
        .as_str()
        .ok_or_else(|| anyhow!("incorrect image name type"))?;
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        bail!("illegal image name {:?}", name);
    }
    let body = item
        .get("body")
        .ok_or_else(|| anyhow!("missing image body (name: {})", name))?
        .as_bytes()
        .ok_or_else(|| anyhow!("incorrect image body type (name: {})", name))?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("couldn't create directory {}", dir.display()))?;
    let file_path = dir.join(name);
    std::fs::write(&file_path, body)
        .with_context(|| format!("couldn't create file {}", file_path.display()))?;
    let file_size = std::fs::metadata(&file_path)?.len();

    let mut saved = item.clone();
    saved.remove("body");
    saved.insert("file_path", file_path.to_string_lossy().into_owned());
    saved.insert("file_size", i64::try_from(file_size).unwrap_or(i64::MAX));
    Ok(Some(saved))
}

/// Logs a saved image
pub fn record_image(item: &Item) -> anyhow::Result<Option<Item>> {
    let path = item
        .get("file_path")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("missing or incorrect file path"))?;
    let size = item
        .get("file_size")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| anyhow!("missing or incorrect file size"))?;
    info!("Saved file: {}, size: {} byte(s).", path, size);
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn image(name: &str, body: &[u8]) -> Item {
        let mut item = Item::new();
        item.insert("name", name);
        item.insert("ext", "png");
        item.insert("body", body.to_vec());
        item
    }

    #[test]
    fn test_save_image_writes_file() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("pictures");

        let saved = save_image(&image("logo.png", b"abc"), &dir).unwrap().unwrap();

        let path = dir.join("logo.png");
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
        assert_eq!(
            saved.get("file_path").and_then(|v| v.as_str()),
            Some(path.to_string_lossy().as_ref())
        );
        assert_eq!(saved.get("file_size").and_then(|v| v.as_i64()), Some(3));
        assert!(!saved.contains_key("body"));
        assert!(record_image(&saved).unwrap().is_none());
    }

    #[test]
    fn test_save_image_rejects_bad_items() {
        let temp = TempDir::new().unwrap();
        assert!(save_image(&Item::new(), temp.path()).is_err());
        assert!(save_image(&image("..", b"x"), temp.path()).is_err());
        assert!(save_image(&image("a/b.png", b"x"), temp.path()).is_err());

        let mut no_body = image("a.png", b"");
        no_body.insert("body", "not bytes");
        assert!(save_image(&no_body, temp.path()).is_err());
    }

    #[test]
    fn test_record_requires_saved_item() {
        assert!(record_image(&image("a.png", b"x")).is_err());
    }
}
