//! JSON file read/write helpers
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ChartError, Result};

/// Read and parse a JSON file. A missing file is reported as
/// `ChartError::FileNotFound` so callers can tell it apart from I/O and
/// parse failures.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = match tokio::fs::read(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ChartError::FileNotFound(path.display().to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    Ok(serde_json::from_slice(&content)?)
}

/// Serialize `value` to `path`, creating parent directories. The file is
/// written next to its destination and renamed into place, so readers never
/// see a half-written file.
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_vec(value)?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    tokio::fs::write(tmp_path, json)
        .await
        .map_err(|e| ChartError::FileWriteFailed(format!("{}: {}", tmp_path.display(), e)))?;
    tokio::fs::rename(tmp_path, path)
        .await
        .map_err(|e| ChartError::FileWriteFailed(format!("{}: {}", path.display(), e)))?;

    Ok(())
}
