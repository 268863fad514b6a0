use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

/// Replace `path` with `contents` so readers see either the old or the new
/// file, never a partial write. The temp file lives next to the target so
/// the rename stays on one filesystem.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let tmp_path = temp_sibling(path);
    let mut file = tokio::fs::File::create(&tmp_path).await?;
    if let Err(e) = write_and_sync(&mut file, contents).await {
        drop(file);
        tokio::fs::remove_file(&tmp_path).await.ok();
        return Err(e);
    }
    drop(file);
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        tokio::fs::remove_file(&tmp_path).await.ok();
        return Err(e);
    }
    Ok(())
}

async fn write_and_sync(file: &mut tokio::fs::File, contents: &[u8]) -> std::io::Result<()> {
    file.write_all(contents).await?;
    file.flush().await?;
    file.sync_all().await
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}
