//! 上传文件存储管理

use mycoscan_core::{MycoscanError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// 上传图片的公开访问路径前缀
pub const PUBLIC_URL_PREFIX: &str = "/static/uploads/scans";

/// 存储管理器
///
/// 所有实体共用同一个上传目录。同名上传会覆盖已有文件。
pub struct StorageManager {
    upload_dir: PathBuf,
}

impl StorageManager {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// 确保上传目录存在
    pub async fn ensure_upload_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|e| MycoscanError::Storage(e.to_string()))?;
        Ok(())
    }

    /// 存储上传文件，返回净化后的存储文件名
    pub async fn store_upload(&self, client_filename: &str, data: &[u8]) -> Result<String> {
        let filename = sanitize_filename(client_filename);

        self.ensure_upload_dir().await?;
        let full_path = self.upload_dir.join(&filename);
        tokio::fs::write(&full_path, data)
            .await
            .map_err(|e| MycoscanError::Storage(e.to_string()))?;

        info!("Stored uploaded file: {} ({} bytes)", filename, data.len());
        Ok(filename)
    }

    /// 根据存储文件名构造公开访问URL
    pub fn public_url(filename: &str) -> String {
        format!("{}/{}", PUBLIC_URL_PREFIX, filename)
    }
}

/// 净化客户端提供的文件名
///
/// 只保留最后一个路径分量中的 ASCII 字母数字与 `.`、`-`、`_`，
/// 空白替换为 `_`，首尾的 `.` 和 `_` 被剥除。结果保证不含目录
/// 分隔符，可直接作为上传目录内的裸文件名使用。
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let mut cleaned = String::with_capacity(base.len());
    for ch in base.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
            cleaned.push(ch);
        } else if ch.is_whitespace() {
            cleaned.push('_');
        }
    }

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_plain_name() {
        assert_eq!(sanitize_filename("toe_scan-01.png"), "toe_scan-01.png");
    }

    #[test]
    fn test_sanitize_strips_path_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("..\\..\\boot.ini"), "boot.ini");
        assert_eq!(sanitize_filename("/absolute/path/scan.jpg"), "scan.jpg");
    }

    #[test]
    fn test_sanitize_drops_unsafe_characters() {
        assert_eq!(sanitize_filename("my scan (1).png"), "my_scan_1.png");
        assert_eq!(sanitize_filename("café:photo.jpg"), "cafphoto.jpg");
    }

    #[test]
    fn test_sanitize_strips_leading_dots() {
        assert_eq!(sanitize_filename(".hidden.png"), "hidden.png");
        assert_eq!(sanitize_filename(".."), "unnamed");
        assert_eq!(sanitize_filename(""), "unnamed");
    }

    #[tokio::test]
    async fn test_store_upload_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StorageManager::new(dir.path());

        let stored = manager.store_upload("nail.png", b"imagebytes").await.unwrap();
        assert_eq!(stored, "nail.png");

        let on_disk = tokio::fs::read(dir.path().join("nail.png")).await.unwrap();
        assert_eq!(on_disk, b"imagebytes");
    }

    #[tokio::test]
    async fn test_store_upload_same_name_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StorageManager::new(dir.path());

        manager.store_upload("scan.png", b"first").await.unwrap();
        manager.store_upload("scan.png", b"second").await.unwrap();

        let on_disk = tokio::fs::read(dir.path().join("scan.png")).await.unwrap();
        assert_eq!(on_disk, b"second");
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            StorageManager::public_url("nail.png"),
            "/static/uploads/scans/nail.png"
        );
    }
}
