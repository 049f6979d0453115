use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::StorageError;
use crate::models::UploadedFile;

/// 上传文件的本地存储
///
/// 存储引用为 `{uuid}.{ext}`, 每次上传都会生成新的 UUID, 并以 create_new 方式创建文件,
/// 同名文件并发上传也不会互相覆盖。
#[derive(Debug, Clone)]
pub struct InvoiceFileStorage {
    base_dir: PathBuf,
}

impl InvoiceFileStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// 保存文件内容, 返回存储引用
    pub async fn save(&self, file: &UploadedFile) -> Result<String, StorageError> {
        tokio::fs::create_dir_all(&self.base_dir).await?;

        let reference = match file.extension() {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let path = self.base_dir.join(&reference);

        let mut handle = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        let written = async {
            handle.write_all(&file.data).await?;
            handle.flush().await?;
            handle.sync_all().await
        }
        .await;
        drop(handle);

        if let Err(e) = written {
            tracing::error!("Failed to write {}: {}", path.display(), e);
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                tracing::warn!("Failed to remove partial file {}: {}", path.display(), cleanup);
            }
            return Err(e.into());
        }

        tracing::info!("Stored upload {:?} as {} ({} bytes)", file.file_name, reference, file.data.len());
        Ok(reference)
    }

    /// 按存储引用读取文件内容
    pub async fn read(&self, reference: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(reference)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(reference.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 引用只能是单个文件名, 不能包含路径分隔符或 `..`
    pub fn path_for(&self, reference: &str) -> Result<PathBuf, StorageError> {
        let valid = !reference.is_empty()
            && !reference.starts_with('.')
            && reference
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
        if !valid {
            return Err(StorageError::InvalidReference(reference.to_string()));
        }
        Ok(self.base_dir.join(reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, data: &[u8]) -> UploadedFile {
        UploadedFile::new(Some(name.to_string()), None, data.to_vec())
    }

    #[tokio::test]
    async fn save_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let storage = InvoiceFileStorage::new(dir.path().join("invoices"));

        let reference = storage.save(&upload("Invoice.TXT", b"Total: 1.00")).await.unwrap();

        assert!(reference.ends_with(".txt"));
        assert!(Uuid::parse_str(reference.trim_end_matches(".txt")).is_ok());
        assert_eq!(storage.read(&reference).await.unwrap(), b"Total: 1.00");
    }

    #[tokio::test]
    async fn missing_extension_is_plain_uuid() {
        let dir = tempfile::tempdir().unwrap();
        let storage = InvoiceFileStorage::new(dir.path());

        let reference = storage
            .save(&UploadedFile::new(None, None, b"abc".to_vec()))
            .await
            .unwrap();
        assert!(Uuid::parse_str(&reference).is_ok());
    }

    #[tokio::test]
    async fn same_name_uploads_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let storage = InvoiceFileStorage::new(dir.path());

        let first = upload("invoice.json", b"first");
        let second = upload("invoice.json", b"second");
        let (a, b) = tokio::join!(storage.save(&first), storage.save(&second));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a, b);
        assert_eq!(storage.read(&a).await.unwrap(), b"first");
        assert_eq!(storage.read(&b).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = InvoiceFileStorage::new(dir.path());

        for reference in ["../secret", "a/b", "..", "", ".hidden", "a\\b"] {
            assert!(
                matches!(storage.read(reference).await, Err(StorageError::InvalidReference(_))),
                "{reference:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn unknown_reference_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = InvoiceFileStorage::new(dir.path());

        let result = storage.read(&format!("{}.txt", Uuid::new_v4())).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn unwritable_directory_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let storage = InvoiceFileStorage::new(&blocker);

        let result = storage.save(&upload("invoice.txt", b"data")).await;
        assert!(matches!(result, Err(StorageError::Io(_))));
    }
}
