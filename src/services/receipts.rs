//! Receipt handler.
//!
//! Customers paying by mobile money or bank transfer may upload an image of
//! their payment confirmation. Validation is pure and runs before the
//! checkout writes anything; storing needs the order id and runs inside the
//! checkout transaction.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::domain::value_objects::OrderId;
use crate::{OrderingError, Result};

pub const MAX_RECEIPT_BYTES: u64 = 5 * 1024 * 1024;
const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];
const PUBLIC_PREFIX: &str = "uploads/receipts";

/// A file as received from the client.
#[derive(Clone, Debug)]
pub struct ReceiptUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedReceipt {
    extension: String,
    bytes: Vec<u8>,
}

impl ReceiptUpload {
    pub fn validate(self) -> Result<ValidatedReceipt> {
        let extension = Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(OrderingError::InvalidReceiptType(extension));
        }
        let size = self.bytes.len() as u64;
        if size > MAX_RECEIPT_BYTES {
            return Err(OrderingError::ReceiptTooLarge { size, max: MAX_RECEIPT_BYTES });
        }
        Ok(ValidatedReceipt { extension, bytes: self.bytes })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredReceipt {
    /// Path recorded on the payment row, relative to the public upload root.
    pub relative_path: String,
    path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ReceiptStorage {
    dir: PathBuf,
}

impl ReceiptStorage {
    /// `upload_root` is the directory served as `uploads/`.
    pub fn new(upload_root: impl Into<PathBuf>) -> Self {
        Self { dir: upload_root.into().join("receipts") }
    }

    /// Writes the file next to its final name and renames it into place, so a
    /// reader never sees a partial receipt.
    pub async fn store(&self, order_id: OrderId, receipt: &ValidatedReceipt, at: DateTime<Utc>) -> Result<StoredReceipt> {
        fs::create_dir_all(&self.dir).await.map_err(OrderingError::ReceiptStorageFailed)?;

        let file_name = format!("receipt_{order_id}_{}.{}", at.timestamp(), receipt.extension);
        let path = self.dir.join(&file_name);
        let staging = self.dir.join(format!(".{}.part", Uuid::new_v4()));

        if let Err(e) = fs::write(&staging, &receipt.bytes).await {
            let _ = fs::remove_file(&staging).await;
            return Err(OrderingError::ReceiptStorageFailed(e));
        }
        if let Err(e) = fs::rename(&staging, &path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(OrderingError::ReceiptStorageFailed(e));
        }

        tracing::debug!(%order_id, path = %path.display(), "Stored payment receipt");
        Ok(StoredReceipt { relative_path: format!("{PUBLIC_PREFIX}/{file_name}"), path })
    }

    /// Removes a receipt whose checkout did not commit.
    pub async fn discard(&self, stored: &StoredReceipt) {
        if let Err(e) = fs::remove_file(&stored.path).await {
            tracing::warn!(path = %stored.path.display(), error = %e, "Failed to remove orphaned receipt");
        }
    }
}
