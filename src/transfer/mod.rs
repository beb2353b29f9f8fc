//! File transfer metadata exchanged with the upload/download pipeline.
//!
//! The pipeline itself (compression, encryption, network transfer) lives
//! elsewhere. This module only holds the per-file record it fills in and the
//! invariants that record must satisfy.

mod compression;

pub use compression::CompressionType;

use crate::error::TransferError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Client-side encryption material returned for a PUT/GET command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionMaterial {
    /// Base64 query stage master key
    pub query_stage_master_key: String,
    pub query_id: String,
    pub smk_id: u64,
}

/// Location of the stage a file is transferred to or from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageInfo {
    /// Storage kind, e.g. `S3`, `AZURE`, `GCS` or `LOCAL_FS`
    pub location_type: String,
    /// Bucket/container and path prefix
    pub location: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub creds: HashMap<String, String>,
}

/// Output of the encryption step for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptionMetadata {
    /// Wrapped file key, base64
    pub enc_key: String,
    /// Initialization vector, base64
    pub iv: String,
    /// Key length in bits
    pub key_size: u32,
    /// Material description JSON
    pub mat_desc: String,
}

/// Per-file metadata used during upload and download.
///
/// Encryption material and stage information are borrowed from the caller
/// for the lifetime of the transfer.
#[derive(Debug, Clone)]
pub struct FileMetadata<'a> {
    /// Original source file (full path)
    pub src_file_name: PathBuf,
    pub src_file_size: u64,
    /// Staged copy that is actually uploaded; the source itself unless
    /// compression is required
    pub src_file_to_upload: PathBuf,
    pub src_file_to_upload_size: u64,
    /// Destination file name (no path)
    pub dest_file_name: String,
    pub dest_file_size: u64,
    pub require_compress: bool,
    pub encryption_material: Option<&'a EncryptionMaterial>,
    pub stage_info: Option<&'a StageInfo>,
    pub encryption_metadata: EncryptionMetadata,
    /// Base64 SHA-256 of the uploaded bytes (after compression, if any)
    pub sha256_digest: String,
    pub source_compression: CompressionType,
}

impl<'a> FileMetadata<'a> {
    /// Metadata for an uncompressed upload of `src`.
    pub fn new(src: impl Into<PathBuf>, src_file_size: u64) -> Self {
        let src_file_name = src.into();
        let dest_file_name = src_file_name
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            src_file_to_upload: src_file_name.clone(),
            src_file_name,
            src_file_size,
            src_file_to_upload_size: src_file_size,
            dest_file_name,
            dest_file_size: src_file_size,
            require_compress: false,
            encryption_material: None,
            stage_info: None,
            encryption_metadata: EncryptionMetadata::default(),
            sha256_digest: String::new(),
            source_compression: CompressionType::None,
        }
    }

    /// Require gzip compression before upload. The destination name gains
    /// the `.gz` extension.
    pub fn with_require_compress(mut self, require_compress: bool) -> Self {
        let suffix = CompressionType::Gzip.file_extension();
        if require_compress && !self.dest_file_name.ends_with(suffix) {
            self.dest_file_name.push_str(suffix);
        }
        self.require_compress = require_compress;
        self
    }

    pub fn with_source_compression(mut self, compression: CompressionType) -> Self {
        self.source_compression = compression;
        self
    }

    pub fn with_encryption_material(mut self, material: &'a EncryptionMaterial) -> Self {
        self.encryption_material = Some(material);
        self
    }

    pub fn with_stage_info(mut self, stage_info: &'a StageInfo) -> Self {
        self.stage_info = Some(stage_info);
        self
    }

    /// Record the staged copy produced by the compression step.
    ///
    /// # Errors
    /// Returns `TransferError::StagedSizeMismatch` if no compression is
    /// required and `size` differs from the source size.
    pub fn record_staged_copy(
        &mut self,
        path: impl AsRef<Path>,
        size: u64,
    ) -> Result<(), TransferError> {
        if !self.require_compress && size != self.src_file_size {
            return Err(TransferError::StagedSizeMismatch {
                staged: size,
                source_size: self.src_file_size,
            });
        }

        self.src_file_to_upload = path.as_ref().to_path_buf();
        self.src_file_to_upload_size = size;
        self.dest_file_size = size;
        Ok(())
    }

    /// Compute and store the digest of the bytes that will be uploaded.
    ///
    /// # Errors
    /// Returns `TransferError::DigestInputMismatch` if `uploaded` is not the
    /// size of the staged copy.
    pub fn compute_digest(&mut self, uploaded: &[u8]) -> Result<&str, TransferError> {
        let actual = uploaded.len() as u64;
        if actual != self.src_file_to_upload_size {
            return Err(TransferError::DigestInputMismatch {
                expected: self.src_file_to_upload_size,
                actual,
            });
        }

        self.sha256_digest = STANDARD.encode(Sha256::digest(uploaded));
        debug!(
            file = %self.dest_file_name,
            bytes = actual,
            "Computed upload digest"
        );
        Ok(&self.sha256_digest)
    }

    /// Check the size invariant between source and staged copy.
    ///
    /// # Errors
    /// Returns `TransferError::StagedSizeMismatch` if no compression is
    /// required but the sizes differ.
    pub fn validate(&self) -> Result<(), TransferError> {
        if !self.require_compress && self.src_file_to_upload_size != self.src_file_size {
            return Err(TransferError::StagedSizeMismatch {
                staged: self.src_file_to_upload_size,
                source_size: self.src_file_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults_to_source() {
        let meta = FileMetadata::new("/data/orders.csv", 1024);
        assert_eq!(meta.dest_file_name, "orders.csv");
        assert_eq!(meta.src_file_to_upload, PathBuf::from("/data/orders.csv"));
        assert_eq!(meta.src_file_to_upload_size, 1024);
        assert_eq!(meta.source_compression, CompressionType::None);
        assert!(meta.validate().is_ok());
    }

    #[test]
    fn test_compressed_staging() {
        let mut meta = FileMetadata::new("/data/orders.csv", 1024).with_require_compress(true);
        assert_eq!(meta.dest_file_name, "orders.csv.gz");

        meta.record_staged_copy("/tmp/orders.csv.gz", 300).unwrap();
        assert_eq!(meta.src_file_to_upload_size, 300);
        assert_eq!(meta.dest_file_size, 300);
        assert!(meta.validate().is_ok());
    }

    #[test]
    fn test_uncompressed_size_must_match() {
        let mut meta = FileMetadata::new("/data/orders.csv", 1024);
        let err = meta.record_staged_copy("/tmp/orders.csv", 10).unwrap_err();
        assert!(matches!(
            err,
            TransferError::StagedSizeMismatch {
                staged: 10,
                source_size: 1024
            }
        ));

        meta.src_file_to_upload_size = 7;
        assert!(meta.validate().is_err());
    }

    #[test]
    fn test_digest_over_uploaded_bytes() {
        let mut meta = FileMetadata::new("/data/a.txt", 3);
        let digest = meta.compute_digest(b"abc").unwrap().to_string();
        assert_eq!(digest, "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0=");
        assert_eq!(meta.sha256_digest, digest);

        let err = meta.compute_digest(b"abcd").unwrap_err();
        assert!(matches!(
            err,
            TransferError::DigestInputMismatch {
                expected: 3,
                actual: 4
            }
        ));
    }

    #[test]
    fn test_borrowed_material_and_stage() {
        let material = EncryptionMaterial {
            query_stage_master_key: "a2V5".to_string(),
            query_id: "01a2".to_string(),
            smk_id: 42,
        };
        let stage: StageInfo = serde_json::from_value(serde_json::json!({
            "locationType": "S3",
            "location": "bucket/prefix/",
            "region": "us-west-2"
        }))
        .unwrap();

        let meta = FileMetadata::new("/data/a.txt", 3)
            .with_encryption_material(&material)
            .with_stage_info(&stage)
            .with_source_compression(CompressionType::Zstd);

        assert_eq!(meta.encryption_material.unwrap().smk_id, 42);
        assert_eq!(meta.stage_info.unwrap().region.as_deref(), Some("us-west-2"));
        assert!(meta.stage_info.unwrap().creds.is_empty());
        assert_eq!(meta.source_compression, CompressionType::Zstd);
    }
}
