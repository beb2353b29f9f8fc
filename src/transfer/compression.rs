//! Source compression types recognized by the transfer pipeline.

use crate::error::TransferError;
use std::fmt;
use std::str::FromStr;

/// Declared compression of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionType {
    #[default]
    None,
    /// Detect from the file extension
    AutoDetect,
    Gzip,
    Deflate,
    RawDeflate,
    Bzip2,
    Lzip,
    Lzma,
    Lzo,
    Xz,
    Compress,
    Parquet,
    Orc,
    Zstd,
    Brotli,
}

const ALL: [CompressionType; 15] = [
    CompressionType::None,
    CompressionType::AutoDetect,
    CompressionType::Gzip,
    CompressionType::Deflate,
    CompressionType::RawDeflate,
    CompressionType::Bzip2,
    CompressionType::Lzip,
    CompressionType::Lzma,
    CompressionType::Lzo,
    CompressionType::Xz,
    CompressionType::Compress,
    CompressionType::Parquet,
    CompressionType::Orc,
    CompressionType::Zstd,
    CompressionType::Brotli,
];

impl CompressionType {
    /// Canonical upper-case name.
    pub fn name(&self) -> &'static str {
        match self {
            CompressionType::None => "NONE",
            CompressionType::AutoDetect => "AUTO_DETECT",
            CompressionType::Gzip => "GZIP",
            CompressionType::Deflate => "DEFLATE",
            CompressionType::RawDeflate => "RAW_DEFLATE",
            CompressionType::Bzip2 => "BZIP2",
            CompressionType::Lzip => "LZIP",
            CompressionType::Lzma => "LZMA",
            CompressionType::Lzo => "LZO",
            CompressionType::Xz => "XZ",
            CompressionType::Compress => "COMPRESS",
            CompressionType::Parquet => "PARQUET",
            CompressionType::Orc => "ORC",
            CompressionType::Zstd => "ZSTD",
            CompressionType::Brotli => "BROTLI",
        }
    }

    /// File extension including the leading dot; empty for `None` and
    /// `AutoDetect`.
    pub fn file_extension(&self) -> &'static str {
        match self {
            CompressionType::None | CompressionType::AutoDetect => "",
            CompressionType::Gzip => ".gz",
            CompressionType::Deflate => ".deflate",
            CompressionType::RawDeflate => ".raw_deflate",
            CompressionType::Bzip2 => ".bz2",
            CompressionType::Lzip => ".lz",
            CompressionType::Lzma => ".lzma",
            CompressionType::Lzo => ".lzo",
            CompressionType::Xz => ".xz",
            CompressionType::Compress => ".Z",
            CompressionType::Parquet => ".parquet",
            CompressionType::Orc => ".orc",
            CompressionType::Zstd => ".zst",
            CompressionType::Brotli => ".br",
        }
    }

    /// Detect the compression of `file_name` from its extension.
    pub fn from_file_name(file_name: &str) -> CompressionType {
        ALL.iter()
            .copied()
            .filter(|c| !c.file_extension().is_empty())
            .find(|c| file_name.ends_with(c.file_extension()))
            .unwrap_or(CompressionType::None)
    }

    /// Whether files of this type are already compressed.
    pub fn is_compressed(&self) -> bool {
        !matches!(self, CompressionType::None | CompressionType::AutoDetect)
    }
}

impl FromStr for CompressionType {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        ALL.iter()
            .copied()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| TransferError::UnknownCompression(s.to_string()))
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
