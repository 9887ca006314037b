//! Platform detection for Go binary downloads.

use crate::error::InstallError;
use std::fmt;

/// Archive container used by upstream for a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }
}

/// Operating system and architecture, spelled the way Go release archives name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: &'static str,
    pub arch: &'static str,
}

impl Platform {
    /// Detect the running platform.
    pub fn current() -> Result<Self, InstallError> {
        Self::from_rust(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Map Rust's `std::env::consts` names onto Go's `GOOS`/`GOARCH`.
    pub fn from_rust(os: &str, arch: &str) -> Result<Self, InstallError> {
        let unsupported = || InstallError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        };

        let go_os = match os {
            "linux" => "linux",
            "macos" => "darwin",
            "windows" => "windows",
            "freebsd" => "freebsd",
            _ => return Err(unsupported()),
        };
        let go_arch = match arch {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            "arm" => "armv6l",
            "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
            "s390x" => "s390x",
            "riscv64" => "riscv64",
            "loongarch64" => "loong64",
            _ => return Err(unsupported()),
        };

        Ok(Self {
            os: go_os,
            arch: go_arch,
        })
    }

    pub fn archive_format(&self) -> ArchiveFormat {
        if self.os == "windows" {
            ArchiveFormat::Zip
        } else {
            ArchiveFormat::TarGz
        }
    }

    /// `{base}/{version}.{os}-{arch}.{ext}`, e.g. `.../go1.21.3.linux-amd64.tar.gz`.
    pub fn archive_url(&self, base: &str, version: &str) -> String {
        format!(
            "{}/{}.{}-{}.{}",
            base.trim_end_matches('/'),
            version,
            self.os,
            self.arch,
            self.archive_format().extension()
        )
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
