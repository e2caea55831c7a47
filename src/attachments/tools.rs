use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;

use crate::error::DownloadError;

/// Replays a bearer-authenticated download through a tool that trusts the
/// operating system's certificate store.
#[async_trait]
pub trait SecureDownloader: Send + Sync {
    fn is_available(&self) -> bool;
    async fn download(&self, url: &str, bearer: &str, out_path: &Path) -> Result<(), DownloadError>;
}

/// Derives a plain-text sibling for office documents.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    fn is_available(&self) -> bool;
    fn handles(&self, path: &Path) -> bool;
    /// Returns the path of the text file written next to `path`.
    async fn convert_to_text(&self, path: &Path) -> Result<PathBuf, DownloadError>;
}

/// `curl` found on PATH.
pub struct CurlDownloader {
    program: Option<PathBuf>,
}

impl CurlDownloader {
    pub fn detect() -> Self {
        Self {
            program: find_on_path("curl"),
        }
    }
}

#[async_trait]
impl SecureDownloader for CurlDownloader {
    fn is_available(&self) -> bool {
        self.program.is_some()
    }

    async fn download(&self, url: &str, bearer: &str, out_path: &Path) -> Result<(), DownloadError> {
        let Some(program) = &self.program else {
            return Ok(());
        };
        let auth = format!("Authorization: Bearer {bearer}");
        let output = tokio::process::Command::new(program)
            .args(["-L", "-sS", "-H", auth.as_str(), "-o"])
            .arg(out_path)
            .arg(url)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(DownloadError::Tool {
                program: "curl".into(),
                path: out_path.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// macOS `textutil`, which reads `.docx` natively.
pub struct TextutilConverter {
    program: Option<PathBuf>,
}

impl TextutilConverter {
    pub fn detect() -> Self {
        Self {
            program: find_on_path("textutil"),
        }
    }
}

#[async_trait]
impl DocumentConverter for TextutilConverter {
    fn is_available(&self) -> bool {
        self.program.is_some()
    }

    fn handles(&self, path: &Path) -> bool {
        is_docx(path)
    }

    async fn convert_to_text(&self, path: &Path) -> Result<PathBuf, DownloadError> {
        let txt_path = path.with_extension("txt");
        let Some(program) = &self.program else {
            return Ok(txt_path);
        };
        let output = tokio::process::Command::new(program)
            .args(["-convert", "txt", "-stdout"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(DownloadError::Tool {
                program: "textutil".into(),
                path: path.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        tokio::fs::write(&txt_path, &output.stdout).await?;
        Ok(txt_path)
    }
}

pub fn is_docx(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"))
}

/// First executable file named `name` in PATH.
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
