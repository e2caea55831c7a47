pub mod tools;

use std::error::Error as StdError;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::header::AUTHORIZATION;
use tokio::io::AsyncWriteExt;

use crate::error::DownloadError;
use crate::model::work_item::Attachment;
use tools::{CurlDownloader, DocumentConverter, SecureDownloader, TextutilConverter};

pub const API_VERSION: &str = "7.1";

/// Local file name for a remote attachment name: path separators become `_`.
pub fn safe_filename(name: &str) -> String {
    name.replace(['/', '\\'], "_").trim().to_string()
}

/// Resolve an attachment endpoint (`.../_apis/wit/attachments/<guid>`) to a
/// download URL. The original, unsanitized name goes into `fileName`.
pub fn attachment_download_url(base_url: &str, file_name: &str) -> String {
    let encoded = urlencoding::encode(file_name).replace("%2F", "/");
    let sep = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{sep}fileName={encoded}&api-version={API_VERSION}")
}

/// Whether a transport error was caused by certificate verification, as
/// reported by either OpenSSL or rustls somewhere in the source chain.
pub fn is_certificate_error(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        let msg = e.to_string().to_lowercase();
        if msg.contains("certificate verify failed")
            || msg.contains("certificate_verify_failed")
            || msg.contains("invalid peer certificate")
            || msg.contains("unable to get local issuer certificate")
        {
            return true;
        }
        current = e.source();
    }
    false
}

pub struct AttachmentDownloader {
    client: reqwest::Client,
    fallback: Box<dyn SecureDownloader>,
    converter: Box<dyn DocumentConverter>,
}

impl AttachmentDownloader {
    pub fn new(
        client: reqwest::Client,
        fallback: Box<dyn SecureDownloader>,
        converter: Box<dyn DocumentConverter>,
    ) -> Self {
        Self {
            client,
            fallback,
            converter,
        }
    }

    /// Downloader backed by `curl` and `textutil` when they are installed.
    pub fn with_system_tools() -> Self {
        Self::new(
            reqwest::Client::new(),
            Box::new(CurlDownloader::detect()),
            Box::new(TextutilConverter::detect()),
        )
    }

    /// Download one attachment into `dir`. Returns the downloaded file,
    /// followed by its text rendition when one could be produced. A failed
    /// conversion is logged and does not lose the download.
    pub async fn fetch(
        &self,
        attachment: &Attachment,
        bearer: &str,
        dir: &Path,
    ) -> Result<Vec<PathBuf>, DownloadError> {
        let out_path = dir.join(safe_filename(&attachment.name));
        let url = attachment_download_url(&attachment.url, &attachment.name);

        self.download_with_bearer(&url, bearer, &out_path).await?;
        let mut files = vec![out_path.clone()];

        if self.converter.handles(&out_path) && self.converter.is_available() {
            match self.converter.convert_to_text(&out_path).await {
                Ok(txt) => files.push(txt),
                Err(e) => tracing::warn!(name = %attachment.name, error = %e, "could not convert attachment to text"),
            }
        }
        Ok(files)
    }

    async fn download_with_bearer(
        &self,
        url: &str,
        bearer: &str,
        out_path: &Path,
    ) -> Result<(), DownloadError> {
        if let Some(parent) = out_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let primary = self.stream_to_file(url, bearer, out_path).await;
        self.retry_untrusted(primary, url, bearer, out_path).await
    }

    /// Hand a download that failed certificate verification to the fallback
    /// downloader when it is installed. Any other outcome passes through.
    async fn retry_untrusted(
        &self,
        primary: Result<(), DownloadError>,
        url: &str,
        bearer: &str,
        out_path: &Path,
    ) -> Result<(), DownloadError> {
        match primary {
            Err(e) if is_certificate_error(&e) && self.fallback.is_available() => {
                tracing::debug!(url, error = %e, "certificate verification failed, retrying with system trust store");
                self.fallback.download(url, bearer, out_path).await
            }
            other => other,
        }
    }

    async fn stream_to_file(
        &self,
        url: &str,
        bearer: &str,
        out_path: &Path,
    ) -> Result<(), DownloadError> {
        let resp = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: resp.status(),
            });
        }

        let mut file = tokio::fs::File::create(out_path).await?;
        let mut body = resp.bytes_stream();
        while let Some(chunk) = body.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        Ok(())
    }
}
