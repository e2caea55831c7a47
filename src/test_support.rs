//! Helpers shared by unit tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::attachments::tools::{is_docx, DocumentConverter, SecureDownloader};
use crate::attachments::AttachmentDownloader;
use crate::error::DownloadError;

/// Serve `responses.len()` HTTP requests on a local port, answering each with
/// the next `(status line, body)` pair. The join handle yields the raw
/// request heads, in order.
pub async fn serve(responses: Vec<(&'static str, Vec<u8>)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            requests.push(String::from_utf8_lossy(&head).to_string());

            let header = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(header.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.ok();
        }
        requests
    });
    (format!("http://{addr}"), handle)
}

/// Client that never routes through a proxy picked up from the environment.
pub fn local_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Records calls instead of running curl.
#[derive(Default, Clone)]
pub struct FakeSecureDownloader {
    pub available: bool,
    pub calls: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl SecureDownloader for FakeSecureDownloader {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn download(&self, url: &str, _bearer: &str, out_path: &Path) -> Result<(), DownloadError> {
        self.calls.lock().unwrap().push(url.to_string());
        tokio::fs::write(out_path, b"via fallback").await?;
        Ok(())
    }
}

/// Writes a fixed text rendition instead of running textutil.
#[derive(Default, Clone)]
pub struct FakeConverter {
    pub available: bool,
    pub fail: bool,
}

#[async_trait]
impl DocumentConverter for FakeConverter {
    fn is_available(&self) -> bool {
        self.available
    }

    fn handles(&self, path: &Path) -> bool {
        is_docx(path)
    }

    async fn convert_to_text(&self, path: &Path) -> Result<PathBuf, DownloadError> {
        if self.fail {
            return Err(DownloadError::Tool {
                program: "fake".into(),
                path: path.to_path_buf(),
                stderr: "cannot read document".into(),
            });
        }
        let txt = path.with_extension("txt");
        tokio::fs::write(&txt, b"converted text").await?;
        Ok(txt)
    }
}

pub fn downloader(fallback: FakeSecureDownloader, converter: FakeConverter) -> AttachmentDownloader {
    AttachmentDownloader::new(local_client(), Box::new(fallback), Box::new(converter))
}
