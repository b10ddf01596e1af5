//! Resumable media downloader
//!
//! Fetches one rendition URL into a local file. Bytes land in `<path>.part`
//! first and the file is renamed only once the remote size is reached, so an
//! interrupted download resumes with a `Range` request on the next run.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use reqwest::header::{self, HeaderMap};
use reqwest::{Client, StatusCode};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::ProviderClientError;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const REFERER: &str = "https://www.bilibili.com/";
const ORIGIN: &str = "https://www.bilibili.com";
const PART_SUFFIX: &str = "part";

/// Shared client for media downloads. No overall timeout: bodies can be large.
static DOWNLOAD_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(4)
        .build()
        .expect("Failed to build download HTTP client")
});

/// Handle to the process-wide download client
#[must_use]
pub fn download_client() -> Client {
    DOWNLOAD_CLIENT.clone()
}

/// Downloads one media URL into `path`, resuming a previous partial attempt.
#[derive(Debug)]
pub struct PageDownloader {
    client: Client,
    url: String,
    path: PathBuf,
    remote_size: Option<u64>,
}

impl PageDownloader {
    /// `path` must name a file; an existing directory is rejected.
    pub fn new(client: Client, url: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self, ProviderClientError> {
        let path = path.into();
        if path.is_dir() {
            return Err(ProviderClientError::InvalidArgument(format!(
                "download target {} is a directory",
                path.display()
            )));
        }
        Ok(Self {
            client,
            url: url.into(),
            path,
            remote_size: None,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the in-progress file
    #[must_use]
    pub fn part_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".");
        name.push(PART_SUFFIX);
        self.path.with_file_name(name)
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, header::HeaderValue::from_static(REFERER));
        headers.insert(header::ORIGIN, header::HeaderValue::from_static(ORIGIN));
        headers
    }

    fn ensure_ok(&self, status: StatusCode) -> Result<(), ProviderClientError> {
        if status == StatusCode::OK || status == StatusCode::PARTIAL_CONTENT {
            Ok(())
        } else {
            Err(ProviderClientError::Download(format!(
                "unexpected status {status} for {}",
                self.url
            )))
        }
    }

    /// Size of the remote file in bytes, from a HEAD request (cached).
    pub async fn remote_size(&mut self) -> Result<u64, ProviderClientError> {
        if let Some(size) = self.remote_size {
            return Ok(size);
        }

        let resp = self.client.head(&self.url).headers(Self::headers()).send().await?;
        self.ensure_ok(resp.status())?;
        let size = resp
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| ProviderClientError::Download(format!("no content length for {}", self.url)))?;

        self.remote_size = Some(size);
        Ok(size)
    }

    /// Download (or finish downloading) the file and return its final path.
    pub async fn download(&mut self) -> Result<PathBuf, ProviderClientError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let total = self.remote_size().await?;
        let part = self.part_path();
        let mut local = match fs::metadata(&part).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        if local > total {
            debug!(path = %part.display(), local, total, "partial file larger than remote, restarting");
            fs::remove_file(&part).await?;
            local = 0;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&part).await?;
        if local < total {
            debug!(url = %self.url, from = local, total, "requesting byte range");
            let mut resp = self
                .client
                .get(&self.url)
                .headers(Self::headers())
                .header(header::RANGE, format!("bytes={local}-"))
                .send()
                .await?;
            let status = resp.status();
            self.ensure_ok(status)?;

            if status == StatusCode::OK && local > 0 {
                // Range ignored: the body starts from byte zero.
                drop(file);
                file = OpenOptions::new().create(true).write(true).truncate(true).open(&part).await?;
            }

            while let Some(chunk) = resp.chunk().await? {
                file.write_all(&chunk).await?;
            }
        }
        file.flush().await?;
        drop(file);

        let written = fs::metadata(&part).await?.len();
        if written != total {
            return Err(ProviderClientError::Download(format!(
                "incomplete download of {}: {written} of {total} bytes",
                self.url
            )));
        }

        fs::rename(&part, &self.path).await?;
        info!(path = %self.path.display(), bytes = total, "download finished");
        Ok(self.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BODY: &[u8] = b"0123456789";

    async fn mount_head(server: &MockServer) {
        Mock::given(method("HEAD"))
            .and(path("/media.m4s"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(BODY))
            .mount(server)
            .await;
    }

    #[test]
    fn test_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = PageDownloader::new(download_client(), "http://localhost/x", dir.path()).unwrap_err();
        assert!(matches!(err, ProviderClientError::InvalidArgument(_)));
    }

    #[test]
    fn test_part_path() {
        let downloader = PageDownloader::new(download_client(), "http://localhost/x", "/tmp/out/video.m4s").unwrap();
        assert_eq!(downloader.part_path(), PathBuf::from("/tmp/out/video.m4s.part"));
    }

    #[tokio::test]
    async fn test_download_from_scratch() {
        let server = MockServer::start().await;
        mount_head(&server).await;
        Mock::given(method("GET"))
            .and(path("/media.m4s"))
            .and(header_eq("range", "bytes=0-"))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(BODY))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("video.m4s");
        let mut downloader =
            PageDownloader::new(download_client(), format!("{}/media.m4s", server.uri()), &target).unwrap();
        let out = downloader.download().await.unwrap();

        assert_eq!(out, target);
        assert_eq!(std::fs::read(&target).unwrap(), BODY);
        assert!(!downloader.part_path().exists());
    }

    #[tokio::test]
    async fn test_download_resumes_partial_file() {
        let server = MockServer::start().await;
        mount_head(&server).await;
        Mock::given(method("GET"))
            .and(path("/media.m4s"))
            .and(header_eq("range", "bytes=4-"))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(&BODY[4..]))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("audio.m4s");
        let mut downloader =
            PageDownloader::new(download_client(), format!("{}/media.m4s", server.uri()), &target).unwrap();
        std::fs::write(downloader.part_path(), &BODY[..4]).unwrap();

        downloader.download().await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), BODY);
    }

    #[tokio::test]
    async fn test_complete_part_file_is_only_renamed() {
        let server = MockServer::start().await;
        mount_head(&server).await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("video.m4s");
        let mut downloader =
            PageDownloader::new(download_client(), format!("{}/media.m4s", server.uri()), &target).unwrap();
        std::fs::write(downloader.part_path(), BODY).unwrap();

        // No GET mock mounted: a range request would get a 404 and fail.
        downloader.download().await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), BODY);
    }

    #[tokio::test]
    async fn test_remote_size_rejects_bad_status() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/gone.m4s"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut downloader = PageDownloader::new(
            download_client(),
            format!("{}/gone.m4s", server.uri()),
            dir.path().join("gone.m4s"),
        )
        .unwrap();
        let err = downloader.remote_size().await.unwrap_err();
        assert!(matches!(err, ProviderClientError::Download(_)));
    }
}
