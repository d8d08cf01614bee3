//! HTTP client with redirect following and built-in retry logic.

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::header::LOCATION;
use reqwest::{Client, Response};
use std::io::Write;

use super::retry::{RetryPolicy, is_retryable_error};
use crate::error::DownloadError;

/// Maximum number of redirect hops followed for one request.
pub const MAX_REDIRECTS: usize = 10;

/// HTTP client that follows redirects itself and retries transient failures.
///
/// The wrapped reqwest client is expected to have automatic redirects
/// disabled (see `Config::new`); otherwise redirects are resolved by reqwest
/// before this client sees them.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Downloads `url` into the writer produced by `create_writer`.
    ///
    /// The writer is only created once a successful response arrives, so a
    /// failed request leaves no file behind. Transient failures are retried
    /// according to the retry policy.
    #[tracing::instrument(skip(self, create_writer))]
    pub async fn download_file<W, F>(&self, url: &str, create_writer: F) -> Result<u64>
    where
        W: Write,
        F: Fn() -> Result<W>,
    {
        debug!("Downloading file from {}...", url);

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.download_file_once(url, &create_writer).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    if !is_retryable_error(&e) || attempt >= max_attempts {
                        return Err(e);
                    }

                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        "Download attempt {}/{} failed ({}), retrying in {}ms...",
                        attempt,
                        max_attempts,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Single download attempt without retry.
    async fn download_file_once<W, F>(&self, url: &str, create_writer: &F) -> Result<u64>
    where
        W: Write,
        F: Fn() -> Result<W>,
    {
        let mut response = self.get_following_redirects(url).await?;
        let final_url = response.url().to_string();

        let mut writer = create_writer()?;
        let mut downloaded_bytes: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|source| DownloadError::Transport {
                url: final_url.clone(),
                source,
            })?
        {
            writer
                .write_all(&chunk)
                .context("Failed to write chunk to file")?;
            downloaded_bytes += chunk.len() as u64;
        }
        writer.flush().context("Failed to flush downloaded file")?;

        debug!(
            "Downloaded {:.2} MB from {}",
            downloaded_bytes as f64 / (1024.0 * 1024.0),
            final_url
        );

        Ok(downloaded_bytes)
    }

    /// Issues a GET and follows redirect responses until a non-redirect
    /// response arrives.
    ///
    /// Returns the final response only if its status is a success.
    #[tracing::instrument(skip(self))]
    pub async fn get_following_redirects(&self, url: &str) -> Result<Response, DownloadError> {
        let mut current = url.to_string();

        for hop in 0..=MAX_REDIRECTS {
            let response =
                self.client
                    .get(&current)
                    .send()
                    .await
                    .map_err(|source| DownloadError::Transport {
                        url: current.clone(),
                        source,
                    })?;

            let status = response.status();

            if status.is_redirection() {
                let next = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|location| response.url().join(location).ok())
                    .ok_or_else(|| DownloadError::MissingLocation {
                        status,
                        url: current.clone(),
                    })?;

                debug!("HTTP {} (hop {}): {} -> {}", status.as_u16(), hop + 1, current, next);
                current = next.to_string();
                continue;
            }

            if !status.is_success() {
                return Err(DownloadError::Status {
                    status,
                    url: current,
                });
            }

            return Ok(response);
        }

        Err(DownloadError::TooManyRedirects {
            url: current,
            limit: MAX_REDIRECTS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use reqwest::redirect::Policy;
    use std::time::Duration;
    use tempfile::tempdir;

    fn no_redirect_client() -> HttpClient {
        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .unwrap();
        HttpClient::new(client).with_retry_policy(RetryPolicy::none())
    }

    fn fast_retry(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_download_file_success() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/file.bin")
            .with_status(200)
            .with_body("test content")
            .create_async()
            .await;

        let client = no_redirect_client();
        let bytes = client
            .download_file(&format!("{}/file.bin", url), || Ok(std::io::sink()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(bytes, 12); // "test content" is 12 bytes
    }

    #[tokio::test]
    async fn test_download_file_follows_redirect() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let first = server
            .mock("GET", "/first")
            .with_status(302)
            .with_header("location", &format!("{}/second", url))
            .with_body("redirect body")
            .create_async()
            .await;

        let second = server
            .mock("GET", "/second")
            .with_status(200)
            .with_body("final body")
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("out.bin");

        let client = no_redirect_client();
        client
            .download_file(&format!("{}/first", url), || {
                Ok(std::fs::File::create(&dest)?)
            })
            .await
            .unwrap();

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "final body");
    }

    #[tokio::test]
    async fn test_redirect_chain_with_relative_location() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _a = server
            .mock("GET", "/a")
            .with_status(301)
            .with_header("location", "/b")
            .create_async()
            .await;
        let _b = server
            .mock("GET", "/b")
            .with_status(307)
            .with_header("location", "c")
            .create_async()
            .await;
        let c = server
            .mock("GET", "/c")
            .with_status(200)
            .with_body("done")
            .create_async()
            .await;

        let client = no_redirect_client();
        let response = client
            .get_following_redirects(&format!("{}/a", url))
            .await
            .unwrap();

        c.assert_async().await;
        assert_eq!(response.url().path(), "/c");
        assert_eq!(response.text().await.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_redirect_without_location() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _m = server
            .mock("GET", "/moved")
            .with_status(302)
            .create_async()
            .await;

        let client = no_redirect_client();
        let err = client
            .get_following_redirects(&format!("{}/moved", url))
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::MissingLocation { .. }));
        assert_eq!(err.status(), Some(StatusCode::FOUND));
    }

    #[tokio::test]
    async fn test_redirect_loop_is_bounded() {
        let mut server = mockito::Server::new_async().await;

        let looping = server
            .mock("GET", "/loop")
            .with_status(302)
            .with_header("location", "/loop")
            .expect(MAX_REDIRECTS + 1)
            .create_async()
            .await;

        let client = no_redirect_client();
        let err = client
            .get_following_redirects(&format!("{}/loop", server.url()))
            .await
            .unwrap_err();

        looping.assert_async().await;
        assert!(matches!(
            err,
            DownloadError::TooManyRedirects {
                limit: MAX_REDIRECTS,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_download_file_not_found() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/file.bin")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        // Retries enabled: a 404 must still only be requested once
        let client = no_redirect_client().with_retry_policy(fast_retry(3));
        let result = client
            .download_file(&format!("{}/file.bin", url), || -> Result<std::io::Sink> {
                panic!("writer must not be created for a failed response")
            })
            .await;

        mock.assert_async().await;
        let err = result.unwrap_err();
        let download_error = err.downcast_ref::<DownloadError>().unwrap();
        assert_eq!(download_error.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(download_error.url(), format!("{}/file.bin", url));
    }

    #[tokio::test]
    async fn test_download_file_status_carries_final_url() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _start = server
            .mock("GET", "/start")
            .with_status(302)
            .with_header("location", "/gone")
            .create_async()
            .await;
        let _gone = server
            .mock("GET", "/gone")
            .with_status(410)
            .create_async()
            .await;

        let client = no_redirect_client();
        let err = client
            .download_file(&format!("{}/start", url), || Ok(std::io::sink()))
            .await
            .unwrap_err();

        let download_error = err.downcast_ref::<DownloadError>().unwrap();
        assert_eq!(download_error.status(), Some(StatusCode::GONE));
        assert_eq!(download_error.url(), format!("{}/gone", url));
    }

    #[tokio::test]
    async fn test_download_file_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = no_redirect_client().with_retry_policy(fast_retry(3));
        let err = client
            .download_file(&format!("{}/flaky", server.url()), || Ok(std::io::sink()))
            .await
            .unwrap_err();

        mock.assert_async().await;
        let download_error = err.downcast_ref::<DownloadError>().unwrap();
        assert_eq!(
            download_error.status(),
            Some(StatusCode::SERVICE_UNAVAILABLE)
        );
    }

    #[tokio::test]
    async fn test_download_file_transport_error() {
        // Nothing listens on port 1
        let client = no_redirect_client();
        let err = client
            .download_file("http://127.0.0.1:1/devx", || Ok(std::io::sink()))
            .await
            .unwrap_err();

        let download_error = err.downcast_ref::<DownloadError>().unwrap();
        assert!(matches!(download_error, DownloadError::Transport { .. }));
        assert_eq!(download_error.url(), "http://127.0.0.1:1/devx");
        assert!(std::error::Error::source(download_error).is_some());
    }

    #[tokio::test]
    async fn test_redirect_to_unsupported_scheme_is_not_retried() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/devx")
            .with_status(302)
            .with_header("location", "ftp://mirror.local/devx")
            .expect(1)
            .create_async()
            .await;

        let client = no_redirect_client().with_retry_policy(fast_retry(3));
        let err = client
            .download_file(&format!("{}/devx", server.url()), || Ok(std::io::sink()))
            .await
            .unwrap_err();

        mock.assert_async().await;
        let download_error = err.downcast_ref::<DownloadError>().unwrap();
        assert!(matches!(download_error, DownloadError::Transport { .. }));
        assert_eq!(download_error.url(), "ftp://mirror.local/devx");
        assert!(!download_error.is_transient());
    }

    #[tokio::test]
    async fn test_writer_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/file.bin")
            .with_status(200)
            .with_body("data")
            .expect(1)
            .create_async()
            .await;

        let client = no_redirect_client().with_retry_policy(fast_retry(3));
        let err = client
            .download_file(&format!("{}/file.bin", server.url()), || {
                Err::<std::io::Sink, _>(anyhow::anyhow!("disk full"))
            })
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(err.downcast_ref::<DownloadError>().is_none());
        assert!(err.to_string().contains("disk full"));
    }
}
