//! Downloads Twilio recordings.
//!
//! Twilio serves recording media behind the account's basic-auth
//! credentials; appending `.wav` to a `RecordingUrl` selects the WAV
//! rendition.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use super::RecordingError;

#[derive(Clone)]
pub struct RecordingClient {
    http_client: Client,
    account_sid: String,
    auth_token: String,
    trusted_host_suffix: Option<String>,
}

impl std::fmt::Debug for RecordingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingClient")
            .field("account_sid", &self.account_sid)
            .field("trusted_host_suffix", &self.trusted_host_suffix)
            .finish_non_exhaustive()
    }
}

impl RecordingClient {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RecordingError> {
        let http_client = Client::builder().timeout(timeout).build().map_err(|e| {
            RecordingError::Configuration(format!("Failed to create HTTP client: {e}"))
        })?;

        Ok(Self {
            http_client,
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            trusted_host_suffix: None,
        })
    }

    /// Only send credentials to hosts ending in `suffix` (e.g. `twilio.com`).
    pub fn with_trusted_host_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.trusted_host_suffix = Some(suffix.into().to_lowercase());
        self
    }

    fn media_url(&self, recording_url: &str) -> Result<Url, RecordingError> {
        let mut url = Url::parse(recording_url)
            .map_err(|e| RecordingError::InvalidUrl(format!("{recording_url}: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(RecordingError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        // The extension belongs on the path; any query string stays as given
        let wav_path = format!("{}.wav", url.path().trim_end_matches('/'));
        url.set_path(&wav_path);

        if let Some(suffix) = &self.trusted_host_suffix {
            let host = url.host_str().unwrap_or_default().to_lowercase();
            let trusted = host == *suffix || host.ends_with(&format!(".{suffix}"));
            if !trusted || url.scheme() != "https" {
                warn!(host = %host, "Refusing to fetch recording from untrusted host");
                return Err(RecordingError::UntrustedHost(host));
            }
        }

        Ok(url)
    }

    /// Download the WAV rendition of `recording_url`.
    pub async fn fetch_wav(&self, recording_url: &str) -> Result<Bytes, RecordingError> {
        let url = self.media_url(recording_url)?;

        let response = self
            .http_client
            .get(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RecordingError::Timeout
                } else {
                    RecordingError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecordingError::Http(status.as_u16()));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| RecordingError::Network(format!("Failed to read recording: {e}")))?;
        if audio.is_empty() {
            return Err(RecordingError::Empty);
        }

        debug!(bytes = audio.len(), "Downloaded recording");
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{basic_auth, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> RecordingClient {
        RecordingClient::new("AC123", "secret", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_appends_wav_and_authenticates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Recordings/RE1.wav"))
            .and(basic_auth("AC123", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFFdata".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let audio = client()
            .fetch_wav(&format!("{}/Recordings/RE1", server.uri()))
            .await
            .unwrap();
        assert_eq!(&audio[..], b"RIFFdata");
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client()
            .fetch_wav(&format!("{}/Recordings/RE1", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordingError::Http(404)));
    }

    #[tokio::test]
    async fn test_fetch_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = client()
            .fetch_wav(&format!("{}/Recordings/RE1", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordingError::Empty));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let err = client().fetch_wav("not a url").await.unwrap_err();
        assert!(matches!(err, RecordingError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_untrusted_host_is_refused() {
        let server = MockServer::start().await;
        let client = client().with_trusted_host_suffix("twilio.com");

        let err = client
            .fetch_wav(&format!("{}/Recordings/RE1", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordingError::UntrustedHost(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn test_trusted_host_accepts_twilio_api() {
        let client = client().with_trusted_host_suffix("twilio.com");
        let url = client
            .media_url("https://api.twilio.com/2010-04-01/Accounts/AC1/Recordings/RE1")
            .unwrap();
        assert!(url.path().ends_with("RE1.wav"));

        assert!(client.media_url("https://eviltwilio.com/RE1").is_err());
        assert!(client.media_url("http://api.twilio.com/RE1").is_err());
    }

    #[test]
    fn test_wav_extension_goes_before_query() {
        let url = client()
            .media_url("https://api.twilio.com/Recordings/RE1?RequestedChannels=2#top")
            .unwrap();
        assert_eq!(url.path(), "/Recordings/RE1.wav");
        assert_eq!(url.query(), Some("RequestedChannels=2"));
        assert_eq!(url.fragment(), Some("top"));
    }

    #[tokio::test]
    async fn test_fetch_keeps_query_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Recordings/RE1.wav"))
            .and(query_param("RequestedChannels", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFFdata".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let audio = client()
            .fetch_wav(&format!("{}/Recordings/RE1?RequestedChannels=2", server.uri()))
            .await
            .unwrap();
        assert_eq!(&audio[..], b"RIFFdata");
    }
}
