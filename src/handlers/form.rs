//! Lenient extraction of Twilio form payloads.
//!
//! Twilio posts `application/x-www-form-urlencoded` bodies, but a voice
//! route must answer with TwiML even when the payload is missing, has the
//! wrong content type, or is not valid UTF-8. This extractor never rejects;
//! anything it cannot read is simply absent.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::extract::{FromRequest, Request};
use bytes::Bytes;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TwilioForm {
    fields: HashMap<String, String>,
}

impl TwilioForm {
    pub fn parse(body: &[u8]) -> Self {
        let fields = url::form_urlencoded::parse(body)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        Self { fields }
    }

    /// Field value, treating empty strings as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Field names, sorted, for logging without values.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<_> = self.fields.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn call_sid(&self) -> Option<&str> {
        self.get("CallSid")
    }
}

impl<S> FromRequest<S> for TwilioForm
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Bytes::from_request(req, state).await {
            Ok(body) => Ok(Self::parse(&body)),
            Err(e) => {
                warn!(error = %e, "Failed to read webhook body; treating as empty");
                Ok(Self::default())
            }
        }
    }
}
