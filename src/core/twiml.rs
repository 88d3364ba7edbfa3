//! TwiML voice-response documents.
//!
//! Only the verbs this service speaks are modelled: `<Say>`, `<Gather>`,
//! `<Pause>` and `<Hangup>`. Documents render to XML and are served as
//! `application/xml`.

use std::fmt::Write;

use axum::http::header;
use axum::response::{IntoResponse, Response};

pub const XML_CONTENT_TYPE: &str = "application/xml";

/// Voice and language applied to every `<Say>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SayVoice {
    pub voice: String,
    pub language: String,
}

impl SayVoice {
    pub fn new(voice: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            voice: voice.into(),
            language: language.into(),
        }
    }
}

impl Default for SayVoice {
    fn default() -> Self {
        Self::new("Polly.Joanna", "en-US")
    }
}

/// Speech `<Gather>` posting results back to `action`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gather {
    pub action: String,
    /// Seconds to wait for the caller to start speaking.
    pub timeout: Option<u32>,
}

impl Gather {
    pub fn speech(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout = Some(seconds);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Say(String),
    Gather(Gather),
    Pause(u32),
    Hangup,
}

/// A `<Response>` document under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceResponse {
    voice: SayVoice,
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    pub fn new(voice: SayVoice) -> Self {
        Self {
            voice,
            verbs: Vec::new(),
        }
    }

    pub fn say(mut self, text: impl Into<String>) -> Self {
        self.verbs.push(Verb::Say(text.into()));
        self
    }

    pub fn gather(mut self, gather: Gather) -> Self {
        self.verbs.push(Verb::Gather(gather));
        self
    }

    pub fn pause(mut self, seconds: u32) -> Self {
        self.verbs.push(Verb::Pause(seconds));
        self
    }

    pub fn hangup(mut self) -> Self {
        self.verbs.push(Verb::Hangup);
        self
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    /// Text of every `<Say>`, in document order.
    pub fn spoken(&self) -> Vec<&str> {
        self.verbs
            .iter()
            .filter_map(|verb| match verb {
                Verb::Say(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn ends_with_hangup(&self) -> bool {
        matches!(self.verbs.last(), Some(Verb::Hangup))
    }

    pub fn render(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>");
        for verb in &self.verbs {
            match verb {
                Verb::Say(text) => {
                    let _ = write!(
                        xml,
                        "<Say voice=\"{}\" language=\"{}\">{}</Say>",
                        escape(&self.voice.voice),
                        escape(&self.voice.language),
                        escape(text)
                    );
                }
                Verb::Gather(gather) => {
                    let _ = write!(
                        xml,
                        "<Gather action=\"{}\" method=\"POST\" input=\"speech\" numDigits=\"0\" \
                         speechTimeout=\"auto\" speechModel=\"experimental_conversations\"",
                        escape(&gather.action)
                    );
                    if let Some(timeout) = gather.timeout {
                        let _ = write!(xml, " timeout=\"{timeout}\"");
                    }
                    xml.push_str("/>");
                }
                Verb::Pause(seconds) => {
                    let _ = write!(xml, "<Pause length=\"{seconds}\"/>");
                }
                Verb::Hangup => xml.push_str("<Hangup/>"),
            }
        }
        xml.push_str("</Response>");
        xml
    }
}

impl IntoResponse for VoiceResponse {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, XML_CONTENT_TYPE)], self.render()).into_response()
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
