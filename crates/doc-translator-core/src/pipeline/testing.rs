//! Scripted translator for pipeline unit tests.

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::source::MediaType;
use crate::translator::{TextStream, Translator, TranslatorInfo};

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    /// Transient upstream failure
    Fail,
    /// Permanent rejection
    Reject,
    /// One fragment, then a stream error
    BrokenStream(String),
    /// A stream that never yields
    Hang,
}

/// Replies are scripted per payload and consumed in order; the last reply of
/// a script repeats. Unscripted payloads translate to `"<payload> translated"`.
pub struct MockTranslator {
    scripts: Mutex<HashMap<Vec<u8>, Vec<Reply>>>,
    calls: AtomicUsize,
    available: bool,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            available: true,
        }
    }

    pub fn with_script(self, payload: &[u8], replies: Vec<Reply>) -> Self {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.insert(payload.to_vec(), replies);
        }
        self
    }

    pub const fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_reply(&self, payload: &[u8]) -> Reply {
        let mut scripts = match self.scripts.lock() {
            Ok(scripts) => scripts,
            Err(poisoned) => poisoned.into_inner(),
        };
        match scripts.get_mut(payload) {
            Some(replies) if replies.len() > 1 => replies.remove(0),
            Some(replies) if !replies.is_empty() => replies[0].clone(),
            _ => Reply::Text(format!("{} translated", String::from_utf8_lossy(payload))),
        }
    }
}

#[async_trait]
impl Translator for MockTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "Mock",
            model: "mock-1".to_string(),
            requires_api_key: false,
        }
    }

    async fn translate(
        &self,
        payload: &[u8],
        _media_type: MediaType,
        _instructions: &str,
    ) -> Result<TextStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fragments: Vec<Result<String>> = match self.next_reply(payload) {
            Reply::Text(text) => {
                let mid = text
                    .char_indices()
                    .nth(text.chars().count() / 2)
                    .map_or(text.len(), |(i, _)| i);
                let (head, tail) = text.split_at(mid);
                vec![Ok(head.to_string()), Ok(tail.to_string())]
            }
            Reply::Fail => return Err(Error::TranslationRequest("HTTP 503".to_string())),
            Reply::Reject => return Err(Error::TranslationRejected("HTTP 400".to_string())),
            Reply::BrokenStream(partial) => vec![
                Ok(partial),
                Err(Error::TranslationRequest("connection reset".to_string())),
            ],
            Reply::Hang => return Ok(futures::stream::pending().boxed()),
        };
        Ok(futures::stream::iter(fragments).boxed())
    }

    fn is_available(&self) -> bool {
        self.available
    }
}
