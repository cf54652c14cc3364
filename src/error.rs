/// Error types for Focus Guard
use thiserror::Error;

/// Failures reading or writing chrome.storage.local
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read `{key}`: {message}")]
    Read { key: String, message: String },
    #[error("failed to write `{key}`: {message}")]
    Write { key: String, message: String },
    #[error("stored value under `{key}` is malformed: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot encode value for `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures from the tabs, notifications, or runtime APIs
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("{call} failed: {message}")]
    Api { call: &'static str, message: String },
    #[error("unexpected {call} result: {message}")]
    Decode { call: &'static str, message: String },
}

impl BrowserError {
    pub fn api(call: &'static str, message: impl Into<String>) -> Self {
        BrowserError::Api {
            call,
            message: message.into(),
        }
    }

    pub fn decode(call: &'static str, message: impl Into<String>) -> Self {
        BrowserError::Decode {
            call,
            message: message.into(),
        }
    }
}

/// A page probe could not run, e.g. on chrome:// pages or the web store
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbeError {
    #[error("script injection into tab {tab_id} failed: {message}")]
    Injection { tab_id: i32, message: String },
    #[error("probe in tab {tab_id} returned malformed data: {message}")]
    Malformed { tab_id: i32, message: String },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Browser(#[from] BrowserError),
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
