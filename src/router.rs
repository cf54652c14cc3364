/// Request router for messages sent by the popup
///
/// Every inbound message is parsed into the closed `Request` type and
/// dispatched exhaustively. Messages with an unknown `action` get no reply.
use std::fmt::Display;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::background::Background;
use crate::host::{Browser, Clock};
use crate::settings::{Settings, SettingsUpdate};
use crate::storage::KeyValueStore;
use crate::tab_data::{ArchiveRecord, TabInfo};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    ArchiveSelectedTabs {
        tabs: Vec<TabInfo>,
        #[serde(default)]
        note: String,
    },
    OpenArchivedTab {
        tab: ArchiveRecord,
    },
    RestoreArchivedTab {
        tab: ArchiveRecord,
    },
    GetSettings,
    UpdateSettings(SettingsUpdate),
    ClearArchive,
}

impl Request {
    /// `None` for unknown actions and malformed payloads
    pub fn from_value(message: Value) -> Option<Request> {
        match serde_json::from_value(message) {
            Ok(request) => Some(request),
            Err(err) => {
                log::debug!("Ignoring message: {}", err);
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Settings(Settings),
    Outcome {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl Response {
    pub fn success(success: bool) -> Response {
        Response::Outcome {
            success,
            error: None,
        }
    }

    pub fn failed(err: impl Display) -> Response {
        Response::Outcome {
            success: false,
            error: Some(err.to_string()),
        }
    }

    fn from_result<T, E: Display>(result: Result<T, E>, success: impl FnOnce(T) -> bool) -> Response {
        match result {
            Ok(value) => Response::success(success(value)),
            Err(err) => {
                log::warn!("Request failed: {}", err);
                Response::failed(err)
            }
        }
    }
}

pub enum Reply {
    /// Answer right away
    Now(Response),
    /// The answer arrives when the future completes
    Later(LocalBoxFuture<'static, Response>),
}

pub fn dispatch<B, S, C>(bg: &Rc<Background<B, S, C>>, request: Request) -> Reply
where
    B: Browser + 'static,
    S: KeyValueStore + 'static,
    C: Clock + 'static,
{
    match request {
        Request::ArchiveSelectedTabs { tabs, note } => {
            bg.archive_selected(tabs, note);
            Reply::Now(Response::success(true))
        }
        Request::OpenArchivedTab { tab } => {
            let bg = Rc::clone(bg);
            Reply::Later(Box::pin(async move {
                Response::from_result(bg.open_archived(&tab).await, |_| true)
            }))
        }
        Request::RestoreArchivedTab { tab } => {
            let bg = Rc::clone(bg);
            Reply::Later(Box::pin(async move {
                Response::from_result(bg.restore_archived(&tab).await, |removed| removed)
            }))
        }
        Request::GetSettings => {
            let bg = Rc::clone(bg);
            Reply::Later(Box::pin(async move { Response::Settings(bg.settings().await) }))
        }
        Request::UpdateSettings(update) => {
            let bg = Rc::clone(bg);
            Reply::Later(Box::pin(async move {
                Response::from_result(bg.update_settings(&update).await, |_| true)
            }))
        }
        Request::ClearArchive => {
            let bg = Rc::clone(bg);
            Reply::Later(Box::pin(async move {
                Response::from_result(bg.clear_archive().await, |_| true)
            }))
        }
    }
}
