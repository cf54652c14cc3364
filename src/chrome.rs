/// chrome.* bindings: the extension-side `Browser`, `KeyValueStore`, and
/// `Clock`, plus listener wiring for the background service worker
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};

use crate::background::Background;
use crate::config::{NOTIFICATION_ICON, REMINDER_ALARM, REMINDER_INTERVAL_MINUTES};
use crate::error::{BrowserError, ProbeError, StorageError};
use crate::host::{Browser, Clock};
use crate::router::{Reply, Request, Response, dispatch};
use crate::storage::KeyValueStore;
use crate::tab_data::{ProbeData, TabId, TabInfo, TabQuery};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = query)]
    async fn tabs_query(query: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = create)]
    async fn tabs_create(properties: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = remove)]
    async fn tabs_remove(tab_id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "scripting"], js_name = executeScript)]
    async fn execute_script(injection: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = get)]
    async fn storage_get(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = set)]
    async fn storage_set(items: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "notifications"], js_name = create)]
    async fn notifications_create(options: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "alarms"], js_name = create)]
    async fn alarms_create(name: &str, info: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "runtime"], js_name = sendMessage)]
    async fn runtime_send_message(message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "tabs", "onCreated"], js_name = addListener)]
    fn add_tab_created_listener(listener: &Closure<dyn FnMut(JsValue)>);

    #[wasm_bindgen(js_namespace = ["chrome", "tabs", "onRemoved"], js_name = addListener)]
    fn add_tab_removed_listener(listener: &Closure<dyn FnMut(i32, JsValue)>);

    #[wasm_bindgen(js_namespace = ["chrome", "tabs", "onUpdated"], js_name = addListener)]
    fn add_tab_updated_listener(listener: &Closure<dyn FnMut(i32, JsValue, JsValue)>);

    #[wasm_bindgen(js_namespace = ["chrome", "tabs", "onActivated"], js_name = addListener)]
    fn add_tab_activated_listener(listener: &Closure<dyn FnMut(JsValue)>);

    #[wasm_bindgen(js_namespace = ["chrome", "alarms", "onAlarm"], js_name = addListener)]
    fn add_alarm_listener(listener: &Closure<dyn FnMut(JsValue)>);

    #[wasm_bindgen(js_namespace = ["chrome", "runtime", "onMessage"], js_name = addListener)]
    fn add_message_listener(listener: &Closure<dyn FnMut(JsValue, JsValue, js_sys::Function) -> bool>);

    #[wasm_bindgen(js_name = setTimeout)]
    fn set_timeout(handler: &js_sys::Function, ms: i32) -> JsValue;
}

// Injected with chrome.scripting.executeScript, so they must be plain JS:
// the function source is serialized into the page.
#[wasm_bindgen(inline_js = r#"
export function probeViewportFn() {
    return function () {
        const x = window.innerWidth / 2;
        let el = document.elementFromPoint(x, window.innerHeight / 2);
        let text = null;
        while (el && el !== document.body && el !== document.documentElement) {
            const candidate = (el.innerText || '').trim();
            if (candidate) {
                text = candidate.slice(0, 500);
                break;
            }
            el = el.parentElement;
        }
        return { scrollX: window.scrollX, scrollY: window.scrollY, textFragment: text };
    };
}

export function scrollToFn() {
    return function (y) {
        window.scrollTo(0, y);
    };
}
"#)]
extern "C" {
    #[wasm_bindgen(js_name = probeViewportFn)]
    fn probe_viewport_fn() -> js_sys::Function;

    #[wasm_bindgen(js_name = scrollToFn)]
    fn scroll_to_fn() -> js_sys::Function;
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    value.serialize(&serde_wasm_bindgen::Serializer::json_compatible())
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, serde_wasm_bindgen::Error> {
    serde_wasm_bindgen::from_value(value)
}

/// Best-effort text for a rejected promise
fn js_error_message(err: &JsValue) -> String {
    if let Some(err) = err.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    err.as_string().unwrap_or_else(|| format!("{:?}", err))
}

fn api_error(call: &'static str) -> impl Fn(JsValue) -> BrowserError {
    move |err| BrowserError::api(call, js_error_message(&err))
}

fn encode_args<T: Serialize>(call: &'static str, value: &T) -> Result<JsValue, BrowserError> {
    to_js(value).map_err(|err| BrowserError::decode(call, err.to_string()))
}

/// `{target: {tabId}, func, args}` for chrome.scripting.executeScript
fn injection(tab_id: TabId, func: js_sys::Function, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let target = js_sys::Object::new();
    js_sys::Reflect::set(&target, &"tabId".into(), &JsValue::from(tab_id))?;

    let injection = js_sys::Object::new();
    js_sys::Reflect::set(&injection, &"target".into(), &target)?;
    js_sys::Reflect::set(&injection, &"func".into(), &func)?;
    let args: js_sys::Array = args.iter().collect();
    js_sys::Reflect::set(&injection, &"args".into(), &args)?;
    Ok(injection.into())
}

/// The `result` of the first frame in an executeScript response
fn first_frame_result(results: &JsValue) -> Result<JsValue, JsValue> {
    let first = js_sys::Reflect::get(results, &JsValue::from(0))?;
    if first.is_undefined() || first.is_null() {
        return Ok(JsValue::UNDEFINED);
    }
    js_sys::Reflect::get(&first, &"result".into())
}

pub struct ChromeBrowser;

impl Browser for ChromeBrowser {
    async fn query_tabs(&self, query: TabQuery) -> Result<Vec<TabInfo>, BrowserError> {
        let query = encode_args("tabs.query", &query)?;
        let tabs = tabs_query(query).await.map_err(api_error("tabs.query"))?;
        from_js(tabs).map_err(|err| BrowserError::decode("tabs.query", err.to_string()))
    }

    async fn create_tab(&self, url: &str) -> Result<TabId, BrowserError> {
        let properties = encode_args("tabs.create", &json!({ "url": url }))?;
        let tab = tabs_create(properties).await.map_err(api_error("tabs.create"))?;
        js_sys::Reflect::get(&tab, &"id".into())
            .ok()
            .and_then(|id| id.as_f64())
            .map(|id| id as TabId)
            .ok_or_else(|| BrowserError::decode("tabs.create", "created tab has no id"))
    }

    async fn remove_tab(&self, tab_id: TabId) -> Result<(), BrowserError> {
        tabs_remove(tab_id).await.map_err(api_error("tabs.remove"))?;
        Ok(())
    }

    async fn probe_position(&self, tab_id: TabId) -> Result<Option<ProbeData>, ProbeError> {
        let injection_error = |err: JsValue| ProbeError::Injection {
            tab_id,
            message: js_error_message(&err),
        };

        let request = injection(tab_id, probe_viewport_fn(), &[]).map_err(injection_error)?;
        let results = execute_script(request).await.map_err(injection_error)?;
        let result = first_frame_result(&results).map_err(injection_error)?;
        if result.is_undefined() || result.is_null() {
            return Ok(None);
        }

        from_js(result).map(Some).map_err(|err| ProbeError::Malformed {
            tab_id,
            message: err.to_string(),
        })
    }

    async fn scroll_to(&self, tab_id: TabId, scroll_y: f64) -> Result<(), BrowserError> {
        let request = injection(tab_id, scroll_to_fn(), &[JsValue::from(scroll_y)])
            .map_err(api_error("scripting.executeScript"))?;
        execute_script(request)
            .await
            .map_err(api_error("scripting.executeScript"))?;
        Ok(())
    }

    async fn notify(&self, title: &str, message: &str) -> Result<(), BrowserError> {
        let options = encode_args(
            "notifications.create",
            &json!({
                "type": "basic",
                "iconUrl": NOTIFICATION_ICON,
                "title": title,
                "message": message,
            }),
        )?;
        notifications_create(options)
            .await
            .map_err(api_error("notifications.create"))?;
        Ok(())
    }
}

/// chrome.storage.local
pub struct ChromeStorage;

impl KeyValueStore for ChromeStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let read_error = |message: String| StorageError::Read {
            key: key.to_string(),
            message,
        };

        let items = storage_get(key)
            .await
            .map_err(|err| read_error(js_error_message(&err)))?;
        let value = js_sys::Reflect::get(&items, &JsValue::from_str(key))
            .map_err(|err| read_error(js_error_message(&err)))?;
        if value.is_undefined() {
            return Ok(None);
        }
        from_js(value).map(Some).map_err(|err| read_error(err.to_string()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let write_error = |message: String| StorageError::Write {
            key: key.to_string(),
            message,
        };

        let items = js_sys::Object::new();
        let value = to_js(&value).map_err(|err| write_error(err.to_string()))?;
        js_sys::Reflect::set(&items, &JsValue::from_str(key), &value)
            .map_err(|err| write_error(js_error_message(&err)))?;
        storage_set(items.into())
            .await
            .map_err(|err| write_error(js_error_message(&err)))?;
        Ok(())
    }
}

pub struct BrowserClock;

impl Clock for BrowserClock {
    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }

    async fn sleep(&self, ms: u32) {
        let delay = i32::try_from(ms).unwrap_or(i32::MAX);
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            set_timeout(&resolve, delay);
        });
        // setTimeout never rejects
        let _ = JsFuture::from(promise).await;
    }
}

/// Send `request` to the background worker. `None` when it did not answer.
pub async fn send_request(request: &Request) -> Result<Option<Response>, BrowserError> {
    let message = encode_args("runtime.sendMessage", request)?;
    let reply = runtime_send_message(message)
        .await
        .map_err(api_error("runtime.sendMessage"))?;
    if reply.is_undefined() || reply.is_null() {
        return Ok(None);
    }
    from_js(reply)
        .map(Some)
        .map_err(|err| BrowserError::decode("runtime.sendMessage", err.to_string()))
}

type ChromeBackground = Background<ChromeBrowser, ChromeStorage, BrowserClock>;

fn respond(send_response: &js_sys::Function, response: &Response) {
    match to_js(response) {
        Ok(response) => {
            if let Err(err) = send_response.call1(&JsValue::NULL, &response) {
                log::debug!("Popup went away before the reply: {}", js_error_message(&err));
            }
        }
        Err(err) => log::error!("Cannot encode response: {}", err),
    }
}

/// Returns true when the reply is sent asynchronously, keeping the channel open
fn handle_message(bg: &Rc<ChromeBackground>, message: JsValue, send_response: js_sys::Function) -> bool {
    let Ok(message) = from_js::<Value>(message) else {
        return false;
    };
    let Some(request) = Request::from_value(message) else {
        return false;
    };

    match dispatch(bg, request) {
        Reply::Now(response) => {
            respond(&send_response, &response);
            false
        }
        Reply::Later(future) => {
            spawn_local(async move {
                let response = future.await;
                respond(&send_response, &response);
            });
            true
        }
    }
}

/// The `status` field of a tabs.onUpdated change, if it changed
fn changed_status(change_info: &JsValue) -> Option<String> {
    js_sys::Reflect::get(change_info, &"status".into())
        .ok()
        .and_then(|status| status.as_string())
}

fn register_listeners(bg: &Rc<ChromeBackground>) {
    let on_created = {
        let bg = Rc::clone(bg);
        Closure::wrap(Box::new(move |_tab: JsValue| bg.on_tab_created()) as Box<dyn FnMut(JsValue)>)
    };
    add_tab_created_listener(&on_created);
    on_created.forget();

    let on_removed = {
        let bg = Rc::clone(bg);
        Closure::wrap(Box::new(move |tab_id: i32, _info: JsValue| bg.on_tab_removed(tab_id))
            as Box<dyn FnMut(i32, JsValue)>)
    };
    add_tab_removed_listener(&on_removed);
    on_removed.forget();

    let on_updated = {
        let bg = Rc::clone(bg);
        Closure::wrap(Box::new(move |tab_id: i32, change_info: JsValue, _tab: JsValue| {
            bg.on_tab_updated(tab_id, changed_status(&change_info).as_deref())
        }) as Box<dyn FnMut(i32, JsValue, JsValue)>)
    };
    add_tab_updated_listener(&on_updated);
    on_updated.forget();

    let on_activated = {
        let bg = Rc::clone(bg);
        Closure::wrap(Box::new(move |_info: JsValue| bg.on_tab_activated()) as Box<dyn FnMut(JsValue)>)
    };
    add_tab_activated_listener(&on_activated);
    on_activated.forget();

    let on_alarm = {
        let bg = Rc::clone(bg);
        Closure::wrap(Box::new(move |alarm: JsValue| {
            let name = js_sys::Reflect::get(&alarm, &"name".into())
                .ok()
                .and_then(|name| name.as_string())
                .unwrap_or_default();
            bg.on_alarm(&name);
        }) as Box<dyn FnMut(JsValue)>)
    };
    add_alarm_listener(&on_alarm);
    on_alarm.forget();

    let on_message = {
        let bg = Rc::clone(bg);
        Closure::wrap(Box::new(move |message: JsValue, _sender: JsValue, send_response: js_sys::Function| {
            handle_message(&bg, message, send_response)
        }) as Box<dyn FnMut(JsValue, JsValue, js_sys::Function) -> bool>)
    };
    add_message_listener(&on_message);
    on_message.forget();
}

/// Build the background state, register every listener, and schedule the reminder alarm
pub fn run_background() {
    let bg = Background::new(
        ChromeBrowser,
        Rc::new(ChromeStorage),
        BrowserClock,
        Box::new(|task: LocalBoxFuture<'static, ()>| spawn_local(task)),
    );
    register_listeners(&bg);
    bg.start();

    spawn_local(async {
        let info = match to_js(&json!({ "periodInMinutes": REMINDER_INTERVAL_MINUTES })) {
            Ok(info) => info,
            Err(err) => {
                log::error!("Cannot encode alarm info: {}", err);
                return;
            }
        };
        match alarms_create(REMINDER_ALARM, info).await {
            Ok(_) => log::debug!("Reminder alarm scheduled every {} minutes", REMINDER_INTERVAL_MINUTES),
            Err(err) => log::warn!("Could not schedule reminder alarm: {}", js_error_message(&err)),
        }
    });

    log::info!("Focus Guard background started");
}
