/// Small pieces shared by the popup panels

use patternfly_yew::prelude::*;
use wasm_bindgen::JsValue;
use yew::prelude::*;

use crate::chrome::send_request;
use crate::router::{Request, Response};

#[derive(Clone, PartialEq)]
pub enum PanelState {
    Loading(String),
    Idle,
    Error(String),
}

#[derive(Properties, PartialEq)]
pub struct StatusProps {
    pub state: PanelState,
}

/// Spinner while loading, an inline alert on failure, nothing when idle
#[function_component(Status)]
pub fn status(props: &StatusProps) -> Html {
    match &props.state {
        PanelState::Loading(msg) => html! {
            <div class="loading-text-center">
                <Spinner />
                <p class="loading-text">{msg}</p>
            </div>
        },
        PanelState::Error(err) => html! {
            <div class="message-top-margin">
                <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                    {err.clone()}
                </Alert>
            </div>
        },
        PanelState::Idle => html! {},
    }
}

/// Local date and time for an epoch-millisecond timestamp
pub fn format_date(ms: f64) -> String {
    if ms <= 0.0 {
        return String::new();
    }
    let date = js_sys::Date::new(&JsValue::from_f64(ms));
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}",
        date.get_full_year(),
        date.get_month() + 1,
        date.get_date(),
        date.get_hours(),
        date.get_minutes()
    )
}

/// Send `request` and turn anything but a success into a displayable error
pub async fn request_success(request: Request) -> Result<bool, String> {
    match send_request(&request).await {
        Ok(Some(Response::Outcome { success, error: None })) => Ok(success),
        Ok(Some(Response::Outcome { error: Some(err), .. })) => Err(err),
        Ok(Some(Response::Settings(_))) => Err("Unexpected reply from background".to_string()),
        Ok(None) => Err("Background did not answer".to_string()),
        Err(e) => Err(e.to_string()),
    }
}
