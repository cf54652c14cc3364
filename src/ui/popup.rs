/// Popup UI for Focus Guard

use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::chrome::{ChromeBrowser, ChromeStorage, send_request};
use crate::config::{MAX_TAB_LIMIT, MIN_TAB_LIMIT};
use crate::host::Browser;
use crate::router::{Request, Response};
use crate::selection::{TabSelection, resolve_selected};
use crate::settings::{Settings, SettingsUpdate, clamp_tab_limit};
use crate::snapshot::load_current_tabs;
use crate::tab_data::{CurrentTabEntry, TabQuery};
use crate::ui::archive_list::ArchiveList;
use crate::ui::components::{PanelState, Status, format_date, request_success};

#[derive(Clone, PartialEq)]
enum ActiveTab {
    Current,
    Archive,
    Settings,
}

#[function_component(App)]
pub fn app() -> Html {
    let active_tab = use_state(|| ActiveTab::Current);

    let on_tab_click = {
        let active_tab = active_tab.clone();
        move |tab: ActiveTab| {
            let active_tab = active_tab.clone();
            Callback::from(move |_| {
                active_tab.set(tab.clone());
            })
        }
    };

    let nav_item = |tab: ActiveTab, label: &'static str| {
        let class = if *active_tab == tab {
            "pf-v5-c-tabs__item pf-m-current"
        } else {
            "pf-v5-c-tabs__item"
        };
        html! {
            <li class={class}>
                <button class="pf-v5-c-tabs__link" onclick={on_tab_click(tab)}>
                    <span class="pf-v5-c-tabs__item-text">{label}</span>
                </button>
            </li>
        }
    };

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"Focus Guard"}</h1>

            <div class="pf-v5-c-tabs tabs-nav">
                <ul class="pf-v5-c-tabs__list">
                    {nav_item(ActiveTab::Current, "Current")}
                    {nav_item(ActiveTab::Archive, "Archive")}
                    {nav_item(ActiveTab::Settings, "Settings")}
                </ul>
            </div>

            <div class="tab-pane-content">
                {match &*active_tab {
                    ActiveTab::Current => html! { <CurrentTabs /> },
                    ActiveTab::Archive => html! { <ArchiveList /> },
                    ActiveTab::Settings => html! { <SettingsPanel /> },
                }}
            </div>

            <p class="footer-popup">
                {"Focus Guard v0.1.0"}
            </p>
        </div>
    }
}

#[function_component(CurrentTabs)]
fn current_tabs() -> Html {
    let state = use_state(|| PanelState::Loading("Loading tabs...".to_string()));
    let entries = use_state(Vec::<CurrentTabEntry>::new);
    let selection = use_state(TabSelection::default);
    let note = use_state(String::new);

    // Read the last snapshot on mount
    {
        let state = state.clone();
        let entries = entries.clone();
        let selection = selection.clone();

        use_effect_with((), move |_| {
            spawn_local(async move {
                match load_current_tabs(&ChromeStorage).await {
                    Ok(loaded) => {
                        selection.set(TabSelection::new(loaded.len()));
                        entries.set(loaded);
                        state.set(PanelState::Idle);
                    }
                    Err(e) => state.set(PanelState::Error(format!("Failed to load tabs: {}", e))),
                }
            });
            || ()
        });
    }

    let on_check = {
        let selection = selection.clone();
        move |index: usize| {
            let selection = selection.clone();
            Callback::from(move |e: MouseEvent| {
                let checked = e
                    .target_dyn_into::<HtmlInputElement>()
                    .map(|input| input.checked())
                    .unwrap_or(false);
                let mut next = (*selection).clone();
                next.click(index, checked, e.shift_key());
                selection.set(next);
            })
        }
    };

    let on_note_input = {
        let note = note.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                note.set(input.value());
            }
        })
    };

    let on_archive = {
        let state = state.clone();
        let entries = entries.clone();
        let selection = selection.clone();
        let note = note.clone();

        Callback::from(move |_| {
            let picked: Vec<CurrentTabEntry> = selection
                .selected(&entries)
                .into_iter()
                .cloned()
                .collect();
            if picked.is_empty() {
                return;
            }

            let state = state.clone();
            let entries = entries.clone();
            let selection = selection.clone();
            let note = note.clone();
            state.set(PanelState::Loading("Archiving tabs...".to_string()));

            spawn_local(async move {
                let live = match ChromeBrowser.query_tabs(TabQuery::UNPINNED_CURRENT_WINDOW).await {
                    Ok(live) => live,
                    Err(e) => {
                        state.set(PanelState::Error(format!("Failed to get tabs: {}", e)));
                        return;
                    }
                };
                let picked: Vec<&CurrentTabEntry> = picked.iter().collect();
                let tabs = resolve_selected(&live, &picked);

                let request = Request::ArchiveSelectedTabs {
                    tabs,
                    note: (*note).clone(),
                };
                match request_success(request).await {
                    Ok(_) => {
                        let kept: Vec<CurrentTabEntry> = entries
                            .iter()
                            .enumerate()
                            .filter(|(i, _)| !selection.is_checked(*i))
                            .map(|(_, entry)| entry.clone())
                            .collect();
                        selection.set(TabSelection::new(kept.len()));
                        entries.set(kept);
                        note.set(String::new());
                        state.set(PanelState::Idle);
                    }
                    Err(e) => state.set(PanelState::Error(format!("Archive failed: {}", e))),
                }
            });
        })
    };

    let is_busy = matches!(*state, PanelState::Loading(_));

    html! {
        <div class="flex-column-gap">
            <Status state={(*state).clone()} />

            <div class="current-header">
                <span>{"Current Tabs"}</span>
                <span>{"Select"}</span>
            </div>
            {for entries.iter().enumerate().map(|(index, entry)| html! {
                <div key={index} class="tab-item current-row">
                    <div class="current-content">
                        <a href={entry.url.clone().unwrap_or_default()} target="_blank">
                            {entry.title.clone().unwrap_or_default()}
                        </a>
                        <br />
                        <span class="date">{format_date(entry.date)}</span>
                    </div>
                    <input
                        type="checkbox"
                        class="ios-checkbox"
                        checked={selection.is_checked(index)}
                        onclick={on_check(index)}
                    />
                </div>
            })}

            <input
                type="text"
                class="search-input"
                placeholder="Note for this batch (optional)"
                value={(*note).clone()}
                oninput={on_note_input}
            />
            <Button
                onclick={on_archive}
                disabled={is_busy || selection.count() == 0}
                variant={ButtonVariant::Primary}
                block={true}
            >
                {format!("Archive selected ({})", selection.count())}
            </Button>
        </div>
    }
}

#[function_component(SettingsPanel)]
fn settings_panel() -> Html {
    let state = use_state(|| PanelState::Loading("Loading settings...".to_string()));
    let settings = use_state(Settings::default);

    {
        let state = state.clone();
        let settings = settings.clone();

        use_effect_with((), move |_| {
            spawn_local(async move {
                match send_request(&Request::GetSettings).await {
                    Ok(Some(Response::Settings(loaded))) => {
                        settings.set(loaded);
                        state.set(PanelState::Idle);
                    }
                    Ok(_) => state.set(PanelState::Error("Background did not send settings".to_string())),
                    Err(e) => state.set(PanelState::Error(format!("Failed to load settings: {}", e))),
                }
            });
            || ()
        });
    }

    let persist = {
        let state = state.clone();
        let settings = settings.clone();
        move |update: SettingsUpdate| {
            settings.set(settings.apply(&update));
            let state = state.clone();
            spawn_local(async move {
                match request_success(Request::UpdateSettings(update)).await {
                    Ok(_) => state.set(PanelState::Idle),
                    Err(e) => state.set(PanelState::Error(format!("Failed to save settings: {}", e))),
                }
            });
        }
    };

    let on_toggle = {
        let persist = persist.clone();
        Callback::from(move |e: Event| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                persist(SettingsUpdate {
                    auto_close_enabled: Some(input.checked()),
                    tab_limit: None,
                });
            }
        })
    };

    let on_limit_change = {
        let persist = persist.clone();
        Callback::from(move |e: Event| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                let requested = input.value().trim().parse::<f64>().ok();
                if let Some(limit) = requested.and_then(clamp_tab_limit) {
                    input.set_value(&limit.to_string());
                    persist(SettingsUpdate {
                        auto_close_enabled: None,
                        tab_limit: Some(f64::from(limit)),
                    });
                }
            }
        })
    };

    html! {
        <div class="flex-column-gap">
            <Status state={(*state).clone()} />

            <label class="settings-row">
                <input
                    id="auto-close-toggle"
                    type="checkbox"
                    checked={settings.auto_close_enabled}
                    onchange={on_toggle}
                />
                {"Close the oldest tabs automatically"}
            </label>
            <label class="settings-row">
                {"Keep at most "}
                <input
                    id="tab-limit"
                    type="number"
                    min={MIN_TAB_LIMIT.to_string()}
                    max={MAX_TAB_LIMIT.to_string()}
                    value={settings.tab_limit.to_string()}
                    onchange={on_limit_change}
                />
                {" tabs open"}
            </label>
        </div>
    }
}
