/// Archive browser: search, filter, page through, and reopen archived tabs

use std::rc::Rc;

use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

use crate::archive_view::{AGE_FILTER_DAYS, ArchivePage, ArchiveQuery, filter_archive};
use crate::chrome::ChromeStorage;
use crate::domain::domain_facets;
use crate::router::Request;
use crate::storage::ArchiveStore;
use crate::tab_data::ArchiveRecord;
use crate::ui::components::{PanelState, Status, format_date, request_success};

const ALL: &str = "all";

#[function_component(ArchiveList)]
pub fn archive_list() -> Html {
    let state = use_state(|| PanelState::Loading("Loading archive...".to_string()));
    let records = use_state(Vec::<ArchiveRecord>::new);
    let query = use_state(ArchiveQuery::default);
    let page = use_state(ArchivePage::default);

    // Load the archive on mount
    {
        let state = state.clone();
        let records = records.clone();

        use_effect_with((), move |_| {
            spawn_local(async move {
                let archive = ArchiveStore::new(Rc::new(ChromeStorage));
                match archive.load().await {
                    Ok(data) => {
                        records.set(data.records);
                        state.set(PanelState::Idle);
                    }
                    Err(e) => state.set(PanelState::Error(format!("Failed to load archive: {}", e))),
                }
            });
            || ()
        });
    }

    // Any filter change starts again from the first page
    let update_query = {
        let query = query.clone();
        let page = page.clone();
        move |change: Box<dyn Fn(&mut ArchiveQuery)>| {
            let mut next = (*query).clone();
            change(&mut next);
            query.set(next);
            page.set(ArchivePage::default());
        }
    };

    let on_search_input = {
        let update_query = update_query.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                let search = input.value();
                update_query(Box::new(move |q| q.search = search.clone()));
            }
        })
    };

    let on_domain_change = {
        let update_query = update_query.clone();
        Callback::from(move |e: Event| {
            if let Some(select) = e.target_dyn_into::<HtmlSelectElement>() {
                let value = select.value();
                let domain = (value != ALL).then_some(value);
                update_query(Box::new(move |q| q.domain = domain.clone()));
            }
        })
    };

    let on_age_change = {
        let update_query = update_query.clone();
        Callback::from(move |e: Event| {
            if let Some(select) = e.target_dyn_into::<HtmlSelectElement>() {
                let days = select.value().parse::<u32>().ok();
                update_query(Box::new(move |q| q.max_age_days = days));
            }
        })
    };

    let on_load_more = {
        let page = page.clone();
        Callback::from(move |_| page.set(page.load_more()))
    };

    let on_open = {
        let state = state.clone();
        Callback::from(move |record: ArchiveRecord| {
            let state = state.clone();
            spawn_local(async move {
                if let Err(e) = request_success(Request::OpenArchivedTab { tab: record }).await {
                    state.set(PanelState::Error(format!("Open failed: {}", e)));
                }
            });
        })
    };

    let on_restore = {
        let state = state.clone();
        let records = records.clone();
        Callback::from(move |record: ArchiveRecord| {
            let state = state.clone();
            let records = records.clone();
            spawn_local(async move {
                let matcher = record.matcher();
                match request_success(Request::RestoreArchivedTab { tab: record }).await {
                    Ok(_) => {
                        let mut remaining = (*records).clone();
                        if let Some(pos) = remaining.iter().position(|r| matcher.matches(r)) {
                            remaining.remove(pos);
                        }
                        records.set(remaining);
                    }
                    Err(e) => state.set(PanelState::Error(format!("Restore failed: {}", e))),
                }
            });
        })
    };

    let on_clear = {
        let state = state.clone();
        let records = records.clone();
        Callback::from(move |_| {
            let state = state.clone();
            let records = records.clone();
            spawn_local(async move {
                match request_success(Request::ClearArchive).await {
                    Ok(_) => records.set(Vec::new()),
                    Err(e) => state.set(PanelState::Error(format!("Clear failed: {}", e))),
                }
            });
        })
    };

    let now = js_sys::Date::now();
    let filtered = filter_archive(&records, &query, now);
    let visible = page.slice(&filtered);
    let remaining = page.remaining(filtered.len());
    let facets = domain_facets(&records);
    let selected_domain = query.domain.clone().unwrap_or_else(|| ALL.to_string());

    html! {
        <div class="flex-column-gap">
            <Status state={(*state).clone()} />

            <input
                type="text"
                class="search-input"
                placeholder="Search titles and URLs..."
                value={query.search.clone()}
                oninput={on_search_input}
            />
            <div class="filter-row">
                <select onchange={on_domain_change}>
                    <option value={ALL} selected={selected_domain == ALL}>{"All domains"}</option>
                    {for facets.iter().map(|(domain, count)| html! {
                        <option key={domain.clone()} value={domain.clone()} selected={*domain == selected_domain}>
                            {format!("{} ({})", domain, count)}
                        </option>
                    })}
                </select>
                <select onchange={on_age_change}>
                    <option value={ALL} selected={query.max_age_days.is_none()}>{"Any age"}</option>
                    {for AGE_FILTER_DAYS.iter().map(|days| html! {
                        <option key={*days} value={days.to_string()} selected={query.max_age_days == Some(*days)}>
                            {if *days == 1 { "Last day".to_string() } else { format!("Last {} days", days) }}
                        </option>
                    })}
                </select>
            </div>

            if visible.is_empty() {
                <div class="empty-state">
                    <p>{"No archived tabs match your filters yet."}</p>
                </div>
            } else {
                <div class="archive-list">
                    {for visible.iter().map(|record| html! {
                        <ArchiveRow
                            key={format!("{}-{}", record.id, record.date)}
                            record={(*record).clone()}
                            on_open={on_open.clone()}
                            on_restore={on_restore.clone()}
                        />
                    })}
                </div>
            }

            if remaining > 0 {
                <Button onclick={on_load_more} variant={ButtonVariant::Secondary} block={true}>
                    {format!("Load more ({} left)", remaining)}
                </Button>
            }

            <Button onclick={on_clear} variant={ButtonVariant::Danger} disabled={records.is_empty()} block={true}>
                {"Clear archive"}
            </Button>

            <div class="footer">
                {format!("{} archived • {} shown", records.len(), filtered.len())}
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct ArchiveRowProps {
    record: ArchiveRecord,
    on_open: Callback<ArchiveRecord>,
    on_restore: Callback<ArchiveRecord>,
}

#[function_component(ArchiveRow)]
fn archive_row(props: &ArchiveRowProps) -> Html {
    let record = &props.record;

    let on_open = props.on_open.reform({
        let record = record.clone();
        move |e: MouseEvent| {
            e.prevent_default();
            record.clone()
        }
    });
    let on_restore = props.on_restore.reform({
        let record = record.clone();
        move |_| record.clone()
    });

    html! {
        <div class="tab-item">
            <div class="row-head">
                if let Some(icon) = &record.favicon_url {
                    <img class="favicon" src={icon.clone()} alt="" />
                }
                <a href={record.url.clone()} onclick={on_open}>{record.display_title()}</a>
            </div>
            <div class="meta">
                <span>{record.domain_label()}</span>
                <span>{format_date(record.date)}</span>
            </div>
            if !record.note.is_empty() {
                <div class="note">{&record.note}</div>
            }
            <Button onclick={on_restore} variant={ButtonVariant::Secondary} size={ButtonSize::Small}>
                {"Restore"}
            </Button>
        </div>
    }
}
