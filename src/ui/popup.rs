/// Popup UI: raid dashboard, BiS list management, settings, data tools

use yew::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, HtmlSelectElement};
use patternfly_yew::prelude::*;
use crate::competition::{item_softres_details, rate_bis_items, build_recommendations, SoftresDetails};
use crate::messages::{to_wire, AvailableItemsReply, ErrorReply, ExportReply, Request};
use crate::raids::{detect_raid_type, RaidCode};
use crate::snapshot::{ItemEntry, RaidSnapshot, ReservationSnapshot};
use crate::storage::{BisData, ImportBundle, Settings, BIS_DATA_KEY, SETTINGS_KEY};
use crate::ui::components::{CompetitionBadge, EmptyState, ReserveCount};

// Import JS bridge functions
#[wasm_bindgen(module = "/popup.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    /// chrome.runtime.sendMessage to the background worker
    #[wasm_bindgen(catch)]
    async fn sendRuntimeMessage(message: JsValue) -> Result<JsValue, JsValue>;

    /// chrome.tabs.sendMessage to the active tab's content script
    #[wasm_bindgen(catch)]
    async fn sendActiveTabMessage(message: JsValue) -> Result<JsValue, JsValue>;

    fn exportToFile(data: &str, filename: &str);

    /// Opens a file picker and resolves with the file text, or null on cancel
    #[wasm_bindgen(catch)]
    async fn importFromFile() -> Result<JsValue, JsValue>;
}

#[derive(Clone, PartialEq)]
enum AppState {
    Idle,
    Loading(String),
    Error(String),
}

#[derive(Clone, PartialEq)]
enum ActivePane {
    Dashboard,
    BisList,
    Settings,
    Data,
}

#[function_component(App)]
pub fn app() -> Html {
    let state = use_state(|| AppState::Loading("Loading...".to_string()));
    let settings = use_state(Settings::default);
    let bis_data = use_state(BisData::new);
    let current_raid = use_state(|| None::<RaidSnapshot>);
    let softres_data = use_state(|| None::<ReservationSnapshot>);
    let available_items = use_state(Vec::<ItemEntry>::new);
    let selected_raid = use_state(|| None::<RaidCode>);
    let item_input = use_state(String::new);
    let active_pane = use_state(|| ActivePane::Dashboard);

    // Load the store and query the active tab on mount
    {
        let state = state.clone();
        let settings = settings.clone();
        let bis_data = bis_data.clone();
        let current_raid = current_raid.clone();
        let softres_data = softres_data.clone();
        let available_items = available_items.clone();
        let selected_raid = selected_raid.clone();

        use_effect_with((), move |_| {
            spawn_local(async move {
                let (stored_settings, stored_bis) = load_stored().await;
                settings.set(stored_settings);
                bis_data.set(stored_bis);

                if let Some(raid) = query_raid_info().await {
                    let code = detect_raid_type(&raid.raid_name);
                    if code != RaidCode::UNKNOWN {
                        selected_raid.set(Some(code));
                    }
                    current_raid.set(Some(raid));

                    softres_data.set(query_softres_data().await);
                    available_items.set(query_available_items().await);
                }
                state.set(AppState::Idle);
            });
            || ()
        });
    }

    // Re-analyze the active tab through the background worker
    let on_analyze = {
        let state = state.clone();
        let current_raid = current_raid.clone();
        let softres_data = softres_data.clone();
        let available_items = available_items.clone();
        let selected_raid = selected_raid.clone();

        Callback::from(move |_| {
            let state = state.clone();
            let current_raid = current_raid.clone();
            let softres_data = softres_data.clone();
            let available_items = available_items.clone();
            let selected_raid = selected_raid.clone();

            state.set(AppState::Loading("Analyzing page...".to_string()));

            spawn_local(async move {
                if let Err(e) = runtime_request(&Request::AnalyzeCurrentTab).await {
                    state.set(AppState::Error(e));
                    return;
                }
                if let Some(raid) = query_raid_info().await {
                    let code = detect_raid_type(&raid.raid_name);
                    if code != RaidCode::UNKNOWN {
                        selected_raid.set(Some(code));
                    }
                    current_raid.set(Some(raid));
                    softres_data.set(query_softres_data().await);
                    available_items.set(query_available_items().await);
                }
                state.set(AppState::Idle);
            });
        })
    };

    // Re-apply highlights on the page
    let on_highlight = {
        Callback::from(move |_| {
            spawn_local(async move {
                if let Err(e) = runtime_tab_request(&Request::HighlightBis).await {
                    log::debug!("highlight request failed: {e}");
                }
            });
        })
    };

    let on_item_input = {
        let item_input = item_input.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                item_input.set(input.value());
            }
        })
    };

    let on_raid_select = {
        let selected_raid = selected_raid.clone();
        Callback::from(move |e: Event| {
            if let Some(select) = e.target_dyn_into::<HtmlSelectElement>() {
                let value = select.value();
                if value.is_empty() {
                    selected_raid.set(None);
                } else {
                    selected_raid.set(Some(RaidCode::from_tag(&value)));
                }
            }
        })
    };

    let add_item = {
        let bis_data = bis_data.clone();
        let selected_raid = selected_raid.clone();
        let item_input = item_input.clone();
        let state = state.clone();

        move || {
            let name = (*item_input).clone();
            let Some(raid) = *selected_raid else {
                alert("Please select a raid and enter an item name");
                return;
            };
            let mut updated = (*bis_data).clone();
            match updated.add_item(raid, &name, js_sys::Date::now()) {
                Ok(()) => {
                    bis_data.set(updated.clone());
                    item_input.set(String::new());
                    persist_bis(updated, state.clone());
                }
                Err(message) => alert(&message),
            }
        }
    };

    let on_add_click = {
        let add_item = add_item.clone();
        Callback::from(move |_: MouseEvent| add_item())
    };

    let on_item_keypress = {
        Callback::from(move |e: KeyboardEvent| {
            if e.key() == "Enter" {
                add_item();
            }
        })
    };

    let on_remove_item = {
        let bis_data = bis_data.clone();
        let state = state.clone();

        Callback::from(move |(raid, name): (RaidCode, String)| {
            let mut updated = (*bis_data).clone();
            if updated.remove_item(raid, &name) {
                bis_data.set(updated.clone());
                persist_bis(updated, state.clone());
            }
        })
    };

    // Settings handlers
    let on_auto_analyze = toggle_setting(&settings, &state, |s, v| s.auto_analyze = v);
    let on_highlight_bis = toggle_setting(&settings, &state, |s, v| s.highlight_bis = v);
    let on_show_recommendations = toggle_setting(&settings, &state, |s, v| s.show_recommendations = v);
    let on_notifications = toggle_setting(&settings, &state, |s, v| s.notifications_enabled = v);

    let on_character_name = {
        let settings = settings.clone();
        let state = state.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                let mut updated = (*settings).clone();
                updated.character_name = input.value().trim().to_string();
                settings.set(updated.clone());
                persist_settings(updated, state.clone());
            }
        })
    };

    // Data management handlers
    let on_export = {
        let state = state.clone();
        Callback::from(move |_| {
            let state = state.clone();
            spawn_local(async move {
                match export_bundle().await {
                    Ok(json) => exportToFile(&json, "minmaxer-bis-data.json"),
                    Err(e) => state.set(AppState::Error(e)),
                }
            });
        })
    };

    let on_import = {
        let settings = settings.clone();
        let bis_data = bis_data.clone();
        let state = state.clone();
        Callback::from(move |_| {
            let settings = settings.clone();
            let bis_data = bis_data.clone();
            let state = state.clone();
            spawn_local(async move {
                let text = match importFromFile().await {
                    Ok(value) => value.as_string(),
                    Err(e) => {
                        state.set(AppState::Error(format!("Import failed: {e:?}")));
                        return;
                    }
                };
                let Some(text) = text else {
                    return; // picker cancelled
                };
                let bundle = match serde_json::from_str::<ImportBundle>(&text) {
                    Ok(bundle) => bundle,
                    Err(_) => {
                        alert("Error importing data: Invalid file format");
                        return;
                    }
                };
                // The background worker owns the import; re-read the store
                // afterwards to pick up what it wrote
                match runtime_request(&Request::ImportBisData { data: bundle }).await {
                    Ok(response) => {
                        if let Ok(err) = serde_wasm_bindgen::from_value::<ErrorReply>(response) {
                            alert(&format!("Error importing data: {}", err.error));
                            return;
                        }
                        let (stored_settings, stored_bis) = load_stored().await;
                        settings.set(stored_settings);
                        bis_data.set(stored_bis);
                        alert("Data imported successfully!");
                    }
                    Err(e) => state.set(AppState::Error(e)),
                }
            });
        })
    };

    let on_reset = {
        let bis_data = bis_data.clone();
        let state = state.clone();
        Callback::from(move |_| {
            if confirm("Are you sure you want to reset all BiS data? This cannot be undone.") {
                let cleared = BisData::new();
                bis_data.set(cleared.clone());
                persist_bis(cleared, state.clone());
                alert("All data has been reset");
            }
        })
    };

    let is_busy = matches!(*state, AppState::Loading(_));

    let on_pane_click = {
        let active_pane = active_pane.clone();
        move |pane: ActivePane| {
            let active_pane = active_pane.clone();
            Callback::from(move |_| {
                active_pane.set(pane.clone());
            })
        }
    };

    let pane_tab = |pane: ActivePane, label: &str| -> Html {
        let class = if *active_pane == pane {
            "pf-v5-c-tabs__item pf-m-current"
        } else {
            "pf-v5-c-tabs__item"
        };
        html! {
            <li class={class}>
                <button class="pf-v5-c-tabs__link" onclick={on_pane_click(pane)}>
                    <span class="pf-v5-c-tabs__item-text">{label}</span>
                </button>
            </li>
        }
    };

    // Competition view for the raid detected on the page
    let detected_raid = (*current_raid)
        .as_ref()
        .map(|raid| detect_raid_type(&raid.raid_name))
        .unwrap_or(RaidCode::UNKNOWN);
    let rated = (*softres_data)
        .as_ref()
        .map(|snapshot| {
            rate_bis_items(
                snapshot,
                &bis_data.item_names_for(detected_raid),
                &settings.character_name,
            )
        })
        .unwrap_or_default();

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"MinMaxer"}</h1>

            <div class="pf-v5-c-tabs tabs-nav">
                <ul class="pf-v5-c-tabs__list">
                    {pane_tab(ActivePane::Dashboard, "Dashboard")}
                    {pane_tab(ActivePane::BisList, "BiS List")}
                    {pane_tab(ActivePane::Settings, "Settings")}
                    {pane_tab(ActivePane::Data, "Data")}
                </ul>
            </div>

            {match &*state {
                AppState::Loading(msg) => html! {
                    <div class="loading-text-center">
                        <Spinner />
                        <p class="loading-text">{msg}</p>
                    </div>
                },
                AppState::Error(err) => html! {
                    <div class="message-top-margin">
                        <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                            {err.clone()}
                        </Alert>
                    </div>
                },
                AppState::Idle => html! {}
            }}

            <div class="tab-pane-content">
                {match &*active_pane {
                    ActivePane::Dashboard => html! {
                        <div class="flex-column-gap">
                            {match &*current_raid {
                                Some(raid) => html! {
                                    <div class="raid-card">
                                        <h2 id="current-raid">{&raid.raid_name}</h2>
                                        <p id="raid-status">{format!("{} players registered", raid.total_players)}</p>
                                    </div>
                                },
                                None => html! {
                                    <div class="raid-card">
                                        <h2 id="current-raid">{"No raid detected"}</h2>
                                        <p id="raid-status">{"Visit a softres.it raid page to get started"}</p>
                                    </div>
                                },
                            }}

                            <Button onclick={on_analyze} disabled={is_busy} variant={ButtonVariant::Secondary} block={true}>
                                {"🔍 Analyze Current Page"}
                            </Button>
                            <Button onclick={on_highlight} disabled={is_busy} variant={ButtonVariant::Secondary} block={true}>
                                {"✨ Highlight BiS Items"}
                            </Button>

                            <h2 class="section-title">{"BiS Competition"}</h2>
                            if current_raid.is_none() {
                                <EmptyState message="No raid detected" />
                            } else if rated.is_empty() {
                                <EmptyState message="No BiS items configured for this raid" />
                            } else {
                                <div class="bis-competition-list">
                                    {for rated.iter().map(|item| html! {
                                        <div class="bis-item">
                                            <div class="bis-item-info">
                                                <div class="bis-item-name">{&item.name}</div>
                                                <ReserveCount details={item.details} />
                                            </div>
                                            <CompetitionBadge count={item.details.competition_count} />
                                        </div>
                                    })}
                                </div>
                            }

                            if settings.show_recommendations {
                                <h2 class="section-title">{"Recommendations"}</h2>
                                <ul class="recommendation-list">
                                    {for build_recommendations(&rated).iter().map(|rec| html! {
                                        <li>{rec.clone()}</li>
                                    })}
                                </ul>
                            }
                        </div>
                    },
                    ActivePane::BisList => html! {
                        <div class="flex-column-gap">
                            <select class="raid-select" onchange={on_raid_select}>
                                <option value="" selected={selected_raid.is_none()}>{"Select raid..."}</option>
                                {for RaidCode::all().iter().map(|code| html! {
                                    <option value={code.tag()} selected={*selected_raid == Some(*code)}>
                                        {code.display_name()}
                                    </option>
                                })}
                            </select>

                            <div class="add-item-row">
                                <input
                                    type="text"
                                    placeholder="Item name..."
                                    list="item-suggestions"
                                    value={(*item_input).clone()}
                                    oninput={on_item_input}
                                    onkeypress={on_item_keypress}
                                />
                                <datalist id="item-suggestions">
                                    {for available_items.iter().map(|item| html! {
                                        <option value={item.name.clone()} />
                                    })}
                                </datalist>
                                <Button onclick={on_add_click} disabled={is_busy} variant={ButtonVariant::Primary}>
                                    {"Add"}
                                </Button>
                            </div>

                            {match *selected_raid {
                                Some(raid) if !bis_data.items_for(raid).is_empty() => html! {
                                    <div class="bis-items-list">
                                        {for bis_data.items_for(raid).iter().map(|item| {
                                            let details = details_for(&softres_data, &item.name, &settings.character_name);
                                            let on_remove = {
                                                let on_remove_item = on_remove_item.clone();
                                                let name = item.name.clone();
                                                Callback::from(move |_| on_remove_item.emit((raid, name.clone())))
                                            };
                                            html! {
                                                <div class="bis-item">
                                                    <div class="bis-item-info">
                                                        <div class="bis-item-name">{&item.name}</div>
                                                        <ReserveCount details={details} />
                                                    </div>
                                                    <CompetitionBadge count={details.competition_count} />
                                                    <button class="remove-item" onclick={on_remove}>{"×"}</button>
                                                </div>
                                            }
                                        })}
                                    </div>
                                },
                                Some(_) => html! {
                                    <EmptyState message="No BiS items configured. Add items above." />
                                },
                                None => html! {
                                    <EmptyState message="Select a raid to manage its BiS list" />
                                },
                            }}
                        </div>
                    },
                    ActivePane::Settings => html! {
                        <div class="flex-column-gap">
                            <label class="setting-row">
                                <input type="checkbox" checked={settings.auto_analyze} onchange={on_auto_analyze} />
                                {"Auto-analyze softres.it pages"}
                            </label>
                            <label class="setting-row">
                                <input type="checkbox" checked={settings.highlight_bis} onchange={on_highlight_bis} />
                                {"Highlight BiS items on page"}
                            </label>
                            <label class="setting-row">
                                <input type="checkbox" checked={settings.show_recommendations} onchange={on_show_recommendations} />
                                {"Show recommendations"}
                            </label>
                            <label class="setting-row">
                                <input type="checkbox" checked={settings.notifications_enabled} onchange={on_notifications} />
                                {"Enable notifications"}
                            </label>
                            <label class="setting-row">
                                {"Character name"}
                                <input
                                    type="text"
                                    placeholder="Your character..."
                                    value={settings.character_name.clone()}
                                    oninput={on_character_name}
                                />
                            </label>
                        </div>
                    },
                    ActivePane::Data => html! {
                        <div class="flex-column-gap actions">
                            <Button onclick={on_export} disabled={is_busy} variant={ButtonVariant::Secondary} block={true}>
                                {"📤 Export Data"}
                            </Button>
                            <Button onclick={on_import} disabled={is_busy} variant={ButtonVariant::Secondary} block={true}>
                                {"📥 Import Data"}
                            </Button>
                            <Button onclick={on_reset} disabled={is_busy} variant={ButtonVariant::Danger} block={true}>
                                {"🗑️ Reset All Data"}
                            </Button>
                        </div>
                    },
                }}
            </div>

            <p class="footer-popup">
                {concat!("MinMaxer v", env!("CARGO_PKG_VERSION"))}
            </p>
        </div>
    }
}

// Helper functions

fn alert(message: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.alert_with_message(message);
    }
}

fn confirm(message: &str) -> bool {
    web_sys::window()
        .map(|window| window.confirm_with_message(message).unwrap_or(false))
        .unwrap_or(false)
}

fn details_for(
    softres_data: &UseStateHandle<Option<ReservationSnapshot>>,
    item_name: &str,
    character_name: &str,
) -> SoftresDetails {
    (**softres_data)
        .as_ref()
        .map(|snapshot| item_softres_details(snapshot, item_name, character_name))
        .unwrap_or_default()
}

/// Build an onchange callback that flips one settings field and saves
fn toggle_setting(
    settings: &UseStateHandle<Settings>,
    state: &UseStateHandle<AppState>,
    apply: impl Fn(&mut Settings, bool) + 'static,
) -> Callback<Event> {
    let settings = settings.clone();
    let state = state.clone();
    Callback::from(move |e: Event| {
        if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
            let mut updated = (*settings).clone();
            apply(&mut updated, input.checked());
            settings.set(updated.clone());
            persist_settings(updated, state.clone());
        }
    })
}

fn persist_bis(bis: BisData, state: UseStateHandle<AppState>) {
    spawn_local(async move {
        if let Err(e) = save_bis_data(&bis).await {
            state.set(AppState::Error(e));
        }
    });
}

fn persist_settings(settings: Settings, state: UseStateHandle<AppState>) {
    spawn_local(async move {
        if let Err(e) = save_settings(&settings).await {
            state.set(AppState::Error(e));
        }
    });
}

async fn load_stored() -> (Settings, BisData) {
    (
        fetch_stored(SETTINGS_KEY).await.unwrap_or_default(),
        fetch_stored(BIS_DATA_KEY).await.unwrap_or_default(),
    )
}

async fn fetch_stored<T: serde::de::DeserializeOwned>(key: &str) -> Option<T> {
    match getStorage(key).await {
        Ok(value) => {
            if value.is_null() || value.is_undefined() {
                return None;
            }
            match serde_wasm_bindgen::from_value(value) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    log::warn!("failed to parse stored {key}: {e:?}");
                    None
                }
            }
        }
        Err(e) => {
            log::warn!("failed to read {key} from storage: {e:?}");
            None
        }
    }
}

async fn save_bis_data(bis: &BisData) -> Result<(), String> {
    let js = to_wire(bis).map_err(|e| format!("Failed to serialize BiS data: {e:?}"))?;
    setStorage(BIS_DATA_KEY, js)
        .await
        .map_err(|e| format!("Failed to save BiS data: {e:?}"))
}

async fn save_settings(settings: &Settings) -> Result<(), String> {
    let js = to_wire(settings).map_err(|e| format!("Failed to serialize settings: {e:?}"))?;
    setStorage(SETTINGS_KEY, js)
        .await
        .map_err(|e| format!("Failed to save settings: {e:?}"))
}

async fn runtime_request(request: &Request) -> Result<JsValue, String> {
    let message = to_wire(request).map_err(|e| format!("Failed to serialize request: {e:?}"))?;
    sendRuntimeMessage(message)
        .await
        .map_err(|e| format!("Request failed: {e:?}"))
}

async fn runtime_tab_request(request: &Request) -> Result<JsValue, String> {
    let message = to_wire(request).map_err(|e| format!("Failed to serialize request: {e:?}"))?;
    sendActiveTabMessage(message)
        .await
        .map_err(|e| format!("Request failed: {e:?}"))
}

async fn query_raid_info() -> Option<RaidSnapshot> {
    let first = runtime_tab_request(&Request::GetRaidInfo).await.ok()?;
    if let Some(raid) = parse_snapshot::<RaidSnapshot>(first) {
        return Some(raid);
    }
    // No snapshot yet: trigger an analysis and retry once
    runtime_tab_request(&Request::Reanalyze).await.ok()?;
    let second = runtime_tab_request(&Request::GetRaidInfo).await.ok()?;
    parse_snapshot::<RaidSnapshot>(second)
}

async fn query_softres_data() -> Option<ReservationSnapshot> {
    let value = runtime_tab_request(&Request::GetSoftresData).await.ok()?;
    parse_snapshot::<ReservationSnapshot>(value)
}

async fn query_available_items() -> Vec<ItemEntry> {
    let Ok(value) = runtime_tab_request(&Request::GetAvailableItems).await else {
        return Vec::new();
    };
    serde_wasm_bindgen::from_value::<AvailableItemsReply>(value)
        .map(|reply| reply.available_items)
        .unwrap_or_default()
}

fn parse_snapshot<T: serde::de::DeserializeOwned>(value: JsValue) -> Option<T> {
    serde_wasm_bindgen::from_value::<Option<T>>(value)
        .ok()
        .flatten()
}

async fn export_bundle() -> Result<String, String> {
    let value = runtime_request(&Request::ExportBisData).await?;
    let reply: ExportReply = serde_wasm_bindgen::from_value(value)
        .map_err(|e| format!("Export failed: {e:?}"))?;
    serde_json::to_string_pretty(&reply.data).map_err(|e| format!("Export failed: {e}"))
}
