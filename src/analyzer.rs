/// Content script for softres.it pages: scrapes the raid tables, keeps the
/// snapshots current as the page mutates, and answers popup queries
use crate::extract::{
    self, CellScrape, RowScrape, TableScrape,
};
use crate::messages::{to_wire, Ack, AvailableItemsReply, ErrorReply, Request};
use crate::raids::{self, RaidCode};
use crate::snapshot::{RaidSnapshot, ReservationSnapshot};
use crate::storage::{BisData, Settings, BIS_DATA_KEY, SETTINGS_KEY};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, HtmlElement, MutationObserver, MutationObserverInit};

// Import JS bridge functions
#[wasm_bindgen(module = "/content.js")]
extern "C" {
    /// Hook a callback into chrome.runtime.onMessage; the callback's return
    /// value is passed to sendResponse
    fn registerMessageHandler(handler: &js_sys::Function);

    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> Result<JsValue, JsValue>;
}

/// Selectors tried in order for the raid heading
const RAID_SELECTORS: [&str; 5] = [
    "h1",
    ".raid-title",
    ".page-title",
    "[class*=\"title\"]",
    "[class*=\"raid\"]",
];

/// Recognized item-database links
const ITEM_LINK_SELECTOR: &str =
    "a[href*=\"wowhead\"], a[href*=\"classicdb\"], a[href*=\"wowdb\"]";

const HIGHLIGHT_CLASS: &str = "minmaxer-highlight";

/// NodeFilter.SHOW_TEXT
const SHOW_TEXT: u32 = 0x4;

/// Debounce window after a DOM mutation before re-analyzing
const REANALYZE_DELAY_MS: i32 = 500;

/// Per-page analyzer state; one instance per content-script context
pub struct SoftresAnalyzer {
    raid_data: Option<RaidSnapshot>,
    softres_data: Option<ReservationSnapshot>,
    highlighted: Vec<Element>,
}

/// Wire up the analyzer: initial analysis, mutation observer, message handler
pub fn start() -> Result<(), JsValue> {
    let analyzer = Rc::new(RefCell::new(SoftresAnalyzer {
        raid_data: None,
        softres_data: None,
        highlighted: Vec::new(),
    }));

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    // Queries must keep working even if the rest of the wiring fails
    register_message_handler(&analyzer);

    if document.ready_state() == "loading" {
        let analyzer = analyzer.clone();
        let on_ready = Closure::<dyn FnMut()>::new(move || analyze_page(&analyzer));
        document
            .add_event_listener_with_callback("DOMContentLoaded", on_ready.as_ref().unchecked_ref())?;
        on_ready.forget();
    } else {
        analyze_page(&analyzer);
    }

    if let Err(e) = setup_page_observer(&analyzer) {
        // Without the observer the page is analyzed once and on demand only
        log::warn!("page observer not installed: {e:?}");
    }
    inject_highlight_style(&document)?;

    Ok(())
}

/// Re-analyze 500 ms after a mutation batch; a new batch restarts the timer
fn setup_page_observer(analyzer: &Rc<RefCell<SoftresAnalyzer>>) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let body = window
        .document()
        .and_then(|d| d.body())
        .ok_or_else(|| JsValue::from_str("no body"))?;

    let pending = Rc::new(RefCell::new(None::<i32>));

    let timer_cb = {
        let analyzer = analyzer.clone();
        let pending = pending.clone();
        Closure::<dyn FnMut()>::new(move || {
            pending.borrow_mut().take();
            analyze_page(&analyzer);
        })
    };

    let observer_cb = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
        move |_mutations: js_sys::Array, _observer: MutationObserver| {
            let Some(window) = web_sys::window() else {
                return;
            };
            if let Some(handle) = pending.borrow_mut().take() {
                window.clear_timeout_with_handle(handle);
            }
            match window.set_timeout_with_callback_and_timeout_and_arguments_0(
                timer_cb.as_ref().unchecked_ref(),
                REANALYZE_DELAY_MS,
            ) {
                Ok(handle) => *pending.borrow_mut() = Some(handle),
                Err(e) => log::warn!("failed to schedule re-analysis: {e:?}"),
            }
        },
    );

    let observer = MutationObserver::new(observer_cb.as_ref().unchecked_ref())?;
    let options = MutationObserverInit::new();
    options.set_child_list(true);
    options.set_subtree(true);
    observer.observe_with_options(&body, &options)?;
    observer_cb.forget();

    Ok(())
}

fn register_message_handler(analyzer: &Rc<RefCell<SoftresAnalyzer>>) {
    let analyzer = analyzer.clone();
    let handler = Closure::<dyn FnMut(JsValue) -> JsValue>::new(move |request: JsValue| {
        handle_message(&analyzer, request)
    });
    registerMessageHandler(handler.as_ref().unchecked_ref());
    handler.forget();
}

fn handle_message(analyzer: &Rc<RefCell<SoftresAnalyzer>>, request: JsValue) -> JsValue {
    let request: Request = match serde_wasm_bindgen::from_value(request) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("unparseable message: {e:?}");
            return reply(&ErrorReply::new("Unknown action"));
        }
    };

    match request {
        Request::Reanalyze => {
            analyze_page(analyzer);
            reply(&Ack::ok())
        }
        Request::GetRaidInfo => reply(&analyzer.borrow().raid_data),
        Request::GetSoftresData => reply(&analyzer.borrow().softres_data),
        Request::GetAvailableItems => {
            let available_items = analyzer
                .borrow()
                .softres_data
                .as_ref()
                .map(|data| data.items.clone())
                .unwrap_or_default();
            reply(&AvailableItemsReply { available_items })
        }
        Request::HighlightBis => {
            spawn_local(apply_highlights(analyzer.clone()));
            reply(&Ack::ok())
        }
        Request::ShowNotification { message, kind } => {
            spawn_local(show_notification(message, kind));
            reply(&Ack::ok())
        }
        _ => reply(&ErrorReply::new("Unknown action")),
    }
}

fn reply<T: Serialize>(value: &T) -> JsValue {
    to_wire(value).unwrap_or(JsValue::NULL)
}

/// One full analysis pass. Both snapshots are built before either is
/// committed, so a failing pass leaves the previous state intact.
fn analyze_page(analyzer: &Rc<RefCell<SoftresAnalyzer>>) {
    match build_snapshots() {
        Ok((raid, softres)) => {
            log::info!(
                "page analyzed: raid {:?}, {} players, {} items",
                raid.raid_name,
                raid.total_players,
                softres.items.len()
            );
            {
                let mut state = analyzer.borrow_mut();
                state.raid_data = Some(raid);
                state.softres_data = Some(softres);
            }
            spawn_local(apply_highlights(analyzer.clone()));
        }
        Err(e) => log::error!("error analyzing page: {e:?}"),
    }
}

fn build_snapshots() -> Result<(RaidSnapshot, ReservationSnapshot), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let raid_name = extract_raid_name(&document)?;

    let reserved = scrape_table(&document, "#table-reserved")?;
    let generic_rows = document.query_selector_all("table tbody tr")?.length();
    let total_players = extract::count_players(reserved.as_ref(), generic_rows);

    let items = match scrape_table(&document, "#table-items")? {
        Some(table) => extract::build_item_reserve_list(&table),
        None => {
            log::debug!("items table (#table-items) not found");
            Vec::new()
        }
    };
    let player_reserves = reserved
        .as_ref()
        .map(extract::build_player_reserves_map)
        .unwrap_or_default();

    let now = js_sys::Date::now();
    let raid = RaidSnapshot {
        raid_name,
        total_players,
        url: window.location().href()?,
        timestamp: now,
    };
    let softres = ReservationSnapshot::new(items, player_reserves, now);

    Ok((raid, softres))
}

/// Heading selectors first, full-page text scan second, "Unknown Raid" last
fn extract_raid_name(document: &Document) -> Result<String, JsValue> {
    for selector in RAID_SELECTORS {
        if let Some(element) = document.query_selector(selector)? {
            if let Some(text) = element.text_content() {
                let text = text.trim();
                if !text.is_empty() && raids::is_raid_name(text) {
                    return Ok(text.to_string());
                }
            }
        }
    }

    if let Some(body_text) = document.body().and_then(|body| body.text_content()) {
        if let Some(name) = raids::find_raid_in_text(&body_text) {
            return Ok(name.to_string());
        }
    }

    Ok("Unknown Raid".to_string())
}

fn scrape_table(document: &Document, selector: &str) -> Result<Option<TableScrape>, JsValue> {
    let Some(table) = document.query_selector(selector)? else {
        return Ok(None);
    };

    let mut rows = Vec::new();
    let row_nodes = table.query_selector_all("tr")?;
    for i in 0..row_nodes.length() {
        let Some(row) = row_nodes.get(i).and_then(|n| n.dyn_into::<Element>().ok()) else {
            continue;
        };
        let mut cells = Vec::new();
        let cell_nodes = row.query_selector_all("td, th")?;
        for j in 0..cell_nodes.length() {
            let Some(cell) = cell_nodes.get(j).and_then(|n| n.dyn_into::<Element>().ok()) else {
                continue;
            };
            cells.push(scrape_cell(&cell)?);
        }
        rows.push(RowScrape { cells });
    }

    Ok(Some(TableScrape { rows }))
}

fn scrape_cell(cell: &Element) -> Result<CellScrape, JsValue> {
    let text = cell.text_content().unwrap_or_default().trim().to_string();

    let link_text = cell
        .query_selector(ITEM_LINK_SELECTOR)?
        .and_then(|link| link.text_content())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let mut itemlink_texts = Vec::new();
    let links = cell.query_selector_all(ITEM_LINK_SELECTOR)?;
    for i in 0..links.length() {
        let Some(link) = links.get(i).and_then(|n| n.dyn_into::<Element>().ok()) else {
            continue;
        };
        if let Some(span) = link.query_selector(".itemlink-text")? {
            if let Some(t) = span.text_content() {
                let t = t.trim().to_string();
                if !t.is_empty() {
                    itemlink_texts.push(t);
                }
            }
        }
    }

    let titled_span = cell
        .query_selector("span[title]")?
        .and_then(|span| span.text_content())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let marker_count = cell.query_selector_all(".item-row")?.length();

    Ok(CellScrape {
        text,
        link_text,
        itemlink_texts,
        titled_span,
        marker_count,
    })
}

/// Mark every element whose text mentions a BiS item for the current raid.
/// Previous highlights are cleared first, so repeated passes are idempotent.
async fn apply_highlights(analyzer: Rc<RefCell<SoftresAnalyzer>>) {
    let settings: Settings = match fetch_stored(SETTINGS_KEY).await {
        Some(settings) => settings,
        None => return,
    };
    if !settings.highlight_bis {
        return;
    }
    let bis: BisData = match fetch_stored(BIS_DATA_KEY).await {
        Some(bis) => bis,
        None => return,
    };

    clear_highlights(&analyzer);

    let raid = analyzer
        .borrow()
        .raid_data
        .as_ref()
        .map(|data| raids::detect_raid_type(&data.raid_name))
        .unwrap_or(RaidCode::UNKNOWN);
    let names = bis.item_names_for(raid);
    if names.is_empty() {
        return;
    }

    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    for name in &names {
        if let Err(e) = highlight_item(&analyzer, &document, name) {
            log::error!("error highlighting {name:?}: {e:?}");
        }
    }
}

fn highlight_item(
    analyzer: &Rc<RefCell<SoftresAnalyzer>>,
    document: &Document,
    item_name: &str,
) -> Result<(), JsValue> {
    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("no body"))?;
    let walker = document.create_tree_walker_with_what_to_show(&body, SHOW_TEXT)?;

    let needle = item_name.to_lowercase();
    let mut parents = Vec::new();
    while let Some(node) = walker.next_node()? {
        let Some(text) = node.text_content() else {
            continue;
        };
        if text.to_lowercase().contains(&needle) {
            if let Some(parent) = node.parent_element() {
                parents.push(parent);
            }
        }
    }

    for parent in parents {
        if parent.class_list().contains(HIGHLIGHT_CLASS) {
            continue;
        }
        parent.class_list().add_1(HIGHLIGHT_CLASS)?;
        if let Some(element) = parent.dyn_ref::<HtmlElement>() {
            let style = element.style();
            style.set_property("background-color", "#ffcd3c33")?;
            style.set_property("border", "2px solid #ffcd3c")?;
            style.set_property("border-radius", "4px")?;
            style.set_property("padding", "2px")?;
            element.set_title(&format!("MinMaxer: {item_name} (BiS Item)"));
        }
        analyzer.borrow_mut().highlighted.push(parent);
    }

    Ok(())
}

fn clear_highlights(analyzer: &Rc<RefCell<SoftresAnalyzer>>) {
    let marked = std::mem::take(&mut analyzer.borrow_mut().highlighted);
    for element in marked {
        let _ = element.class_list().remove_1(HIGHLIGHT_CLASS);
        if let Some(element) = element.dyn_ref::<HtmlElement>() {
            let style = element.style();
            for property in ["background-color", "border", "border-radius", "padding"] {
                let _ = style.remove_property(property);
            }
            element.set_title("");
        }
    }
}

/// Hover styling for highlighted elements
fn inject_highlight_style(document: &Document) -> Result<(), JsValue> {
    let style = document.create_element("style")?;
    style.set_text_content(Some(
        ".minmaxer-highlight { transition: all 0.3s ease !important; }\n\
         .minmaxer-highlight:hover { background-color: #ffcd3c66 !important; }",
    ));
    if let Some(head) = document.head() {
        head.append_child(&style)?;
    }
    Ok(())
}

/// In-page toast for notifications relayed by the background worker
async fn show_notification(message: String, kind: String) {
    let settings: Settings = fetch_stored(SETTINGS_KEY).await.unwrap_or_default();
    if !settings.notifications_enabled {
        return;
    }

    if let Err(e) = render_toast(&message, &kind) {
        log::error!("error showing notification: {e:?}");
    }
}

fn render_toast(message: &str, kind: &str) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("no body"))?;

    let toast = document.create_element("div")?;
    toast.set_text_content(Some(message));
    if let Some(element) = toast.dyn_ref::<HtmlElement>() {
        let style = element.style();
        style.set_property("position", "fixed")?;
        style.set_property("top", "16px")?;
        style.set_property("right", "16px")?;
        style.set_property("z-index", "99999")?;
        style.set_property("padding", "10px 16px")?;
        style.set_property("border-radius", "4px")?;
        style.set_property("color", "#1a1a1a")?;
        let background = if kind == "error" { "#ff6b6b" } else { "#ffcd3c" };
        style.set_property("background-color", background)?;
    }
    body.append_child(&toast)?;

    let remove = Closure::once_into_js(move || {
        toast.remove();
    });
    window.set_timeout_with_callback_and_timeout_and_arguments_0(remove.unchecked_ref(), 4000)?;

    Ok(())
}

async fn fetch_stored<T: DeserializeOwned>(key: &str) -> Option<T> {
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
