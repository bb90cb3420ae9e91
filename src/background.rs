/// Background service worker: install defaults, tab badge handling, and
/// relay of popup requests to the content script or the store
use crate::messages::{to_wire, Ack, BadgeInfoReply, ErrorReply, ExportReply, Request};
use crate::storage::{
    BisData, ImportBundle, ExportBundle, Settings, BIS_DATA_KEY, SETTINGS_KEY,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

// Import JS bridge functions
#[wasm_bindgen(module = "/background.js")]
extern "C" {
    /// chrome.runtime.onInstalled; callback receives the install reason
    fn registerInstallHandler(handler: &js_sys::Function);

    /// chrome.tabs.onUpdated; callback receives (tabId, status, url)
    fn registerTabUpdateHandler(handler: &js_sys::Function);

    /// chrome.runtime.onMessage; callback returns a Promise of the response
    fn registerMessageHandler(handler: &js_sys::Function);

    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryActiveTab() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn sendTabMessage(tab_id: i32, message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setBadge(tab_id: i32, text: &str, color: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn getBadgeText(tab_id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn openTab(url: &str) -> Result<(), JsValue>;

    /// setTimeout wrapped in a promise
    #[wasm_bindgen(catch)]
    async fn delay(ms: i32) -> Result<(), JsValue>;
}

/// Badge shown on softres.it tabs
const BADGE_TEXT: &str = "⚔️";
const BADGE_COLOR: &str = "#ffcd3c";

/// Settle time before asking a freshly loaded page to analyze itself
const ANALYZE_DELAY_MS: i32 = 1000;

#[derive(Debug, Clone, Deserialize)]
struct ActiveTab {
    id: i32,
    #[serde(default)]
    url: Option<String>,
}

/// Register all background handlers
pub fn start() {
    let on_install = Closure::<dyn FnMut(String)>::new(|reason: String| {
        log::info!("installed: {reason}");
        if reason == "install" {
            spawn_local(async {
                if let Err(e) = handle_install().await {
                    log::error!("error setting install defaults: {e:?}");
                }
            });
        }
    });
    registerInstallHandler(on_install.as_ref().unchecked_ref());
    on_install.forget();

    let on_tab_update =
        Closure::<dyn FnMut(i32, JsValue, JsValue)>::new(|tab_id: i32, status: JsValue, url: JsValue| {
            let status = status.as_string().unwrap_or_default();
            let url = url.as_string().unwrap_or_default();
            spawn_local(async move {
                if let Err(e) = handle_tab_update(tab_id, &status, &url).await {
                    log::error!("error handling tab update: {e:?}");
                }
            });
        });
    registerTabUpdateHandler(on_tab_update.as_ref().unchecked_ref());
    on_tab_update.forget();

    let on_message = Closure::<dyn FnMut(JsValue) -> js_sys::Promise>::new(|request: JsValue| {
        future_to_promise(async move { Ok(handle_message(request).await) })
    });
    registerMessageHandler(on_message.as_ref().unchecked_ref());
    on_message.forget();
}

fn is_softres_url(raw: &str) -> bool {
    Url::parse(raw)
        .ok()
        .and_then(|url| {
            url.host_str()
                .map(|host| host == "softres.it" || host.ends_with(".softres.it"))
        })
        .unwrap_or(false)
}

/// First install: seed the store with defaults and open the welcome view
async fn handle_install() -> Result<(), JsValue> {
    put_stored(SETTINGS_KEY, &Settings::default()).await?;
    put_stored(BIS_DATA_KEY, &BisData::new()).await?;
    openTab("popup.html?welcome=true").await
}

async fn handle_tab_update(tab_id: i32, status: &str, url: &str) -> Result<(), JsValue> {
    if status == "complete" && is_softres_url(url) {
        let settings: Settings = fetch_stored(SETTINGS_KEY).await.unwrap_or_default();
        setBadge(tab_id, BADGE_TEXT, BADGE_COLOR).await?;

        if settings.auto_analyze {
            // Let the page settle before asking for an analysis
            delay(ANALYZE_DELAY_MS).await?;
            let message = to_wire(&Request::Reanalyze)?;
            if let Err(e) = sendTabMessage(tab_id, message).await {
                // No content script on the tab yet; nothing to retry
                log::debug!("reanalyze request not delivered: {e:?}");
            }
        }
    } else if status == "complete" {
        setBadge(tab_id, "", "").await?;
    }
    Ok(())
}

async fn handle_message(request: JsValue) -> JsValue {
    let request: Request = match serde_wasm_bindgen::from_value(request) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("unparseable message: {e:?}");
            return reply(&ErrorReply::new("Unknown action"));
        }
    };

    match request {
        Request::AnalyzeCurrentTab => analyze_current_tab().await,
        Request::GetBadgeInfo { tab_id } => badge_info(tab_id).await,
        Request::SendNotification { message, kind } => forward_notification(message, kind).await,
        Request::ExportBisData => export_bis_data().await,
        Request::ImportBisData { data } => import_bis_data(data).await,
        _ => reply(&ErrorReply::new("Unknown action")),
    }
}

async fn analyze_current_tab() -> JsValue {
    let tab = match active_tab().await {
        Ok(tab) => tab,
        Err(e) => return reply(&ErrorReply::new(e)),
    };
    if !tab.url.as_deref().is_some_and(is_softres_url) {
        return reply(&ErrorReply::new("Not a softres.it page"));
    }

    let message = match to_wire(&Request::Reanalyze) {
        Ok(message) => message,
        Err(e) => return reply(&ErrorReply::new(format!("{e:?}"))),
    };
    match sendTabMessage(tab.id, message).await {
        // Forward the analyzer's own response to the caller
        Ok(response) => response,
        Err(e) => reply(&ErrorReply::new(format!("{e:?}"))),
    }
}

async fn badge_info(tab_id: Option<i32>) -> JsValue {
    let tab_id = match tab_id {
        Some(id) => id,
        None => match active_tab().await {
            Ok(tab) => tab.id,
            Err(e) => return reply(&ErrorReply::new(e)),
        },
    };
    match getBadgeText(tab_id).await {
        Ok(text) => reply(&BadgeInfoReply {
            badge_text: text.as_string().unwrap_or_default(),
        }),
        Err(e) => reply(&ErrorReply::new(format!("{e:?}"))),
    }
}

/// Forward a toast to the active tab's content script, when it is a
/// softres.it page; silently does nothing otherwise
async fn forward_notification(message: String, kind: String) -> JsValue {
    let tab = match active_tab().await {
        Ok(tab) => tab,
        Err(e) => return reply(&ErrorReply::new(e)),
    };
    if tab.url.as_deref().is_some_and(is_softres_url) {
        let forwarded = Request::ShowNotification { message, kind };
        match to_wire(&forwarded) {
            Ok(js) => {
                if let Err(e) = sendTabMessage(tab.id, js).await {
                    log::error!("error sending notification: {e:?}");
                }
            }
            Err(e) => log::error!("error serializing notification: {e:?}"),
        }
    }
    reply(&Ack::ok())
}

async fn export_bis_data() -> JsValue {
    let bundle = ExportBundle {
        bis_data: fetch_stored(BIS_DATA_KEY).await.unwrap_or_default(),
        settings: fetch_stored(SETTINGS_KEY).await.unwrap_or_default(),
        export_date: String::from(js_sys::Date::new_0().to_iso_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    reply(&ExportReply {
        success: true,
        data: bundle,
    })
}

async fn import_bis_data(bundle: ImportBundle) -> JsValue {
    let Some(bis_data) = bundle.bis_data else {
        return reply(&ErrorReply::new("Invalid import data format"));
    };

    if let Err(e) = put_stored(BIS_DATA_KEY, &bis_data).await {
        return reply(&ErrorReply::new(format!("{e:?}")));
    }
    if let Some(patch) = bundle.settings {
        let mut settings: Settings = fetch_stored(SETTINGS_KEY).await.unwrap_or_default();
        settings.apply_patch(&patch);
        if let Err(e) = put_stored(SETTINGS_KEY, &settings).await {
            return reply(&ErrorReply::new(format!("{e:?}")));
        }
    }
    reply(&Ack::ok())
}

async fn active_tab() -> Result<ActiveTab, String> {
    let tab = queryActiveTab()
        .await
        .map_err(|e| format!("failed to query active tab: {e:?}"))?;
    serde_wasm_bindgen::from_value(tab).map_err(|e| format!("failed to parse active tab: {e:?}"))
}

fn reply<T: Serialize>(value: &T) -> JsValue {
    to_wire(value).unwrap_or(JsValue::NULL)
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

async fn put_stored<T: Serialize>(key: &str, value: &T) -> Result<(), JsValue> {
    let js = to_wire(value)?;
    setStorage(key, js).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_softres_url() {
        assert!(is_softres_url("https://softres.it/raid/abc123"));
        assert!(is_softres_url("https://www.softres.it/"));
        assert!(!is_softres_url("https://example.com/softres.it"));
        assert!(!is_softres_url("https://notsoftres.it/"));
        assert!(!is_softres_url("not a url"));
    }
}
