//! Typed wrappers over the HTTP API and the dashboard event stream.

use rodada_schema::RegistrationV1;
use rodada_schema::records::{
    DashboardSnapshot, ErrorBody, FormSettings, LoginRequest, SessionView, SubmitOutcome,
};
use serde::de::DeserializeOwned;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{EventSource, File, FormData, MessageEvent, Request, RequestCredentials, RequestInit, Response};

const STATUS_UNAUTHORIZED: u16 = 401;

fn window() -> Result<web_sys::Window, String> {
    web_sys::window().ok_or_else(|| "window not available".to_string())
}

async fn send(
    method: &str,
    url: &str,
    body: Option<&JsValue>,
    json: bool,
) -> Result<Response, String> {
    let init = RequestInit::new();
    init.set_method(method);
    init.set_credentials(RequestCredentials::SameOrigin);
    if let Some(body) = body {
        init.set_body(body);
    }

    let request = Request::new_with_str_and_init(url, &init)
        .map_err(|e| format!("request failed: {e:?}"))?;
    if json {
        request
            .headers()
            .set("Content-Type", "application/json")
            .map_err(|e| format!("request failed: {e:?}"))?;
    }

    let value = JsFuture::from(window()?.fetch_with_request(&request))
        .await
        .map_err(|e| format!("fetch rejected: {e:?}"))?;
    value
        .dyn_into::<Response>()
        .map_err(|e| format!("unexpected fetch result: {e:?}"))
}

async fn read_json<R: DeserializeOwned>(response: &Response) -> Result<R, String> {
    let promise = response.json().map_err(|e| format!("{e:?}"))?;
    let value = JsFuture::from(promise)
        .await
        .map_err(|e| format!("invalid json: {e:?}"))?;
    serde_wasm_bindgen::from_value(value).map_err(|e| e.to_string())
}

/// Server errors carry a message meant for the visitor; prefer it.
async fn failure(response: &Response) -> String {
    match read_json::<ErrorBody>(response).await {
        Ok(body) => body.message,
        Err(_) => format!("HTTP {}", response.status()),
    }
}

async fn expect_json<R: DeserializeOwned>(response: Response) -> Result<R, String> {
    if response.ok() {
        read_json(&response).await
    } else {
        Err(failure(&response).await)
    }
}

fn json_body<T: serde::Serialize>(payload: &T) -> Result<JsValue, String> {
    serde_json::to_string(payload)
        .map(|text| JsValue::from_str(&text))
        .map_err(|e| e.to_string())
}

pub async fn fetch_form_settings() -> Result<FormSettings, String> {
    expect_json(send("GET", "/api/form-settings", None, false).await?).await
}

/// `None` when nobody is signed in.
pub async fn fetch_session() -> Result<Option<SessionView>, String> {
    let response = send("GET", "/api/session", None, false).await?;
    if response.status() == STATUS_UNAUTHORIZED {
        return Ok(None);
    }
    expect_json(response).await.map(Some)
}

pub async fn login(email: &str, password: &str) -> Result<SessionView, String> {
    let body = json_body(&LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    })?;
    expect_json(send("POST", "/api/session", Some(&body), true).await?).await
}

pub async fn logout() -> Result<(), String> {
    let response = send("DELETE", "/api/session", None, false).await?;
    if response.ok() {
        Ok(())
    } else {
        Err(failure(&response).await)
    }
}

pub async fn submit_registration(
    registration: &RegistrationV1,
    receipt: Option<File>,
) -> Result<SubmitOutcome, String> {
    let form = FormData::new().map_err(|e| format!("form data unavailable: {e:?}"))?;
    let payload = serde_json::to_string(registration).map_err(|e| e.to_string())?;
    form.append_with_str("registration", &payload)
        .map_err(|e| format!("form data rejected registration: {e:?}"))?;
    if let Some(file) = receipt {
        form.append_with_blob_and_filename("receipt", &file, &file.name())
            .map_err(|e| format!("form data rejected receipt: {e:?}"))?;
    }

    let body: JsValue = form.into();
    expect_json(send("POST", "/api/registrations", Some(&body), false).await?).await
}

/// Opens the dashboard stream. Every message is a full snapshot, the first
/// one being the current state. Close the returned source to stop.
pub fn subscribe_dashboard(
    on_snapshot: impl Fn(DashboardSnapshot) + 'static,
    on_error: impl Fn(String) + 'static,
) -> Result<EventSource, String> {
    let source = EventSource::new("/api/admin/stream")
        .map_err(|e| format!("event stream unavailable: {e:?}"))?;
    let on_error = std::rc::Rc::new(on_error);

    let decode_error = on_error.clone();
    let onmessage = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
        let Some(text) = event.data().as_string() else {
            decode_error("empty dashboard event".to_string());
            return;
        };
        match serde_json::from_str::<DashboardSnapshot>(&text) {
            Ok(snapshot) => on_snapshot(snapshot),
            Err(e) => decode_error(format!("invalid dashboard event: {e}")),
        }
    });
    source.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
    onmessage.forget();

    let onerror = Closure::<dyn FnMut(JsValue)>::new(move |_event: JsValue| {
        on_error("se perdió la conexión en tiempo real, reintentando...".to_string());
    });
    source.set_onerror(Some(onerror.as_ref().unchecked_ref()));
    onerror.forget();

    Ok(source)
}

pub fn navigate(to: &str) {
    if let Ok(window) = window() {
        let _ = window.location().set_href(to);
    }
}

pub fn current_path() -> String {
    window()
        .ok()
        .and_then(|w| w.location().pathname().ok())
        .unwrap_or_default()
}
