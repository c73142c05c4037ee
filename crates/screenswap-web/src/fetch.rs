use screenswap::{FetchError, FragmentRequest, FragmentSource};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

/// Fetches screens with `window.fetch`, relative to the page.
#[derive(Default)]
pub struct BrowserFetch;

fn describe(error: &JsValue) -> String {
    error
        .as_string()
        .or_else(|| {
            error
                .dyn_ref::<js_sys::Error>()
                .map(|error| String::from(error.message()))
        })
        .unwrap_or_else(|| format!("{error:?}"))
}

impl FragmentSource for BrowserFetch {
    async fn fetch(&self, request: &FragmentRequest) -> Result<String, FetchError> {
        let location = request.location().to_owned();
        let transport = |error: JsValue| FetchError::Transport {
            location: location.clone(),
            reason: describe(&error),
        };
        let window = web_sys::window().ok_or_else(|| FetchError::Transport {
            location: location.clone(),
            reason: "no window".to_owned(),
        })?;

        let response = JsFuture::from(window.fetch_with_str(&location))
            .await
            .map_err(transport)?;
        let response: web_sys::Response = response.dyn_into().map_err(transport)?;
        match response.status() {
            404 => {
                return Err(FetchError::Missing {
                    location: location.clone(),
                });
            }
            _ if !response.ok() => {
                return Err(FetchError::Status {
                    location: location.clone(),
                    status: response.status(),
                });
            }
            _ => {}
        }

        let text = JsFuture::from(response.text().map_err(transport)?)
            .await
            .map_err(transport)?;
        text.as_string().ok_or_else(|| FetchError::Transport {
            location: location.clone(),
            reason: "response body is not text".to_owned(),
        })
    }
}
