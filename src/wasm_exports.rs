use crate::provider::{
    AuthorizationCodeOptions, AuthorizationCodeProvider, ImplicitGrantOptions,
    ImplicitGrantProvider, Provider,
};
use crate::service::{AuthServiceOptions, AuthenticationService, Invalidation};
use serde::Deserialize;
use std::fmt::Debug;
use wasm_bindgen::prelude::*;

/// Routes `tracing` output to the browser console and performance timeline.
#[wasm_bindgen]
pub fn init_tracing() {
    crate::log::set_global_logger();
}

#[derive(Debug, Deserialize)]
#[serde(tag = "grant", rename_all = "camelCase")]
enum ProviderConfig {
    Implicit(ImplicitGrantOptions),
    AuthorizationCode(AuthorizationCodeOptions),
}

/// JSON configuration accepted by every export.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Config {
    provider: ProviderConfig,
    #[serde(default)]
    service: AuthServiceOptions,
}

impl Config {
    fn parse(config: &str) -> Result<Self, JsValue> {
        serde_json::from_str(config).map_err(jsfy)
    }

    fn provider(&self) -> Result<Box<dyn Provider>, JsValue> {
        let provider: Box<dyn Provider> = match &self.provider {
            ProviderConfig::Implicit(options) => {
                Box::new(ImplicitGrantProvider::new(options.clone()).map_err(jsfy)?)
            }
            ProviderConfig::AuthorizationCode(options) => {
                Box::new(AuthorizationCodeProvider::new(options.clone()).map_err(jsfy)?)
            }
        };
        Ok(provider)
    }

    fn service(&self) -> Result<AuthenticationService, JsValue> {
        AuthenticationService::browser(self.service.clone()).map_err(jsfy)
    }
}

/// Resolves with `{"session": ..., "renewed": bool}` as JSON.
#[wasm_bindgen]
pub async fn login_popup(config: String, allow_cached: bool) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let config = Config::parse(&config)?;
    let provider = config.provider()?;
    let service = config.service()?;
    let acquired = service
        .acquire_session(provider.as_ref(), allow_cached)
        .await
        .map_err(jsfy)?;
    serde_json::to_string(&serde_json::json!({
        "session": acquired.session,
        "renewed": acquired.renewed,
    }))
    .map_err(jsfy)
}

#[wasm_bindgen]
pub fn access_token(config: String) -> Result<Option<String>, JsValue> {
    let config = Config::parse(&config)?;
    let provider = config.provider()?;
    Ok(config.service()?.access_token(provider.as_ref()))
}

/// Resolves with `false` when a remote sign-out failed and the session was kept.
#[wasm_bindgen]
pub async fn logout(config: String) -> Result<bool, JsValue> {
    let config = Config::parse(&config)?;
    let provider = config.provider()?;
    let service = config.service()?;
    match service.invalidate_session(provider.as_ref()).await {
        Invalidation::Retained(e) => {
            tracing::warn!("Logout kept the cached session: {e:#}");
            Ok(false)
        }
        Invalidation::NothingCached | Invalidation::Removed => Ok(true),
    }
}

fn jsfy<E>(e: E) -> JsValue
where
    E: Debug,
{
    let es = format!("{e:#?}");
    JsValue::from_str(es.as_str())
}
