//! Runtime configuration read from the environment.

use crate::error::{PassportError, Result};
use crate::image::providers::{GeminiModel, GeminiProvider};
use crate::invoker::Invoker;
use crate::options::OptionCatalog;
use crate::session::{Locale, SessionController, DEFAULT_PRODUCT_NAME};
use std::sync::Arc;

/// Environment variables understood by [`Settings::from_env`].
pub mod env {
    /// Gemini API key.
    pub const API_KEY: &str = "GOOGLE_API_KEY";
    /// Legacy API key name, checked when `GOOGLE_API_KEY` is unset.
    pub const API_KEY_FALLBACK: &str = "API_KEY";
    /// `nano-banana` or `nano-banana-pro`.
    pub const MODEL: &str = "PASSPORT_PHOTO_MODEL";
    /// Generative Language API endpoint override.
    pub const BASE_URL: &str = "PASSPORT_PHOTO_BASE_URL";
    /// `en` or `bn`.
    pub const LOCALE: &str = "PASSPORT_PHOTO_LOCALE";
    /// Download file name prefix.
    pub const PRODUCT_NAME: &str = "PASSPORT_PHOTO_PRODUCT_NAME";
    /// When truthy, Black Blazer and Auto-Fix are not offered.
    pub const CORE_OPTIONS: &str = "PASSPORT_PHOTO_CORE_OPTIONS";
}

/// Editor settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Gemini API key. `None` makes every generation fail with an auth error.
    pub api_key: Option<String>,
    /// Gemini model.
    pub model: GeminiModel,
    /// Endpoint override.
    pub base_url: Option<String>,
    /// Language of failure messages.
    pub locale: Locale,
    /// Download file name prefix.
    pub product_name: String,
    /// Offer only the core attire and lighting options.
    pub core_options: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: GeminiModel::default(),
            base_url: None,
            locale: Locale::default(),
            product_name: DEFAULT_PRODUCT_NAME.to_string(),
            core_options: false,
        }
    }
}

impl Settings {
    /// Reads settings from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut settings = Self {
            api_key: get(env::API_KEY).or_else(|| get(env::API_KEY_FALLBACK)),
            base_url: get(env::BASE_URL),
            ..Self::default()
        };

        if let Some(model) = get(env::MODEL) {
            settings.model = GeminiModel::from_name(&model).ok_or_else(|| {
                PassportError::InvalidRequest(format!("{}: unknown model '{model}'", env::MODEL))
            })?;
        }
        if let Some(tag) = get(env::LOCALE) {
            settings.locale = Locale::from_tag(&tag).ok_or_else(|| {
                PassportError::InvalidRequest(format!("{}: unknown locale '{tag}'", env::LOCALE))
            })?;
        }
        if let Some(name) = get(env::PRODUCT_NAME) {
            settings.product_name = name.trim().to_string();
        }
        if let Some(flag) = get(env::CORE_OPTIONS) {
            settings.core_options = parse_flag(&flag).ok_or_else(|| {
                PassportError::InvalidRequest(format!(
                    "{}: expected a boolean, got '{flag}'",
                    env::CORE_OPTIONS
                ))
            })?;
        }
        Ok(settings)
    }

    /// The options sessions built from these settings offer.
    pub fn catalog(&self) -> OptionCatalog {
        if self.core_options {
            OptionCatalog::core()
        } else {
            OptionCatalog::default()
        }
    }

    /// Builds the Gemini provider.
    pub fn provider(&self) -> Result<GeminiProvider> {
        let mut builder = GeminiProvider::builder().model(self.model);
        if let Some(key) = &self.api_key {
            builder = builder.api_key(key);
        }
        if let Some(url) = &self.base_url {
            builder = builder.base_url(url);
        }
        builder.build()
    }

    /// Builds an invoker backed by the Gemini provider.
    pub fn invoker(&self) -> Result<Invoker> {
        Ok(Invoker::new(Arc::new(self.provider()?)))
    }

    /// Builds an idle session.
    pub fn session(&self) -> SessionController {
        SessionController::new(self.catalog())
            .with_locale(self.locale)
            .with_product_name(&self.product_name)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
