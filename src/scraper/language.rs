//! Filling untranslated title/overview fields from other languages.
//!
//! The chain after the requested locale is: the configured fallback locale
//! (when it is a different language), then English (when neither the
//! requested nor the fallback locale is English). Each step costs one fetch,
//! nothing is fetched twice and populated fields are never overwritten.

use crate::config::{ConfigStore, FALLBACK_LANGUAGE};
use crate::scraper::{
    Result,
    types::{Locale, MediaMetadata, MediaSearchResult},
};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use tracing::{trace, warn};

/// A record with translatable title and overview
pub trait Localizable {
    fn localized_title(&self) -> &str;
    fn localized_overview(&self) -> &str;
    fn set_localized_title(&mut self, title: String);
    fn set_localized_overview(&mut self, overview: String);

    fn has_localized_text(&self) -> bool {
        !self.localized_title().is_empty() && !self.localized_overview().is_empty()
    }

    /// Copy over whatever is still empty here and present in `other`
    fn fill_missing_from(&mut self, other: &Self)
    where
        Self: Sized,
    {
        if self.localized_title().is_empty() && !other.localized_title().is_empty() {
            self.set_localized_title(other.localized_title().to_string());
        }
        if self.localized_overview().is_empty() && !other.localized_overview().is_empty() {
            self.set_localized_overview(other.localized_overview().to_string());
        }
    }
}

impl Localizable for MediaMetadata {
    fn localized_title(&self) -> &str {
        &self.title
    }

    fn localized_overview(&self) -> &str {
        &self.plot
    }

    fn set_localized_title(&mut self, title: String) {
        self.title = title;
    }

    fn set_localized_overview(&mut self, overview: String) {
        self.plot = overview;
    }
}

impl Localizable for MediaSearchResult {
    fn localized_title(&self) -> &str {
        &self.title
    }

    fn localized_overview(&self) -> &str {
        self.overview.as_deref().unwrap_or_default()
    }

    fn set_localized_title(&mut self, title: String) {
        self.title = title;
    }

    fn set_localized_overview(&mut self, overview: String) {
        self.overview = Some(overview);
    }
}

/// Language fallback chain for one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageFallback {
    fallback: Locale,
}

impl LanguageFallback {
    /// An unset fallback means English
    pub fn new(fallback: Option<Locale>) -> Self {
        Self {
            fallback: fallback.unwrap_or_else(Locale::english),
        }
    }

    /// Fallback configured for `provider_id`; unset or unparsable means English
    pub fn from_config(config: &dyn ConfigStore, provider_id: &str) -> Self {
        let fallback = config
            .get_value(provider_id, FALLBACK_LANGUAGE)
            .filter(|raw| !raw.trim().is_empty())
            .and_then(|raw| match raw.parse::<Locale>() {
                Ok(locale) => Some(locale),
                Err(e) => {
                    warn!("ignoring {} fallback language: {}", provider_id, e);
                    None
                }
            });
        Self::new(fallback)
    }

    pub const fn fallback(&self) -> &Locale {
        &self.fallback
    }

    /// Locales to try after `requested`, in order
    pub fn chain(&self, requested: &Locale) -> Vec<Locale> {
        let mut chain = Vec::with_capacity(2);
        if !self.fallback.same_language(requested) {
            chain.push(self.fallback.clone());
        }
        if !self.fallback.is_universal() && !requested.is_universal() {
            chain.push(Locale::english());
        }
        chain
    }

    /// `requested` followed by its fallback chain
    pub fn locales(&self, requested: &Locale) -> Vec<Locale> {
        let mut locales = vec![requested.clone()];
        locales.extend(self.chain(requested));
        locales
    }

    /// Fill the empty localized fields of `record` by re-fetching the same
    /// entity through `fetch` in the fallback locales.
    ///
    /// A failed re-fetch is logged and leaves the fields empty. Returns the
    /// number of fetches made (at most two).
    pub async fn resolve<T, F, Fut>(&self, requested: &Locale, record: &mut T, mut fetch: F) -> usize
    where
        T: Localizable,
        F: FnMut(Locale) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut fetches = 0;

        for locale in self.chain(requested) {
            if record.has_localized_text() {
                break;
            }

            trace!("getting record in fallback language {}", locale);
            fetches += 1;
            match fetch(locale.clone()).await {
                Ok(translated) => record.fill_missing_from(&translated),
                Err(e) => warn!("could not get record in fallback language {}: {}", locale, e),
            }
        }

        fetches
    }

    /// List variant of [`resolve`](Self::resolve): one fetch per fallback
    /// locale returns the whole list in that language, matched back onto
    /// `records` through `key`.
    pub async fn resolve_list<T, K, KF, F, Fut>(
        &self,
        requested: &Locale,
        records: &mut [T],
        key: KF,
        mut fetch: F,
    ) -> usize
    where
        T: Localizable,
        K: Eq + Hash,
        KF: Fn(&T) -> K,
        F: FnMut(Locale) -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        let mut fetches = 0;

        for locale in self.chain(requested) {
            if records.iter().all(|r| r.has_localized_text()) {
                break;
            }

            trace!("getting list in fallback language {}", locale);
            fetches += 1;
            match fetch(locale.clone()).await {
                Ok(translated) => {
                    let translated: HashMap<K, T> =
                        translated.into_iter().map(|t| (key(&t), t)).collect();
                    for record in records.iter_mut() {
                        if let Some(other) = translated.get(&key(record)) {
                            record.fill_missing_from(other);
                        }
                    }
                }
                Err(e) => warn!("could not get list in fallback language {}: {}", locale, e),
            }
        }

        fetches
    }
}

impl Default for LanguageFallback {
    fn default() -> Self {
        Self::new(None)
    }
}
