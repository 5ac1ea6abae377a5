use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use crate::foundation::error::{FestoonError, FestoonResult};

/// Pseudo-URL resolved by [`BuiltinLoader`] without touching the network.
pub const BUILTIN_MODULE_URL: &str = "builtin:particles";

const FETCH_TIMEOUT: Duration = Duration::from_secs(8);

/// A provisioned particle rendering module. The built-in module carries no
/// payload; remotely fetched ones record how much was downloaded so callers
/// can reject empty responses.
#[derive(Clone, Debug)]
pub struct ParticleModule {
    pub name: String,
    pub payload_bytes: usize,
}

impl ParticleModule {
    pub fn builtin() -> Self {
        Self {
            name: BUILTIN_MODULE_URL.to_string(),
            payload_bytes: 0,
        }
    }
}

/// Provisions the external rendering module for the particle-preset backend.
/// Implementations must be best-effort: a failed fetch maps to
/// [`FestoonError::Resource`] and the caller degrades to a no-op backend.
pub trait ModuleLoader {
    fn fetch(&self, url: &str) -> FestoonResult<Arc<ParticleModule>>;
}

/// Resolves the built-in module immediately. Default loader when no module
/// URL is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinLoader;

impl ModuleLoader for BuiltinLoader {
    fn fetch(&self, url: &str) -> FestoonResult<Arc<ParticleModule>> {
        if url == BUILTIN_MODULE_URL {
            return Ok(Arc::new(ParticleModule::builtin()));
        }
        Err(FestoonError::resource(format!(
            "builtin loader cannot resolve {url:?}"
        )))
    }
}

/// Bounded-wait HTTP fetch of a remote rendering module.
#[derive(Clone, Debug)]
pub struct HttpLoader {
    timeout: Duration,
}

impl Default for HttpLoader {
    fn default() -> Self {
        Self {
            timeout: FETCH_TIMEOUT,
        }
    }
}

impl HttpLoader {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl ModuleLoader for HttpLoader {
    fn fetch(&self, url: &str) -> FestoonResult<Arc<ParticleModule>> {
        if url == BUILTIN_MODULE_URL {
            return Ok(Arc::new(ParticleModule::builtin()));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| FestoonError::resource(format!("http client init failed: {e}")))?;
        let response = client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| FestoonError::resource(format!("module fetch failed: {e}")))?;
        let body = response
            .bytes()
            .map_err(|e| FestoonError::resource(format!("module body read failed: {e}")))?;
        if body.is_empty() {
            return Err(FestoonError::resource(format!("empty module at {url:?}")));
        }

        tracing::debug!(url, bytes = body.len(), "fetched particle module");
        Ok(Arc::new(ParticleModule {
            name: url.to_string(),
            payload_bytes: body.len(),
        }))
    }
}

type CachedFetch = Arc<OnceLock<Result<Arc<ParticleModule>, String>>>;

fn cache() -> &'static Mutex<HashMap<String, CachedFetch>> {
    static CACHE: OnceLock<Mutex<HashMap<String, CachedFetch>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Process-wide, double-checked module cache keyed by URL: the same URL is
/// never fetched twice, and concurrent requests share one in-flight load.
/// Failures are cached too so a dead URL does not turn into a retry storm.
pub fn load_cached(loader: &dyn ModuleLoader, url: &str) -> FestoonResult<Arc<ParticleModule>> {
    let slot = {
        let mut map = match cache().lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.entry(url.to_string())
            .or_insert_with(|| Arc::new(OnceLock::new()))
            .clone()
    };

    // The map lock is released before fetching: the per-URL OnceLock is what
    // collapses concurrent fetches of the same module.
    let outcome = slot.get_or_init(|| loader.fetch(url).map_err(|e| e.to_string()));
    outcome.clone().map_err(FestoonError::resource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLoader {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingLoader {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl ModuleLoader for CountingLoader {
        fn fetch(&self, url: &str) -> FestoonResult<Arc<ParticleModule>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(FestoonError::resource("unreachable"))
            } else {
                Ok(Arc::new(ParticleModule {
                    name: url.to_string(),
                    payload_bytes: 42,
                }))
            }
        }
    }

    #[test]
    fn builtin_loader_resolves_the_builtin_url_only() {
        let loader = BuiltinLoader;
        assert!(loader.fetch(BUILTIN_MODULE_URL).is_ok());
        assert!(loader.fetch("https://example.com/mod.js").is_err());
    }

    #[test]
    fn cache_fetches_each_url_once() {
        let loader = CountingLoader::new(false);
        let url = "test://cache-fetches-once";
        let a = load_cached(&loader, url).unwrap();
        let b = load_cached(&loader, url).unwrap();
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.name, b.name);
    }

    #[test]
    fn cache_remembers_failures() {
        let loader = CountingLoader::new(true);
        let url = "test://cache-remembers-failures";
        assert!(load_cached(&loader, url).is_err());
        assert!(load_cached(&loader, url).is_err());
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn distinct_urls_use_distinct_slots() {
        let loader = CountingLoader::new(false);
        load_cached(&loader, "test://distinct-a").unwrap();
        load_cached(&loader, "test://distinct-b").unwrap();
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }
}
