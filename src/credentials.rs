use std::{
    fmt,
    sync::{PoisonError, RwLock},
};

/// Storage key the browser client keeps its token under.
pub const AUTH_TOKEN_KEY: &str = "authToken";

/// Holder of the single bearer token attached to outgoing requests.
///
/// Implementations decide where the token lives (memory, browser storage,
/// a keychain). Reads happen once per request construction.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, token: &str);
    fn clear(&self);
}

/// In-process [`CredentialStore`].
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCredentialStore")
            .field("token", &token_state(self.get()))
            .finish()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, token: &str) {
        let mut slot = self.token.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(token.to_owned());
    }

    fn clear(&self) {
        let mut slot = self.token.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }
}

/// String key/value storage with the shape of the Web Storage API.
pub trait KeyValueStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str);
    fn remove_item(&self, key: &str);
}

/// [`CredentialStore`] that keeps the token in a [`KeyValueStorage`], so it
/// outlives the client (and, for browser storage, a page reload).
///
/// Every call goes straight to the storage; nothing is cached.
pub struct StorageCredentialStore<S> {
    storage: S,
    key: String,
}

impl<S: KeyValueStorage> StorageCredentialStore<S> {
    /// Uses [`AUTH_TOKEN_KEY`].
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, AUTH_TOKEN_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<S: KeyValueStorage> fmt::Debug for StorageCredentialStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCredentialStore")
            .field("key", &self.key)
            .field("token", &token_state(self.get()))
            .finish()
    }
}

impl<S: KeyValueStorage> CredentialStore for StorageCredentialStore<S> {
    fn get(&self) -> Option<String> {
        self.storage
            .get_item(&self.key)
            .filter(|token| !token.is_empty())
    }

    fn set(&self, token: &str) {
        self.storage.set_item(&self.key, token);
    }

    fn clear(&self) {
        self.storage.remove_item(&self.key);
    }
}

/// The browser's `localStorage`, reached through the JS global object so it
/// works wherever the global exposes it.
///
/// Storage that is missing or blocked (private mode, sandboxed iframes)
/// reads as empty and ignores writes.
#[cfg(target_arch = "wasm32")]
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserLocalStorage;

#[cfg(target_arch = "wasm32")]
impl BrowserLocalStorage {
    fn call(method: &str, args: &[&str]) -> Option<wasm_bindgen::JsValue> {
        use wasm_bindgen::{JsCast, JsValue};

        let storage =
            js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str("localStorage")).ok()?;
        if storage.is_undefined() || storage.is_null() {
            return None;
        }
        let function = js_sys::Reflect::get(&storage, &JsValue::from_str(method))
            .ok()?
            .dyn_into::<js_sys::Function>()
            .ok()?;
        let args: js_sys::Array = args.iter().map(|arg| JsValue::from_str(arg)).collect();

        match function.apply(&storage, &args) {
            Ok(value) => Some(value),
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("localStorage.{method} failed: {:?}", _err);
                None
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStorage for BrowserLocalStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        Self::call("getItem", &[key]).and_then(|value| value.as_string())
    }

    fn set_item(&self, key: &str, value: &str) {
        Self::call("setItem", &[key, value]);
    }

    fn remove_item(&self, key: &str) {
        Self::call("removeItem", &[key]);
    }
}

/// Token store backed by `localStorage` under [`AUTH_TOKEN_KEY`]. Default
/// for [`ApiClient`](crate::ApiClient) in the browser.
#[cfg(target_arch = "wasm32")]
pub type LocalStorageCredentialStore = StorageCredentialStore<BrowserLocalStorage>;

fn token_state(token: Option<String>) -> &'static str {
    if token.is_some() {
        "<redacted>"
    } else {
        "<empty>"
    }
}
