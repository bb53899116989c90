// FFI bridge for the search engine
// C ABI for the host UI: NUL-terminated UTF-8 in, JSON strings out (free with kb_string_free)

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::sync::Arc;

use serde::Serialize;
use tokio::runtime::{Handle, Runtime};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use super::corpus::CorpusSource;
use super::engine::SearchEngine;
use super::index::SearchOptions;
use super::suggestions::{DEFAULT_MAX_CORRECTIONS, DEFAULT_MAX_SUGGESTIONS};
use crate::config::EngineConfig;
use crate::error::{KbError, Result};
use crate::store::{FileStore, MemoryStore, Store};

/// Engine plus the runtime that drives its background work
pub struct KbEngine {
    engine: SearchEngine,
    runtime: Runtime,
}

/// Callback receiving a debounced result set as JSON; the string must be freed
pub type KbResultsCallback = extern "C" fn(results_json: *mut c_char, token: usize);

/// Borrow a C string as `&str`; null and invalid UTF-8 yield `None`
unsafe fn read_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    CStr::from_ptr(s).to_str().ok()
}

unsafe fn engine_ref<'a>(engine_ptr: *mut KbEngine) -> Option<&'a KbEngine> {
    engine_ptr.as_ref()
}

/// Serialize `value` into a caller-owned C string (null on failure)
fn to_c_json<T: Serialize + ?Sized>(value: &T) -> *mut c_char {
    let encoded = serde_json::to_string(value)
        .map_err(KbError::from)
        .and_then(|json| CString::new(json).map_err(|e| KbError::invalid_input(e.to_string())));

    match encoded {
        Ok(json) => json.into_raw(),
        Err(e) => {
            warn!("Failed to encode bridge response: {}", e);
            ptr::null_mut()
        }
    }
}

/// Parse optional `SearchOptions` JSON; malformed options reject the call
/// rather than widening it to the defaults
fn parse_options(options_json: Option<&str>) -> Option<SearchOptions> {
    match options_json.filter(|json| !json.trim().is_empty()) {
        Some(json) => match serde_json::from_str(json) {
            Ok(options) => Some(options),
            Err(e) => {
                warn!("Rejecting malformed search options: {}", e);
                None
            }
        },
        None => Some(SearchOptions::default()),
    }
}

fn build_engine(corpus: Option<&str>, store_dir: Option<&str>, locale: Option<&str>) -> Result<KbEngine> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;

    let store: Arc<dyn Store> = match store_dir {
        Some(dir) if !dir.is_empty() => Arc::new(FileStore::new(dir)),
        _ => Arc::new(MemoryStore::new()),
    };

    let mut config = EngineConfig::from_env();
    if let Some(locale) = locale.filter(|l| !l.is_empty()) {
        config.locale = Some(locale.to_string());
    }

    let engine = SearchEngine::new(store, config);
    if let Some(location) = corpus {
        runtime.block_on(engine.load_corpus(&CorpusSource::from_location(location)));
    }

    Ok(KbEngine { engine, runtime })
}

/// Install a stderr `tracing` subscriber (`RUST_LOG`, default `info`)
/// Returns 1 when installed, 0 when one was already present
#[no_mangle]
pub extern "C" fn kb_init_logging() -> i32 {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        Ok(()) => 1,
        Err(_) => 0,
    }
}

/// Create an engine
///
/// `corpus` is a URL, a file path or inline JSON (null for none); the load
/// completes before returning and a failed load leaves an empty corpus.
/// `store_dir` selects a file-backed store (null for in-memory). `locale`
/// picks the initial language when none is stored (may be null).
/// Returns null only if the runtime cannot start.
#[no_mangle]
pub extern "C" fn kb_engine_create(
    corpus: *const c_char,
    store_dir: *const c_char,
    locale: *const c_char,
) -> *mut KbEngine {
    let (corpus, store_dir, locale) = unsafe { (read_str(corpus), read_str(store_dir), read_str(locale)) };

    match build_engine(corpus, store_dir, locale) {
        Ok(engine) => Box::into_raw(Box::new(engine)),
        Err(e) => {
            warn!("Failed to create search engine: {}", e);
            ptr::null_mut()
        }
    }
}

/// Free engine memory
/// Safe to call from inside a debounced-search callback
#[no_mangle]
pub extern "C" fn kb_engine_free(engine_ptr: *mut KbEngine) {
    if engine_ptr.is_null() {
        return;
    }

    let KbEngine { engine, runtime } = *unsafe { Box::from_raw(engine_ptr) };
    drop(engine);

    // A runtime cannot block on its own shutdown from inside a task
    if Handle::try_current().is_ok() {
        runtime.shutdown_background();
    } else {
        drop(runtime);
    }
}

/// Search; `options_json` is an optional `SearchOptions` object
/// Returns a JSON array of results
#[no_mangle]
pub extern "C" fn kb_search(
    engine_ptr: *mut KbEngine,
    query: *const c_char,
    options_json: *const c_char,
) -> *mut c_char {
    let Some(kb) = (unsafe { engine_ref(engine_ptr) }) else {
        return ptr::null_mut();
    };
    let (query, options) = unsafe { (read_str(query).unwrap_or_default(), read_str(options_json)) };

    let results = match parse_options(options) {
        Some(options) => kb.engine.search(query, &options),
        None => Vec::new(),
    };
    to_c_json(&results)
}

/// Debounced search; `callback` later receives the JSON results and `token`
///
/// The callback runs on the engine's worker thread. Returns 1 when scheduled,
/// 0 for a null engine or callback and for malformed options.
#[no_mangle]
pub extern "C" fn kb_debounced_search(
    engine_ptr: *mut KbEngine,
    query: *const c_char,
    options_json: *const c_char,
    callback: Option<KbResultsCallback>,
    token: usize,
) -> i32 {
    let (Some(kb), Some(callback)) = (unsafe { engine_ref(engine_ptr) }, callback) else {
        return 0;
    };
    let (query, options) = unsafe { (read_str(query).unwrap_or_default(), read_str(options_json)) };
    let Some(options) = parse_options(options) else {
        return 0;
    };

    let _guard = kb.runtime.enter();
    kb.engine.debounced_search(query, &options, move |results| {
        callback(to_c_json(&results), token);
    });
    1
}

/// Cancel a debounced search that has not fired; returns 1 if one was pending
#[no_mangle]
pub extern "C" fn kb_cancel_debounced_search(engine_ptr: *mut KbEngine) -> i32 {
    match unsafe { engine_ref(engine_ptr) } {
        Some(kb) if kb.engine.cancel_pending_search() => 1,
        _ => 0,
    }
}

/// Autocomplete suggestions (JSON array of strings); `max` 0 means the default
#[no_mangle]
pub extern "C" fn kb_suggestions(engine_ptr: *mut KbEngine, query: *const c_char, max: usize) -> *mut c_char {
    let Some(kb) = (unsafe { engine_ref(engine_ptr) }) else {
        return ptr::null_mut();
    };
    let query = unsafe { read_str(query).unwrap_or_default() };
    let max = if max == 0 { DEFAULT_MAX_SUGGESTIONS } else { max };

    to_c_json(&kb.engine.suggestions(query, max))
}

/// "Did you mean" corrections (JSON array); `max` 0 means the default
#[no_mangle]
pub extern "C" fn kb_did_you_mean(engine_ptr: *mut KbEngine, query: *const c_char, max: usize) -> *mut c_char {
    let Some(kb) = (unsafe { engine_ref(engine_ptr) }) else {
        return ptr::null_mut();
    };
    let query = unsafe { read_str(query).unwrap_or_default() };
    let max = if max == 0 { DEFAULT_MAX_CORRECTIONS } else { max };

    to_c_json(&kb.engine.did_you_mean(query, max))
}

/// History for the current language (JSON array, most recent first)
#[no_mangle]
pub extern "C" fn kb_history(engine_ptr: *mut KbEngine) -> *mut c_char {
    match unsafe { engine_ref(engine_ptr) } {
        Some(kb) => to_c_json(&kb.engine.history()),
        None => ptr::null_mut(),
    }
}

/// Record a query in the history
#[no_mangle]
pub extern "C" fn kb_add_to_history(engine_ptr: *mut KbEngine, query: *const c_char) -> i32 {
    let (Some(kb), Some(query)) = (unsafe { engine_ref(engine_ptr) }, unsafe { read_str(query) }) else {
        return 0;
    };
    kb.engine.add_to_history(query);
    1
}

/// Clear history in memory and in the store
#[no_mangle]
pub extern "C" fn kb_clear_history(engine_ptr: *mut KbEngine) -> i32 {
    match unsafe { engine_ref(engine_ptr) } {
        Some(kb) => {
            kb.engine.clear_history();
            1
        }
        None => 0,
    }
}

/// Switch language (`en` | `es`); returns 0 for anything else
#[no_mangle]
pub extern "C" fn kb_set_language(engine_ptr: *mut KbEngine, code: *const c_char) -> i32 {
    let (Some(kb), Some(code)) = (unsafe { engine_ref(engine_ptr) }, unsafe { read_str(code) }) else {
        return 0;
    };
    i32::from(kb.engine.set_language_code(code))
}

/// Current language code
#[no_mangle]
pub extern "C" fn kb_get_language(engine_ptr: *mut KbEngine) -> *mut c_char {
    match unsafe { engine_ref(engine_ptr) } {
        Some(kb) => CString::new(kb.engine.language().code())
            .map(CString::into_raw)
            .unwrap_or(ptr::null_mut()),
        None => ptr::null_mut(),
    }
}

/// Categories with labels in the current language (JSON array)
#[no_mangle]
pub extern "C" fn kb_categories(engine_ptr: *mut KbEngine) -> *mut c_char {
    match unsafe { engine_ref(engine_ptr) } {
        Some(kb) => to_c_json(&kb.engine.categories()),
        None => ptr::null_mut(),
    }
}

/// Free a string returned by this library
#[no_mangle]
pub extern "C" fn kb_string_free(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            let _ = CString::from_raw(s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const CORPUS: &str = r#"{
        "documents": [{
            "id": "reset-password",
            "language": "en",
            "title": "Reset Password",
            "content": "How to reset your password",
            "keywords": ["password", "reset"],
            "category": "Account"
        }],
        "categories": [{"id": "Account", "name": "Account", "nameEs": "Cuenta"}]
    }"#;

    fn take_json(s: *mut c_char) -> serde_json::Value {
        assert!(!s.is_null());
        let value = serde_json::from_str(unsafe { CStr::from_ptr(s) }.to_str().unwrap()).unwrap();
        kb_string_free(s);
        value
    }

    fn create() -> *mut KbEngine {
        let corpus = CString::new(CORPUS).unwrap();
        let locale = CString::new("en-US").unwrap();
        let engine = kb_engine_create(corpus.as_ptr(), ptr::null(), locale.as_ptr());
        assert!(!engine.is_null());
        engine
    }

    #[test]
    fn test_search_round_trip() {
        let engine = create();
        let query = CString::new("passwrd").unwrap();

        let results = take_json(kb_search(engine, query.as_ptr(), ptr::null()));
        assert_eq!(results[0]["id"], "reset-password");
        assert_eq!(results[0]["displayTitle"], "Reset Password");

        let options = CString::new(r#"{"category": "Billing"}"#).unwrap();
        let results = take_json(kb_search(engine, query.as_ptr(), options.as_ptr()));
        assert_eq!(results.as_array().unwrap().len(), 0);

        kb_engine_free(engine);
    }

    #[test]
    fn test_null_option_fields_keep_category_filter() {
        let corpus = CString::new(
            r#"{"documents": [
                {"id": "a", "language": "en", "title": "Reset Password", "content": "Reset your password", "category": "Account"},
                {"id": "b", "language": "en", "title": "Billing Password", "content": "Password for the billing portal", "category": "Billing"}
            ]}"#,
        )
        .unwrap();
        let locale = CString::new("en").unwrap();
        let engine = kb_engine_create(corpus.as_ptr(), ptr::null(), locale.as_ptr());
        let query = CString::new("password").unwrap();

        let options = CString::new(r#"{"category": "Billing", "minScore": null, "maxResults": null}"#).unwrap();
        let results = take_json(kb_search(engine, query.as_ptr(), options.as_ptr()));
        let ids: Vec<&str> = results
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["b"]);

        let blank = CString::new(r#"{"category": ""}"#).unwrap();
        let results = take_json(kb_search(engine, query.as_ptr(), blank.as_ptr()));
        assert_eq!(results.as_array().unwrap().len(), 2);

        kb_engine_free(engine);
    }

    #[test]
    fn test_malformed_options_return_nothing() {
        let engine = create();
        let query = CString::new("password").unwrap();

        let options = CString::new(r#"{"category": "Account", "maxResults": "many"}"#).unwrap();
        let results = take_json(kb_search(engine, query.as_ptr(), options.as_ptr()));
        assert_eq!(results.as_array().unwrap().len(), 0);
        assert_eq!(
            kb_debounced_search(engine, query.as_ptr(), options.as_ptr(), Some(on_results), 1),
            0
        );

        kb_engine_free(engine);
    }

    #[test]
    fn test_language_history_and_categories() {
        let engine = create();

        let spanish = CString::new("es").unwrap();
        let french = CString::new("fr").unwrap();
        assert_eq!(kb_set_language(engine, spanish.as_ptr()), 1);
        assert_eq!(kb_set_language(engine, french.as_ptr()), 0);

        let language = kb_get_language(engine);
        assert_eq!(unsafe { CStr::from_ptr(language) }.to_str().unwrap(), "es");
        kb_string_free(language);

        let categories = take_json(kb_categories(engine));
        assert_eq!(categories[0]["displayName"], "Cuenta");

        let query = CString::new("contraseña").unwrap();
        assert_eq!(kb_add_to_history(engine, query.as_ptr()), 1);
        let history = take_json(kb_history(engine));
        assert_eq!(history[0]["query"], "contraseña");
        assert_eq!(history[0]["language"], "es");

        assert_eq!(kb_clear_history(engine), 1);
        assert_eq!(take_json(kb_history(engine)).as_array().unwrap().len(), 0);

        kb_engine_free(engine);
    }

    #[test]
    fn test_suggestions_and_corrections() {
        let engine = create();

        let prefix = CString::new("pa").unwrap();
        let suggestions = take_json(kb_suggestions(engine, prefix.as_ptr(), 0));
        assert_eq!(suggestions[0], "password");

        let typo = CString::new("pasword").unwrap();
        let corrections = take_json(kb_did_you_mean(engine, typo.as_ptr(), 0));
        assert_eq!(corrections[0]["suggestion"], "password");

        kb_engine_free(engine);
    }

    #[test]
    fn test_null_pointers_are_harmless() {
        assert!(kb_search(ptr::null_mut(), ptr::null(), ptr::null()).is_null());
        assert!(kb_history(ptr::null_mut()).is_null());
        assert_eq!(kb_add_to_history(ptr::null_mut(), ptr::null()), 0);
        assert_eq!(kb_clear_history(ptr::null_mut()), 0);
        assert_eq!(kb_cancel_debounced_search(ptr::null_mut()), 0);
        kb_string_free(ptr::null_mut());
        kb_engine_free(ptr::null_mut());

        // Missing corpus still yields a working, empty engine
        let engine = kb_engine_create(ptr::null(), ptr::null(), ptr::null());
        let query = CString::new("password").unwrap();
        assert_eq!(take_json(kb_search(engine, query.as_ptr(), ptr::null())).as_array().unwrap().len(), 0);
        kb_engine_free(engine);
    }

    static DELIVERED: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn on_results(results_json: *mut c_char, token: usize) {
        let results = take_json(results_json);
        if results[0]["id"] == "reset-password" {
            DELIVERED.store(token, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_debounced_search_invokes_callback() {
        let engine = create();
        let query = CString::new("password").unwrap();

        assert_eq!(kb_debounced_search(engine, query.as_ptr(), ptr::null(), Some(on_results), 7), 1);

        let mut waited = 0;
        while DELIVERED.load(Ordering::SeqCst) != 7 && waited < 50 {
            std::thread::sleep(Duration::from_millis(20));
            waited += 1;
        }
        assert_eq!(DELIVERED.load(Ordering::SeqCst), 7);

        kb_engine_free(engine);
    }

    static FREED: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn free_from_callback(results_json: *mut c_char, token: usize) {
        kb_string_free(results_json);
        kb_engine_free(token as *mut KbEngine);
        FREED.store(1, Ordering::SeqCst);
    }

    #[test]
    fn test_engine_freed_inside_callback() {
        let engine = create();
        let query = CString::new("password").unwrap();

        assert_eq!(
            kb_debounced_search(engine, query.as_ptr(), ptr::null(), Some(free_from_callback), engine as usize),
            1
        );

        let mut waited = 0;
        while FREED.load(Ordering::SeqCst) == 0 && waited < 50 {
            std::thread::sleep(Duration::from_millis(20));
            waited += 1;
        }
        assert_eq!(FREED.load(Ordering::SeqCst), 1);
    }
}
