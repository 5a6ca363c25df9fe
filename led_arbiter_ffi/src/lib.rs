#![allow(clippy::missing_safety_doc)]

use std::ffi::c_void;
use std::ptr;
use std::sync::Arc;

use led_arbiter_core::{ArbitrationEngine, CatalogCfg, Color, Error, IndicatorOutput};

/// FFI ABI version for led_arbiter_ffi.
///
/// Bump this when any `#[repr(C)]` type or exported function signature changes.
pub const LED_ARBITER_FFI_VERSION: u32 = 1;

pub const LED_OK: i32 = 0;
pub const LED_ERR_NULL: i32 = -1;
pub const LED_ERR_UTF8: i32 = -2;
pub const LED_ERR_INVALID_ARGUMENT: i32 = -3;
pub const LED_ERR_INVARIANT: i32 = -4;

#[no_mangle]
pub extern "C" fn led_arbiter_ffi_version() -> u32 {
    LED_ARBITER_FFI_VERSION
}

/// FFI string view (UTF-8 bytes, not NUL-terminated).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct LedStr {
    pub ptr: *const u8,
    pub len: usize,
}

impl LedStr {
    unsafe fn as_str(&self) -> Result<&str, i32> {
        if self.ptr.is_null() {
            return Err(LED_ERR_NULL);
        }
        let bytes = std::slice::from_raw_parts(self.ptr, self.len);
        std::str::from_utf8(bytes).map_err(|_| LED_ERR_UTF8)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedColor {
    Off = 0,
    Red = 1,
    Blue = 2,
    Green = 3,
}

impl From<Color> for LedColor {
    fn from(c: Color) -> Self {
        match c {
            Color::Off => LedColor::Off,
            Color::Red => LedColor::Red,
            Color::Blue => LedColor::Blue,
            Color::Green => LedColor::Green,
        }
    }
}

/// Device callback. Invoked from runtime worker threads as well as from the
/// thread calling activate/deactivate, so it must be thread-safe.
pub type LedSetColorFn = extern "C" fn(user: *mut c_void, color: LedColor);

struct CallbackOutput {
    set_color: LedSetColorFn,
    user: *mut c_void,
}

// The caller promises `user` may be used from any thread for the lifetime of
// the handle (documented on `led_arbiter_new`).
unsafe impl Send for CallbackOutput {}
unsafe impl Sync for CallbackOutput {}

impl IndicatorOutput for CallbackOutput {
    fn set_color(&self, color: Color) {
        (self.set_color)(self.user, color.into())
    }
}

/// Opaque handle exposed over FFI. Owns the runtime the pattern tasks run on.
pub struct LedArbiter {
    engine: ArbitrationEngine,
    // Dropped after `engine`, so no task outlives its runtime.
    _runtime: tokio::runtime::Runtime,
}

fn rc(e: &Error) -> i32 {
    match e {
        Error::InvariantViolation { .. } => LED_ERR_INVARIANT,
        _ => LED_ERR_INVALID_ARGUMENT,
    }
}

fn build(cfg: &CatalogCfg, set_color: LedSetColorFn, user: *mut c_void) -> *mut LedArbiter {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("led-arbiter")
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to start runtime: {e}");
            return ptr::null_mut();
        }
    };
    let output = Arc::new(CallbackOutput { set_color, user });
    match ArbitrationEngine::new(cfg, output, runtime.handle().clone()) {
        Ok(engine) => Box::into_raw(Box::new(LedArbiter {
            engine,
            _runtime: runtime,
        })),
        Err(e) => {
            tracing::error!("failed to build engine: {e}");
            ptr::null_mut()
        }
    }
}

/// Create a handle over the built-in catalog.
///
/// `set_color` is called with `user` for every device write, possibly from a
/// background thread, until `led_arbiter_free` returns.
#[no_mangle]
pub extern "C" fn led_arbiter_new(set_color: LedSetColorFn, user: *mut c_void) -> *mut LedArbiter {
    build(&CatalogCfg::default(), set_color, user)
}

/// Create a handle from a TOML catalog. Returns null if the text does not parse
/// or the catalog is invalid.
#[no_mangle]
pub unsafe extern "C" fn led_arbiter_new_from_toml(
    toml: LedStr,
    set_color: LedSetColorFn,
    user: *mut c_void,
) -> *mut LedArbiter {
    let text = match toml.as_str() {
        Ok(t) => t,
        Err(_) => return ptr::null_mut(),
    };
    match CatalogCfg::from_toml_str(text) {
        Ok(cfg) => build(&cfg, set_color, user),
        Err(e) => {
            tracing::error!("rejected catalog: {e}");
            ptr::null_mut()
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn led_arbiter_free(h: *mut LedArbiter) {
    if !h.is_null() {
        drop(Box::from_raw(h));
    }
}

unsafe fn with_id(
    h: *const LedArbiter,
    id: LedStr,
    f: impl FnOnce(&ArbitrationEngine, &str) -> Result<(), Error>,
) -> i32 {
    if h.is_null() {
        return LED_ERR_NULL;
    }
    let handle = &*h;
    let id = match id.as_str() {
        Ok(s) => s,
        Err(code) => return code,
    };
    match f(&handle.engine, id) {
        Ok(()) => LED_OK,
        Err(e) => rc(&e),
    }
}

#[no_mangle]
pub unsafe extern "C" fn led_arbiter_activate(h: *const LedArbiter, id: LedStr) -> i32 {
    with_id(h, id, |engine, id| engine.activate(id).map(|_| ()))
}

#[no_mangle]
pub unsafe extern "C" fn led_arbiter_deactivate(h: *const LedArbiter, id: LedStr) -> i32 {
    with_id(h, id, |engine, id| engine.deactivate(id).map(|_| ()))
}

/// Toggle the catalog entry at zero-based `index`.
#[no_mangle]
pub unsafe extern "C" fn led_arbiter_toggle_index(h: *const LedArbiter, index: usize) -> i32 {
    if h.is_null() {
        return LED_ERR_NULL;
    }
    let engine = &(*h).engine;
    match engine.id_at(index).and_then(|id| engine.toggle(id)) {
        Ok(_) => LED_OK,
        Err(e) => rc(&e),
    }
}

/// Rank of the visible indicator, or -1 when nothing is requested (or `h` is null).
#[no_mangle]
pub unsafe extern "C" fn led_arbiter_visible_rank(h: *const LedArbiter) -> i32 {
    if h.is_null() {
        return -1;
    }
    let engine = &(*h).engine;
    engine
        .visible()
        .and_then(|id| engine.rank_of(&id).ok())
        .map(|rank| rank as i32)
        .unwrap_or(-1)
}

#[no_mangle]
pub unsafe extern "C" fn led_arbiter_catalog_len(h: *const LedArbiter) -> usize {
    if h.is_null() {
        return 0;
    }
    (*h).engine.catalog().len()
}
