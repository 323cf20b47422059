use std::sync::{Mutex, MutexGuard, OnceLock};

/// Serializes CLI tests that point `HOME` and the `KSHIP_*` tool overrides at
/// per-test directories.
pub fn lock_test_env() -> MutexGuard<'static, ()> {
    static KSHIP_ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    KSHIP_ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
