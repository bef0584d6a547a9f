//! Module descriptor: the reloadable handle to a module.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use super::Module;

// ─── API versioning ─────────────────────────────────────────────────────────

/// Current Tern module API version (1.0).
pub const TERN_MODULE_API_VERSION: u32 = 0x0001_0000;

type ModuleFactory = Arc<dyn Fn() -> Module + Send + Sync>;

// ─── ModuleDescriptor ───────────────────────────────────────────────────────

/// Names a module and knows how to build a fresh instance of it.
///
/// The manager keeps descriptors, not modules. Every load or reload calls
/// the factory again, so a reload always starts from a clean [`Module`]
/// with freshly declared handlers and hooks.
///
/// ```rust,ignore
/// pub fn ping() -> ModuleDescriptor {
///     ModuleDescriptor::new("ping", || {
///         Module::new().handler(HandlerSpec::new("ping", ping).commands(["ping"]))
///     })
/// }
/// ```
#[derive(Clone)]
pub struct ModuleDescriptor {
    /// Module API version this descriptor was built against.
    pub api_version: u32,
    name: Cow<'static, str>,
    factory: ModuleFactory,
}

impl ModuleDescriptor {
    /// Creates a descriptor with the current API version.
    pub fn new<F>(name: impl Into<Cow<'static, str>>, factory: F) -> Self
    where
        F: Fn() -> Module + Send + Sync + 'static,
    {
        Self {
            api_version: TERN_MODULE_API_VERSION,
            name: name.into(),
            factory: Arc::new(factory),
        }
    }

    /// Module name, used in logs, allow-lists and as the config key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if this descriptor's API version is compatible with the
    /// running framework.
    ///
    /// The major part must match exactly; the descriptor's minor part must be
    /// at most the host's minor part.
    pub fn is_compatible(&self) -> bool {
        let host_major = TERN_MODULE_API_VERSION >> 16;
        let host_minor = TERN_MODULE_API_VERSION & 0xFFFF;
        let major = self.api_version >> 16;
        let minor = self.api_version & 0xFFFF;
        major == host_major && minor <= host_minor
    }

    /// Builds a fresh module instance.
    #[inline]
    pub fn instantiate(&self) -> Module {
        (self.factory)()
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("api_version", &format_args!("{:#010x}", self.api_version))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatibility() {
        let mut desc = ModuleDescriptor::new("m", Module::new);
        assert!(desc.is_compatible());

        desc.api_version = TERN_MODULE_API_VERSION + 1;
        assert!(!desc.is_compatible());

        desc.api_version = 0x0002_0000;
        assert!(!desc.is_compatible());
    }

    #[test]
    fn test_instantiate_calls_factory_each_time() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let desc = ModuleDescriptor::new("m", move || {
            c.fetch_add(1, Ordering::SeqCst);
            Module::new()
        });
        desc.instantiate();
        desc.instantiate();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
