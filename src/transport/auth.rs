use std::sync::Once;

/// Makes sure credentials for HTTP(S) access are in place before a URL is touched. Where the
///  credentials come from is up to the implementation.
pub trait Authenticator: Send + Sync {
    /// Called before every HTTP(S) access, so it must be idempotent and cheap after the first call.
    fn ensure_installed(&self);
}

/// for repositories that need no authentication
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAuthenticator;

impl Authenticator for NoAuthenticator {
    fn ensure_installed(&self) {}
}

/// Runs an installation hook exactly once, no matter how many transports share it or how
///  many threads call it concurrently.
pub struct OnceAuthenticator {
    once: Once,
    install: Box<dyn Fn() + Send + Sync>,
}
impl OnceAuthenticator {
    pub fn new(install: impl Fn() + Send + Sync + 'static) -> OnceAuthenticator {
        OnceAuthenticator {
            once: Once::new(),
            install: Box::new(install),
        }
    }
}

impl Authenticator for OnceAuthenticator {
    fn ensure_installed(&self) {
        self.once.call_once(|| (self.install)());
    }
}
