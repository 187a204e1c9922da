use dashmap::DashMap;
use std::sync::{Mutex, PoisonError};
use tracing::info;

const TOKEN: &str = "token";
const TENANT: &str = "tenant";

type Listener = Box<dyn Fn() + Send + Sync>;

/// Credentials of the signed-in dashboard user.
///
/// Listeners registered with [`SessionStore::on_change`] run synchronously
/// whenever the credentials change or are cleared, before the mutating call
/// returns.
#[derive(Default)]
pub struct SessionStore {
    entries: DashMap<&'static str, String>,
    listeners: Mutex<Vec<Listener>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<String> {
        self.entries.get(TOKEN).map(|v| v.clone())
    }

    pub fn tenant(&self) -> Option<String> {
        self.entries.get(TENANT).map(|v| v.clone())
    }

    pub fn set_token(&self, token: impl Into<String>) {
        self.entries.insert(TOKEN, token.into());
        self.notify();
    }

    pub fn set_tenant(&self, tenant: impl Into<String>) {
        self.entries.insert(TENANT, tenant.into());
        self.notify();
    }

    // Replace all credentials at once
    pub fn sign_in(&self, token: impl Into<String>, tenant: Option<String>) {
        self.entries.clear();
        self.entries.insert(TOKEN, token.into());
        if let Some(tenant) = tenant {
            self.entries.insert(TENANT, tenant);
        }
        self.notify();
    }

    pub fn is_authenticated(&self) -> bool {
        self.entries.contains_key(TOKEN)
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.notify();
    }

    pub fn on_change(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    fn notify(&self) {
        let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener();
        }
    }
}

/// Where the caller application goes when its session is torn down.
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self, route: &str);
}

/// Remembers the last requested login redirect until the dashboard picks it
/// up.
#[derive(Default)]
pub struct LoginRedirect {
    pending: Mutex<Option<String>>,
}

impl LoginRedirect {
    pub fn new() -> Self {
        Self::default()
    }

    // Pending route, cleared by the read
    pub fn take(&self) -> Option<String> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

impl Navigator for LoginRedirect {
    fn redirect_to_login(&self, route: &str) {
        info!(route, "Redirecting dashboard to login");
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(route.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_drops_all_credentials() {
        let session = SessionStore::new();
        assert!(!session.is_authenticated());

        session.set_token("abc");
        session.set_tenant("acme");
        assert!(session.is_authenticated());
        assert_eq!(session.token().as_deref(), Some("abc"));
        assert_eq!(session.tenant().as_deref(), Some("acme"));

        session.clear();
        assert!(!session.is_authenticated());
        assert_eq!(session.tenant(), None);
    }

    #[test]
    fn redirect_is_taken_once() {
        let redirect = LoginRedirect::new();
        assert_eq!(redirect.take(), None);

        redirect.redirect_to_login("/login");
        assert_eq!(redirect.take().as_deref(), Some("/login"));
        assert_eq!(redirect.take(), None);
    }

    #[test]
    fn redirect_survives_a_poisoned_lock() {
        let redirect = std::sync::Arc::new(LoginRedirect::new());
        let poisoner = std::sync::Arc::clone(&redirect);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.pending.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(redirect.pending.is_poisoned());

        redirect.redirect_to_login("/login");
        assert_eq!(redirect.take().as_deref(), Some("/login"));
    }

    #[test]
    fn listeners_see_every_credential_change() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let session = SessionStore::new();
        let changes = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&changes);
        session.on_change(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        session.sign_in("abc", Some("acme".to_string()));
        assert_eq!(changes.load(Ordering::SeqCst), 1);
        assert_eq!(session.tenant().as_deref(), Some("acme"));

        session.sign_in("def", None);
        assert_eq!(session.tenant(), None);
        session.set_tenant("globex");
        session.clear();
        assert_eq!(changes.load(Ordering::SeqCst), 4);
    }
}
