// Scoped ownership of a remote browser session.
//
// A SessionGuard exists only after a session was provisioned, so a failed
// acquire can never trigger a release. The guard releases exactly once: either
// through `release()` on the normal path, or from Drop when the run future is
// cancelled or unwinds before reaching it.

use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use crate::observer::{ScrapeEvent, ScrapeObserver};
use crate::traits::{BrowserSession, SessionProvider};

pub struct SessionGuard {
    provider: Arc<dyn SessionProvider>,
    observer: Arc<dyn ScrapeObserver>,
    session: BrowserSession,
    released: bool,
}

impl SessionGuard {
    pub async fn acquire(
        provider: Arc<dyn SessionProvider>,
        observer: Arc<dyn ScrapeObserver>,
    ) -> Result<Self> {
        let session = provider.create_session().await?;
        observer.on_event(&ScrapeEvent::SessionAcquired {
            session_id: session.id.clone(),
        });
        Ok(Self {
            provider,
            observer,
            session,
            released: false,
        })
    }

    pub fn session(&self) -> &BrowserSession {
        &self.session
    }

    /// Release the session. Failures are reported to the observer, never returned.
    ///
    /// The provider call runs on its own task, so cancelling the caller while
    /// this is pending does not cancel the release.
    pub async fn release(mut self) -> bool {
        self.released = true;

        let provider = self.provider.clone();
        let observer = self.observer.clone();
        let session_id = self.session.id.clone();
        let task = tokio::spawn(async move {
            release_and_report(provider.as_ref(), observer.as_ref(), &session_id).await
        });

        match task.await {
            Ok(ok) => ok,
            Err(e) => {
                warn!(session_id = %self.session.id, error = %e, "Session release task failed");
                false
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let provider = self.provider.clone();
        let observer = self.observer.clone();
        let session_id = self.session.id.clone();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(session_id = %session_id, "Run ended without release, releasing in background");
                handle.spawn(async move {
                    release_and_report(provider.as_ref(), observer.as_ref(), &session_id).await;
                });
            }
            Err(_) => {
                warn!(session_id = %session_id, "No async runtime available, session leaked");
            }
        }
    }
}

async fn release_and_report(
    provider: &dyn SessionProvider,
    observer: &dyn ScrapeObserver,
    session_id: &str,
) -> bool {
    let ok = match provider.release_session(session_id).await {
        Ok(()) => true,
        Err(e) => {
            warn!(session_id, error = %e, "Failed to release session");
            false
        }
    };
    observer.on_event(&ScrapeEvent::SessionReleased {
        session_id: session_id.to_string(),
        ok,
    });
    ok
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{MockSessionProvider, RecordingObserver};

    #[tokio::test]
    async fn release_happens_exactly_once() {
        let provider = Arc::new(MockSessionProvider::new());
        let observer = Arc::new(RecordingObserver::new());

        let guard = SessionGuard::acquire(provider.clone(), observer.clone()).await.unwrap();
        assert!(guard.release().await);
        tokio::task::yield_now().await;

        assert_eq!(provider.released(), vec!["session-1"]);
        assert_eq!(
            observer.events().last(),
            Some(&ScrapeEvent::SessionReleased {
                session_id: "session-1".into(),
                ok: true
            })
        );
    }

    #[tokio::test]
    async fn cancelled_caller_does_not_abort_an_in_flight_release() {
        let provider = Arc::new(MockSessionProvider::new().with_release_delay(Duration::from_millis(50)));
        let observer = Arc::new(RecordingObserver::new());

        let guard = SessionGuard::acquire(provider.clone(), observer.clone()).await.unwrap();
        let cancelled = tokio::time::timeout(Duration::from_millis(5), guard.release()).await;
        assert!(cancelled.is_err());
        assert!(provider.released().is_empty());

        for _ in 0..50 {
            if !provider.released().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(provider.released(), vec!["session-1"]);
    }

    #[tokio::test]
    async fn dropped_guard_releases_in_the_background() {
        let provider = Arc::new(MockSessionProvider::new());
        let observer = Arc::new(RecordingObserver::new());

        let guard = SessionGuard::acquire(provider.clone(), observer.clone()).await.unwrap();
        drop(guard);

        for _ in 0..50 {
            if !provider.released().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(provider.released(), vec!["session-1"]);
    }
}
