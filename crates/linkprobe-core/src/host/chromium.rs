//! Chromium host: one tab per probe source, driven over CDP.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, EventRequestWillBeSent};
use chromiumoxide::Page;
use futures::StreamExt;
use serde::Deserialize;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{BrowserConfig, ProbeConfig};

use super::{Expansion, HostError, HostEvent, ProbeHost, ProbeSourceId};

/// Reason reported upstream when a playlist page never lists its members.
pub const EXPAND_FAILED: &str = "Failed to get playlist links";

const PLAYLIST_SCRIPT: &str = r#"(() => {
    const anchors = [...document.querySelectorAll('#items a#wc-endpoint')];
    return {
        hrefs: anchors.map(a => a.href),
        titles: anchors.map(a => {
            const t = a.querySelector('span#video-title');
            return t ? t.getAttribute('title') : null;
        }),
    };
})()"#;

#[derive(Debug, Deserialize)]
struct ScrapedPlaylist {
    hrefs: Vec<String>,
    titles: Vec<Option<String>>,
}

struct ProbeTab {
    page: Page,
    forwarder: JoinHandle<()>,
}

struct Inner {
    browser: Browser,
    tabs: Mutex<HashMap<ProbeSourceId, ProbeTab>>,
    next_id: AtomicU64,
    events: UnboundedSender<HostEvent>,
    host_suffix: String,
    expand_attempts: u32,
    expand_poll: Duration,
}

/// [`ProbeHost`] backed by a Chromium instance.
///
/// Commands are served on the runtime that launched the browser; results are
/// reported on `events`.
pub struct ChromiumHost {
    inner: Arc<Inner>,
    runtime: Handle,
}

impl ChromiumHost {
    /// Launch Chromium and spawn its CDP handler loop.
    pub async fn launch(
        browser: &BrowserConfig,
        probe: &ProbeConfig,
        events: UnboundedSender<HostEvent>,
    ) -> Result<Self> {
        let mut builder = CdpBrowserConfig::builder()
            .arg("--autoplay-policy=no-user-gesture-required")
            .arg("--mute-audio")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if !browser.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &browser.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (cdp, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "cdp handler error");
                }
            }
        });
        info!(headless = browser.headless, "browser launched");

        Ok(Self {
            inner: Arc::new(Inner {
                browser: cdp,
                tabs: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                events,
                host_suffix: probe.host_suffix.trim().to_string(),
                expand_attempts: browser.expand_attempts.max(1),
                expand_poll: Duration::from_millis(browser.expand_poll_ms),
            }),
            runtime: Handle::current(),
        })
    }
}

impl ProbeHost for ChromiumHost {
    fn allocate_probe_source(&self, link: &str) {
        let inner = Arc::clone(&self.inner);
        let link = link.to_string();
        self.runtime.spawn(async move {
            if let Err(err) = inner.open_probe(&link).await {
                warn!(link = %link, error = %err, "probe tab failed");
                let _ = inner.events.send(HostEvent::ProbeAllocated {
                    link,
                    result: Err(err),
                });
            }
        });
    }

    fn release_probe_source(&self, source: ProbeSourceId) {
        let inner = Arc::clone(&self.inner);
        self.runtime.spawn(async move {
            let tab = inner.tabs.lock().await.remove(&source);
            let Some(tab) = tab else {
                return;
            };
            tab.forwarder.abort();
            if let Err(e) = tab.page.close().await {
                debug!(%source, error = %e, "closing probe tab failed");
            }
        });
    }

    fn expand_playlist(&self, playlist: &str) {
        let inner = Arc::clone(&self.inner);
        let playlist = playlist.to_string();
        self.runtime.spawn(async move {
            let result = inner.scrape_playlist(&playlist).await;
            let _ = inner
                .events
                .send(HostEvent::PlaylistExpanded { playlist, result });
        });
    }
}

impl Inner {
    /// Open a tab for `link`, start listening for its requests and navigate.
    /// On success `ProbeAllocated` has been sent and the forwarder is running.
    async fn open_probe(&self, link: &str) -> Result<(), HostError> {
        let fail = |reason: String| HostError::Allocation {
            link: link.to_string(),
            reason,
        };
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| fail(e.to_string()))?;
        page.execute(EnableParams::default())
            .await
            .map_err(|e| fail(e.to_string()))?;
        let mut requests = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| fail(e.to_string()))?;
        if let Err(e) = page.goto(link).await {
            let _ = page.close().await;
            return Err(fail(e.to_string()));
        }

        let source = ProbeSourceId(self.next_id.fetch_add(1, Ordering::Relaxed));
        // Held until the tab is registered so a fast release cannot miss it.
        let mut tabs = self.tabs.lock().await;
        let _ = self.events.send(HostEvent::ProbeAllocated {
            link: link.to_string(),
            result: Ok(source),
        });
        let events = self.events.clone();
        let suffix = self.host_suffix.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = requests.next().await {
                let url = &event.request.url;
                if !host_matches(url, &suffix) {
                    continue;
                }
                let observed = HostEvent::RequestObserved {
                    source,
                    url: url.clone(),
                };
                if events.send(observed).is_err() {
                    break;
                }
            }
        });
        tabs.insert(source, ProbeTab { page, forwarder });
        debug!(link, %source, "probe tab open");
        Ok(())
    }

    async fn scrape_playlist(&self, url: &str) -> Result<Expansion, String> {
        let page = match self.browser.new_page(url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(playlist = url, error = %e, "failed to open playlist page");
                return Err(EXPAND_FAILED.to_string());
            }
        };

        let mut result = Err(EXPAND_FAILED.to_string());
        for attempt in 1..=self.expand_attempts {
            tokio::time::sleep(self.expand_poll).await;
            let scraped = match page.evaluate(PLAYLIST_SCRIPT).await {
                Ok(value) => value.into_value::<ScrapedPlaylist>(),
                Err(e) => {
                    debug!(playlist = url, attempt, error = %e, "playlist script failed");
                    continue;
                }
            };
            match scraped {
                Ok(found) if !found.hrefs.is_empty() => {
                    result = Ok(Expansion::from_parallel(found.hrefs, found.titles));
                    break;
                }
                Ok(_) => debug!(playlist = url, attempt, "playlist not rendered yet"),
                Err(e) => debug!(playlist = url, attempt, error = %e, "unexpected playlist script result"),
            }
        }
        if let Err(e) = page.close().await {
            debug!(playlist = url, error = %e, "closing playlist tab failed");
        }
        result
    }
}

/// True if `url`'s host is `suffix` or a subdomain of it. An empty suffix
/// matches everything.
fn host_matches(url: &str, suffix: &str) -> bool {
    if suffix.is_empty() {
        return true;
    }
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    match parsed.host_str() {
        Some(host) => {
            host == suffix
                || host
                    .strip_suffix(suffix)
                    .is_some_and(|rest| rest.ends_with('.'))
        }
        None => false,
    }
}
