//! Host variant detection.
//!
//! Some Chromium-based hosts mishandle programmatic window geometry (Arc) or
//! need a pause before a window can be created (Edge). The manager asks a
//! [`HostDetector`] once per window creation and adapts accordingly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::platform::host::{BrowserHost, PageScripting, TabControl};
use crate::types::window::TabQuery;

/// Browser family, as far as the user agent tells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostKind {
    Chrome,
    Edge,
    Arc,
    Unknown,
}

/// Whether explicit window position/size may be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometrySupport {
    Standard,
    RestrictedGeometry,
}

/// What the manager needs to know about the host for one window creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostProfile {
    pub kind: HostKind,
    pub geometry: GeometrySupport,
    pub creation_delay: Option<Duration>,
}

impl HostProfile {
    pub fn standard() -> Self {
        Self {
            kind: HostKind::Unknown,
            geometry: GeometrySupport::Standard,
            creation_delay: None,
        }
    }

    pub fn supports_geometry(&self) -> bool {
        self.geometry == GeometrySupport::Standard
    }
}

/// Classifies a user-agent string.
pub fn classify_user_agent(user_agent: &str) -> HostKind {
    if user_agent.contains("Arc") {
        HostKind::Arc
    } else if user_agent.contains("Edg/") || user_agent.contains("Edge/") {
        HostKind::Edge
    } else if user_agent.contains("Chrome") {
        HostKind::Chrome
    } else {
        HostKind::Unknown
    }
}

/// Builds the profile for a host kind.
pub fn profile_for(kind: HostKind, creation_delay: Duration) -> HostProfile {
    match kind {
        HostKind::Arc => HostProfile {
            kind,
            geometry: GeometrySupport::RestrictedGeometry,
            creation_delay: None,
        },
        HostKind::Edge => HostProfile {
            kind,
            geometry: GeometrySupport::Standard,
            creation_delay: (!creation_delay.is_zero()).then_some(creation_delay),
        },
        HostKind::Chrome | HostKind::Unknown => HostProfile {
            kind,
            geometry: GeometrySupport::Standard,
            creation_delay: None,
        },
    }
}

/// Pluggable capability detection.
#[async_trait]
pub trait HostDetector: Send + Sync {
    async fn detect(&self) -> HostProfile;
}

/// Always answers with the same profile.
pub struct FixedDetector(pub HostProfile);

#[async_trait]
impl HostDetector for FixedDetector {
    async fn detect(&self) -> HostProfile {
        self.0
    }
}

/// Reads the user agent from the active tab, falling back to a configured string.
pub struct UserAgentDetector {
    host: Arc<dyn BrowserHost>,
    fallback_user_agent: Option<String>,
    creation_delay: Duration,
}

impl UserAgentDetector {
    pub fn new(
        host: Arc<dyn BrowserHost>,
        fallback_user_agent: Option<String>,
        creation_delay: Duration,
    ) -> Self {
        Self {
            host,
            fallback_user_agent,
            creation_delay,
        }
    }

    async fn probe_user_agent(&self) -> Option<String> {
        let tabs = match self.host.query_tabs(TabQuery::active_in_current_window()).await {
            Ok(tabs) => tabs,
            Err(e) => {
                warn!("host detection: active tab query failed: {}", e);
                return None;
            }
        };
        let tab = tabs.first()?;
        match self.host.user_agent(tab.id).await {
            Ok(ua) => Some(ua),
            Err(e) => {
                debug!("host detection: page probe failed in tab {}: {}", tab.id, e);
                None
            }
        }
    }
}

#[async_trait]
impl HostDetector for UserAgentDetector {
    async fn detect(&self) -> HostProfile {
        let user_agent = self
            .probe_user_agent()
            .await
            .or_else(|| self.fallback_user_agent.clone());
        let kind = user_agent
            .as_deref()
            .map(classify_user_agent)
            .unwrap_or(HostKind::Unknown);
        debug!("host detection: {:?}", kind);
        profile_for(kind, self.creation_delay)
    }
}
