use serde::{Deserialize, Serialize};

/// Messages delivered to the content script of a tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TabMessage {
    JumpToTimestamp { timestamp: u64 },
    ShowNotification { message: String },
    CopyToClipboard { text: String },
    PasteFromClipboard,
}

/// Reply from a content script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MessageResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Messages sent from content scripts to the background side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RuntimeMessage {
    #[serde(rename = "openTSNotesLink")]
    OpenCompanionLink {
        url: String,
        #[serde(default)]
        timestamp: u64,
    },
}
