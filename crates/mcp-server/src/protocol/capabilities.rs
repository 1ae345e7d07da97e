//! Capabilities the server advertises in its `initialize` result

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
    /// Present (as `{}`) when the server emits `notifications/message`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<Map<String, Value>>,
}

impl ServerCapabilities {
    /// Advertise tools; the agenda tool set is fixed once the server starts
    pub fn enable_tools(mut self) -> Self {
        self.tools = Some(ToolsCapability {
            list_changed: Some(false),
        });
        self
    }

    pub fn enable_logging(mut self) -> Self {
        self.logging = Some(Map::new());
        self
    }

    /// What every agenda session offers
    pub fn with_tools_and_logging() -> Self {
        Self::default().enable_tools().enable_logging()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}
