//! `time` tool: current time, optionally in an IANA timezone

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use tracing::info;

use super::registry::{Tool, ToolError, ToolHandler};
use super::schema::{FieldConstraint, ParamSchema, ToolParams};
use crate::protocol::ToolCallResult;

/// Clock used by the tool
pub type Clock = fn() -> DateTime<Utc>;

pub struct TimeTool {
    clock: Clock,
}

impl Default for TimeTool {
    fn default() -> Self {
        Self { clock: Utc::now }
    }
}

impl TimeTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self { clock }
    }

    pub fn into_tool(self) -> Tool {
        Tool::new(
            "time",
            "Get the current time. It receives an optional timezone parameter. \
             If no timezone is provided, it returns the current time in UTC.",
            ParamSchema::new().field(
                "timezone",
                FieldConstraint::string()
                    .optional()
                    .describe("IANA timezone name, e.g. Europe/Madrid"),
            ),
            self,
        )
    }

    fn render(now: DateTime<Utc>, timezone: Option<&str>) -> String {
        let Some(timezone) = timezone.filter(|tz| !tz.is_empty()) else {
            return now.to_rfc3339_opts(SecondsFormat::Millis, true);
        };

        match timezone.parse::<Tz>() {
            Ok(tz) => format!(
                "{} ({})",
                now.with_timezone(&tz).format("%d/%m/%Y, %H:%M:%S"),
                timezone
            ),
            Err(_) => format!("Invalid timezone: {}", timezone),
        }
    }
}

#[async_trait]
impl ToolHandler for TimeTool {
    async fn invoke(&self, params: ToolParams) -> Result<ToolCallResult, ToolError> {
        info!("Time tool called");
        let now = (self.clock)();
        Ok(ToolCallResult::text(Self::render(now, params.str("timezone"))))
    }
}
