//! Agenda items as published in the conference JSON export

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::Result;

/// One entry of the agenda
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaItem {
    pub title: String,
    pub date: String,
    pub time: String,
    pub stage: String,
    /// Comma-separated speaker names, empty for breaks and similar slots
    #[serde(default)]
    pub speaker: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl AgendaItem {
    /// Text sent to the embedding model for this item
    pub fn embedding_text(&self) -> String {
        format!(
            "Título: {}\nFecha: {}\nHora: {}\nStage: {}\nPonente(s): {}\nTipo: {}",
            self.title, self.date, self.time, self.stage, self.speaker, self.kind
        )
    }

    /// Payload stored alongside the vector
    pub fn payload(&self) -> Value {
        json!({
            "title": self.title,
            "date": self.date,
            "time": self.time,
            "stage": self.stage,
            "speaker": self.speaker,
            "type": self.kind,
        })
    }
}

/// Load an agenda JSON array from disk
pub async fn load_agenda(path: &Path) -> Result<Vec<AgendaItem>> {
    let contents = tokio::fs::read_to_string(path).await?;
    let items: Vec<AgendaItem> = serde_json::from_str(&contents)?;
    debug!("Loaded {} agenda items from {:?}", items.len(), path);
    Ok(items)
}

/// Group items by date, each day sorted by start time
pub fn by_day(items: &[AgendaItem]) -> BTreeMap<&str, Vec<&AgendaItem>> {
    let mut days: BTreeMap<&str, Vec<&AgendaItem>> = BTreeMap::new();
    for item in items {
        days.entry(item.date.as_str()).or_default().push(item);
    }
    for slots in days.values_mut() {
        slots.sort_by(|a, b| a.time.cmp(&b.time));
    }
    days
}
