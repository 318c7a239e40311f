//! API data models

use serde::{Deserialize, Serialize};

use crate::chapters::Chapter;
use crate::trickplay::TrickplayInfo;

/// Acknowledgement returned when a run is accepted
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StartAck {
    #[serde(default)]
    pub message: Option<String>,
}

/// Video fields the timeline needs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerVideo {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub duration_ticks: Option<i64>,
}

/// Player info payload: video, optional trickplay and current chapters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerInfo {
    pub video: PlayerVideo,
    #[serde(default)]
    pub trickplay: Option<TrickplayInfo>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

impl PlayerInfo {
    pub fn duration_ticks(&self) -> i64 {
        self.video.duration_ticks.unwrap_or(0).max(0)
    }
}

/// Error body shape used by the backend
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_info_without_trickplay() {
        let info: PlayerInfo = serde_json::from_str(
            r#"{"video": {"id": 59, "title": "WrestleKingdom", "duration_ticks": 36000000000},
                "trickplay": null,
                "chapters": []}"#,
        )
        .unwrap();

        assert_eq!(info.video.id, 59);
        assert_eq!(info.duration_ticks(), 36_000_000_000);
        assert!(info.trickplay.is_none());
    }
}
