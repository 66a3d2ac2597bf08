//! Static catalog of utility rate schedules.
//!
//! Submissions store the schedule id only; display text is resolved here.

use serde::Serialize;
use std::fmt;

/// Placeholder rendered for values that cannot be resolved.
pub const MISSING: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Season {
    Winter,
    Summer,
    #[serde(rename = "All Year")]
    AllYear,
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Winter => write!(f, "Winter"),
            Season::Summer => write!(f, "Summer"),
            Season::AllYear => write!(f, "All Year"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateSchedule {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub season: Season,
}

impl RateSchedule {
    /// "E-TOU-C — Time-of-Use (4-9pm Peak) — Winter"
    pub fn display(&self) -> String {
        format!("{} — {} — {}", self.name, self.description, self.season)
    }
}

pub const RATE_SCHEDULES: [RateSchedule; 7] = [
    RateSchedule {
        id: "E-1-ALL",
        name: "E-1",
        description: "Flat Rate (Tiered Pricing)",
        season: Season::AllYear,
    },
    RateSchedule {
        id: "E-TOU-C-W",
        name: "E-TOU-C",
        description: "Time-of-Use (4-9pm Peak)",
        season: Season::Winter,
    },
    RateSchedule {
        id: "E-TOU-C-S",
        name: "E-TOU-C",
        description: "Time-of-Use (4-9pm Peak)",
        season: Season::Summer,
    },
    RateSchedule {
        id: "E-TOU-D-W",
        name: "E-TOU-D",
        description: "Time-of-Use (3-8pm Peak)",
        season: Season::Winter,
    },
    RateSchedule {
        id: "E-TOU-D-S",
        name: "E-TOU-D",
        description: "Time-of-Use (3-8pm Peak)",
        season: Season::Summer,
    },
    RateSchedule {
        id: "EV2-A-W",
        name: "EV2-A",
        description: "Time-of-Use (EV Owners)",
        season: Season::Winter,
    },
    RateSchedule {
        id: "EV2-A-S",
        name: "EV2-A",
        description: "Time-of-Use (EV Owners)",
        season: Season::Summer,
    },
];

/// Looks up a schedule by its exact id.
pub fn find(id: &str) -> Option<&'static RateSchedule> {
    RATE_SCHEDULES.iter().find(|schedule| schedule.id == id)
}

/// Display text for an optional stored id, `-` when absent or unknown.
pub fn display_for(id: Option<&str>) -> String {
    id.and_then(find)
        .map(RateSchedule::display)
        .unwrap_or_else(|| MISSING.to_string())
}
