//! Per-visitor analysis progress.
//!
//! A session starts at `Input`, jumps to 15% on entering `Processing`, climbs
//! in steps of 5 and flips to `Results` on the first tick after reaching 85%.
//! Sessions are held in a TTL cache and removed explicitly by the client.

use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use crate::errors::AppError;

pub const PROCESSING_START: u8 = 15;
pub const TICK_STEP: u8 = 5;
pub const RESULTS_THRESHOLD: u8 = 85;

/// Sessions idle longer than this are forgotten.
pub const SESSION_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Input,
    Processing,
    Results,
    FullResults,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisProgress {
    pub percent: u8,
    pub stage: Stage,
}

impl Default for AnalysisProgress {
    fn default() -> Self {
        Self {
            percent: 0,
            stage: Stage::Input,
        }
    }
}

impl AnalysisProgress {
    pub fn begin_processing(self) -> Self {
        match self.stage {
            Stage::Input => Self {
                percent: PROCESSING_START,
                stage: Stage::Processing,
            },
            _ => self,
        }
    }

    /// Advances the simulated analysis. No-op outside `Processing`.
    pub fn tick(self) -> Self {
        if self.stage != Stage::Processing {
            return self;
        }
        if self.percent < RESULTS_THRESHOLD {
            Self {
                percent: (self.percent + TICK_STEP).min(RESULTS_THRESHOLD),
                ..self
            }
        } else {
            Self {
                stage: Stage::Results,
                ..self
            }
        }
    }

    /// Payment is out of scope; unlocking is only a stage transition.
    pub fn unlock(self) -> Result<Self, AppError> {
        match self.stage {
            Stage::Results | Stage::FullResults => Ok(Self {
                stage: Stage::FullResults,
                ..self
            }),
            _ => Err(AppError::Conflict(
                "Results are not ready yet".to_string(),
            )),
        }
    }

    pub fn report(&self) -> Result<AnalysisReport, AppError> {
        match self.stage {
            Stage::Results => Ok(AnalysisReport::teaser()),
            Stage::FullResults => Ok(AnalysisReport::full()),
            _ => Err(AppError::Conflict(
                "Analysis is still in progress".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavingsItem {
    pub label: &'static str,
    pub annual_savings: &'static str,
    pub steps: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisReport {
    Teaser {
        estimated_savings: &'static str,
        tips: Vec<&'static str>,
    },
    Full {
        estimated_savings: &'static str,
        breakdown: Vec<SavingsItem>,
    },
}

impl AnalysisReport {
    pub fn teaser() -> Self {
        AnalysisReport::Teaser {
            estimated_savings: "$150 - $300 per year",
            tips: vec![
                "Switch to a time-of-use plan",
                "Improve home insulation",
                "Upgrade to energy-efficient appliances",
                "... and more!",
            ],
        }
    }

    pub fn full() -> Self {
        AnalysisReport::Full {
            estimated_savings: "$275 per year",
            breakdown: vec![
                SavingsItem {
                    label: "Switch to time-of-use plan",
                    annual_savings: "$120/year",
                    steps: vec![
                        "Contact PG&E at 1-800-743-5000",
                        "Request to switch to the E-TOU-C plan",
                        "Start shifting energy usage to off-peak hours (before 4pm and after 9pm)",
                    ],
                },
                SavingsItem {
                    label: "Improve home insulation",
                    annual_savings: "$80/year",
                    steps: vec![
                        "Schedule a home energy audit",
                        "Focus on attic insulation and sealing air leaks",
                        "Consider applying for PG&E's energy efficiency rebates",
                    ],
                },
                SavingsItem {
                    label: "Upgrade to energy-efficient appliances",
                    annual_savings: "$75/year",
                    steps: vec![
                        "Replace old refrigerator with ENERGY STAR certified model",
                        "Install a smart thermostat",
                        "Switch to LED light bulbs throughout your home",
                    ],
                },
            ],
        }
    }
}

/// A session's id next to its progress, as returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub id: Uuid,
    #[serde(flatten)]
    pub progress: AnalysisProgress,
}

/// Session-scoped progress store.
#[derive(Clone)]
pub struct ProgressStore {
    sessions: Cache<Uuid, AnalysisProgress>,
}

impl Default for ProgressStore {
    fn default() -> Self {
        Self::new(SESSION_TTL, 10_000)
    }
}

impl ProgressStore {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            sessions: Cache::builder()
                .time_to_idle(ttl)
                .max_capacity(capacity)
                .build(),
        }
    }

    /// Creates a session and moves it straight into processing.
    pub async fn start(&self) -> ProgressSnapshot {
        let id = Uuid::new_v4();
        let progress = AnalysisProgress::default().begin_processing();
        self.sessions.insert(id, progress).await;
        tracing::debug!("Analysis session {} started", id);
        ProgressSnapshot { id, progress }
    }

    pub async fn get(&self, id: Uuid) -> Result<AnalysisProgress, AppError> {
        self.sessions
            .get(&id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("Analysis session {} not found", id)))
    }

    pub async fn tick(&self, id: Uuid) -> Result<ProgressSnapshot, AppError> {
        self.update(id, |progress| Ok(progress.tick())).await
    }

    pub async fn unlock(&self, id: Uuid) -> Result<ProgressSnapshot, AppError> {
        self.update(id, AnalysisProgress::unlock).await
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), AppError> {
        match self.sessions.remove(&id).await {
            Some(_) => {
                tracing::debug!("Analysis session {} closed", id);
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "Analysis session {} not found",
                id
            ))),
        }
    }

    /// Applies `f` to a live session atomically; a removed session stays removed.
    async fn update<F>(&self, id: Uuid, f: F) -> Result<ProgressSnapshot, AppError>
    where
        F: FnOnce(AnalysisProgress) -> Result<AnalysisProgress, AppError>,
    {
        let mut rejected = None;
        let result = self
            .sessions
            .entry(id)
            .and_compute_with(|entry| {
                let op = match entry.map(|entry| f(entry.into_value())) {
                    Some(Ok(progress)) => Op::Put(progress),
                    Some(Err(err)) => {
                        rejected = Some(err);
                        Op::Nop
                    }
                    None => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;

        if let Some(err) = rejected {
            return Err(err);
        }
        match result {
            CompResult::Inserted(entry) | CompResult::ReplacedWith(entry) => Ok(ProgressSnapshot {
                id,
                progress: entry.into_value(),
            }),
            _ => Err(AppError::NotFound(format!(
                "Analysis session {} not found",
                id
            ))),
        }
    }
}
