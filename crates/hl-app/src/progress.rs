//! Progress events emitted while a batch run executes.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    LoadingPlant,
    CheckingCache,
    LoadingCachedResult,
    Running,
    SavingResults,
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchProgress {
    pub sim_time_s: f64,
    pub t_end_s: f64,
    pub fraction_complete: f64,
    pub tick: u64,
    /// Ticks that reported at least one fault so far.
    pub faulty_ticks: u64,
    pub closure_error: f64,
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub batch: Option<BatchProgress>,
}

impl RunProgressEvent {
    pub fn stage(stage: RunStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
            batch: None,
        }
    }
}

impl RunStage {
    pub fn label(self) -> &'static str {
        match self {
            Self::LoadingPlant => "loading plant",
            Self::CheckingCache => "checking cache",
            Self::LoadingCachedResult => "loading cached result",
            Self::Running => "running",
            Self::SavingResults => "saving results",
            Self::Completed => "completed",
        }
    }
}
