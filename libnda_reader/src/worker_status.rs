/// What a worker is currently doing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Decoding,
    Merging,
    Analyzing,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decoding => write!(f, "Decoding"),
            Self::Merging => write!(f, "Merging"),
            Self::Analyzing => write!(f, "Analyzing"),
            Self::Done => write!(f, "Done"),
        }
    }
}

/// Progress message sent from a worker to the UI
#[derive(Debug, Clone, Default)]
pub struct WorkerStatus {
    pub progress: f32,
    /// Index in the config's file list of the file last handled
    pub file_index: usize,
    pub worker_id: usize,
    pub stage: Stage,
}

impl WorkerStatus {
    pub fn new(progress: f32, file_index: usize, worker_id: usize, stage: Stage) -> Self {
        Self {
            progress,
            file_index,
            worker_id,
            stage,
        }
    }
}
