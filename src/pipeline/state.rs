use crate::history::record::HistoryRecord;

/// Lifecycle of one creation.
///
/// `Idle -> Selecting -> Processing -> Ready -> Saving -> Saved`; every state returns to `Idle`
/// on reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Nothing (or only part of the selection) chosen yet.
    #[default]
    Idle,
    /// Photo and template both chosen.
    Selecting,
    /// A composition is in flight.
    Processing,
    /// A composed result is held and can be saved.
    Ready,
    /// The result is being persisted and recorded.
    Saving,
    /// The result was persisted and recorded.
    Saved,
}

impl PipelineState {
    /// Whether photo/template selection may change in this state.
    pub fn accepts_selection(self) -> bool {
        matches!(self, Self::Idle | Self::Selecting)
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Selecting => "selecting",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Saving => "saving",
            Self::Saved => "saved",
        };
        f.write_str(name)
    }
}

/// Read-only view of the coordinator.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct PipelineStatus {
    /// Current state.
    pub state: PipelineState,
    /// `true` while a composition is in flight.
    pub busy: bool,
    /// A user photo is selected.
    pub has_photo: bool,
    /// A template is selected.
    pub has_template: bool,
    /// Dimensions of the held result, if any.
    pub result_size: Option<(u32, u32)>,
}

/// Notifications emitted by the coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A composition finished and the result is ready to save.
    Processed {
        /// Result width.
        width: u32,
        /// Result height.
        height: u32,
    },
    /// A composition failed; the coordinator is back in its prior stable state.
    ProcessFailed {
        /// Rendered error.
        error: String,
    },
    /// The result was saved and recorded.
    Saved(HistoryRecord),
    /// Saving failed; the result is still held.
    SaveFailed {
        /// Rendered error.
        error: String,
    },
    /// In-flight work was cancelled while in `stage`.
    Cancelled {
        /// State the work was cancelled in.
        stage: PipelineState,
    },
    /// The session was reset to `Idle`.
    Reset,
}
