#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    Streaming,
    FallingBack,
    Done,
    Failed,
}

impl CompletionState {
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionState::Streaming => "streaming",
            CompletionState::FallingBack => "falling_back",
            CompletionState::Done => "done",
            CompletionState::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CompletionState::Done | CompletionState::Failed)
    }
}

impl std::fmt::Display for CompletionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
