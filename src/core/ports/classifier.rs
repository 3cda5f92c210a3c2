use crate::core::analysis::keywords::Condition;
use crate::core::error::DynError;

#[derive(Debug, Clone, PartialEq)]
pub struct ImageVerdict {
    pub condition: Condition,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub name: String,
}

pub trait ImageClassifierPort: Send + Sync {
    fn classify(&self, image: &[u8]) -> Result<ImageVerdict, DynError>;
}
