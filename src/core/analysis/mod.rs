pub mod care;
pub mod keywords;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::ports::classifier::{ImageClassifierPort, ImageVerdict};

pub use care::{care_guide, CareGuide};
pub use keywords::{match_text, Condition, MatchResult};

/// Keyword analyses carry an integer match count, image analyses a confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisScore {
    Matches(u32),
    Confidence(f64),
}

/// Snapshot of a matcher result, attached to the user message it was computed for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub condition: Condition,
    pub name: String,
    pub score: AnalysisScore,
    #[serde(default)]
    pub matched_keywords: Vec<String>,
    #[serde(default)]
    pub all_scores: BTreeMap<Condition, u32>,
}

impl From<MatchResult> for Analysis {
    fn from(result: MatchResult) -> Self {
        Self {
            condition: result.condition,
            name: result.name,
            score: AnalysisScore::Matches(result.score),
            matched_keywords: result.matched_keywords,
            all_scores: result.all_scores,
        }
    }
}

impl From<ImageVerdict> for Analysis {
    fn from(verdict: ImageVerdict) -> Self {
        Self {
            condition: verdict.condition,
            name: verdict.name,
            score: AnalysisScore::Confidence(verdict.confidence),
            matched_keywords: Vec::new(),
            all_scores: BTreeMap::new(),
        }
    }
}

/// Image verdict wins when it names a condition; otherwise fall back to the
/// keyword matcher. `None` when neither recognises anything.
pub fn analyze_user_message(
    text: &str,
    image: Option<&[u8]>,
    classifier: &dyn ImageClassifierPort,
) -> Option<Analysis> {
    if let Some(bytes) = image {
        match classifier.classify(bytes) {
            Ok(verdict) if verdict.condition.is_known() => return Some(verdict.into()),
            Ok(_) => {}
            Err(error) => log::debug!("image classification unavailable: {}", error),
        }
    }

    let result = match_text(text);
    result.condition.is_known().then(|| result.into())
}

#[cfg(test)]
mod tests {
    use super::{analyze_user_message, AnalysisScore, Condition};
    use crate::core::error::DynError;
    use crate::core::ports::classifier::{ImageClassifierPort, ImageVerdict};

    struct FixedClassifier(Option<Condition>);

    impl ImageClassifierPort for FixedClassifier {
        fn classify(&self, _image: &[u8]) -> Result<ImageVerdict, DynError> {
            match self.0 {
                Some(condition) => Ok(ImageVerdict {
                    condition,
                    confidence: 0.65,
                    name: condition.display_name().to_string(),
                }),
                None => Err("cannot decode".into()),
            }
        }
    }

    #[test]
    fn image_verdict_takes_precedence() {
        let classifier = FixedClassifier(Some(Condition::Vasc));
        let analysis = analyze_user_message("a pearly bump", Some(b"png"), &classifier)
            .expect("image analysis");
        assert_eq!(analysis.condition, Condition::Vasc);
        assert_eq!(analysis.score, AnalysisScore::Confidence(0.65));
        assert!(analysis.matched_keywords.is_empty());
        assert!(analysis.all_scores.is_empty());
    }

    #[test]
    fn classifier_failure_falls_back_to_keywords() {
        let classifier = FixedClassifier(None);
        let analysis = analyze_user_message("a pearly bump", Some(b"junk"), &classifier)
            .expect("keyword analysis");
        assert_eq!(analysis.condition, Condition::Bcc);
        assert_eq!(analysis.score, AnalysisScore::Matches(1));
    }

    #[test]
    fn unknown_image_and_text_attach_nothing() {
        let classifier = FixedClassifier(Some(Condition::Unknown));
        assert!(analyze_user_message("hello there", Some(b"png"), &classifier).is_none());
        assert!(analyze_user_message("hello there", None, &classifier).is_none());
    }

    #[test]
    fn score_serializes_as_integer_or_float() {
        let classifier = FixedClassifier(None);
        let analysis =
            analyze_user_message("scaly and rough", None, &classifier).expect("analysis");
        let value = serde_json::to_value(&analysis).expect("serialize");
        assert_eq!(value["score"], serde_json::json!(2));

        let parsed: super::Analysis = serde_json::from_value(serde_json::json!({
            "condition": "mel",
            "name": "Melanoma",
            "score": 0.7,
            "matched_keywords": [],
            "all_scores": {}
        }))
        .expect("parse image analysis");
        assert_eq!(parsed.score, AnalysisScore::Confidence(0.7));
    }
}
