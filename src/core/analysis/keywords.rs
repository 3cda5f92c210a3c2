use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Skin-condition labels. Declaration order is the canonical tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Akiec,
    Bcc,
    Bkl,
    Df,
    Mel,
    Nv,
    Vasc,
    Unknown,
}

impl Condition {
    pub const KNOWN: [Condition; 7] = [
        Condition::Akiec,
        Condition::Bcc,
        Condition::Bkl,
        Condition::Df,
        Condition::Mel,
        Condition::Nv,
        Condition::Vasc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Akiec => "akiec",
            Condition::Bcc => "bcc",
            Condition::Bkl => "bkl",
            Condition::Df => "df",
            Condition::Mel => "mel",
            Condition::Nv => "nv",
            Condition::Vasc => "vasc",
            Condition::Unknown => "unknown",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Condition::Akiec => "Actinic Keratosis (Pre-cancerous)",
            Condition::Bcc => "Basal Cell Carcinoma",
            Condition::Bkl => "Benign Keratosis",
            Condition::Df => "Dermatofibroma",
            Condition::Mel => "Melanoma",
            Condition::Nv => "Melanocytic Nevus (Mole)",
            Condition::Vasc => "Vascular Lesion",
            Condition::Unknown => "Unknown - Please consult a dermatologist",
        }
    }

    pub fn is_known(self) -> bool {
        self != Condition::Unknown
    }

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Condition::Akiec => &[
                "scaly",
                "rough",
                "dry patch",
                "crust",
                "crusty",
                "sun damaged",
                "pink patch",
                "red patch",
                "sandpaper",
                "photo damage",
                "thin plate",
                "precancer",
                "precancerous",
            ],
            Condition::Bcc => &[
                "pearly",
                "translucent",
                "shiny bump",
                "rolled edges",
                "rolled border",
                "bleeds",
                "bleeding",
                "sore that doesn't heal",
                "open sore",
                "small bump",
                "pink bump",
                "waxy",
                "ulcer",
                "rodent ulcer",
                "visible blood vessels",
                "telangiectasia",
            ],
            Condition::Bkl => &[
                "stuck on",
                "warty",
                "wart like",
                "seborrheic",
                "brown spot",
                "flat brown",
                "age spot",
                "sun spot",
                "liver spot",
                "rough spot",
                "well defined",
                "light brown",
                "dark brown",
                "keratosis",
                "non cancerous growth",
            ],
            Condition::Df => &[
                "firm bump",
                "hard bump",
                "dimple",
                "dimple sign",
                "small nodule",
                "brown nodule",
                "round bump",
                "insect bite like",
                "itchy nodule",
                "smooth dome",
                "fibrous bump",
            ],
            Condition::Mel => &[
                "irregular",
                "asymmetry",
                "uneven border",
                "changing",
                "evolving",
                "multiple colors",
                "dark brown",
                "black patch",
                "bleeds",
                "enlarging",
                "growing quickly",
                "itchy mole",
                "new mole",
                "abnormal mole",
                "abcde",
                "color variation",
                "spreading",
                "large spot",
            ],
            Condition::Nv => &[
                "mole",
                "brown mole",
                "flat mole",
                "raised mole",
                "uniform color",
                "symmetrical mole",
                "birthmark",
                "benign mole",
                "tan spot",
                "small brown spot",
                "regular borders",
                "smooth edges",
                "harmless mole",
            ],
            Condition::Vasc => &[
                "red spot",
                "purple spot",
                "blood spot",
                "cherry",
                "angioma",
                "bright red bump",
                "bleeds easily",
                "hemorrhage",
                "red papule",
                "angiokeratoma",
                "vascular lesion",
                "blue spot",
                "red nodule",
                "pyogenic granuloma",
            ],
            Condition::Unknown => &[],
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub condition: Condition,
    pub name: String,
    pub score: u32,
    pub matched_keywords: Vec<String>,
    pub all_scores: BTreeMap<Condition, u32>,
}

/// Scores `text` against every condition's keyword list.
pub fn match_text(text: &str) -> MatchResult {
    let normalized = text.to_lowercase();

    let mut all_scores = BTreeMap::new();
    let mut best: Option<(Condition, u32, Vec<String>)> = None;

    for condition in Condition::KNOWN {
        let matched: Vec<String> = condition
            .keywords()
            .iter()
            .filter(|keyword| normalized.contains(*keyword))
            .map(|keyword| keyword.to_string())
            .collect();
        let score = matched.len() as u32;
        all_scores.insert(condition, score);

        let beats_best = match &best {
            Some((_, best_score, _)) => score > *best_score,
            None => true,
        };
        if beats_best {
            best = Some((condition, score, matched));
        }
    }

    match best {
        Some((condition, score, matched_keywords)) if score > 0 => MatchResult {
            condition,
            name: condition.display_name().to_string(),
            score,
            matched_keywords,
            all_scores,
        },
        _ => MatchResult {
            condition: Condition::Unknown,
            name: Condition::Unknown.display_name().to_string(),
            score: 0,
            matched_keywords: Vec::new(),
            all_scores,
        },
    }
}
