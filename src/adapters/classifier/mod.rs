use crate::core::analysis::Condition;
use crate::core::error::DynError;
use crate::core::ports::classifier::{ImageClassifierPort, ImageVerdict};

const CONFIDENCE_BASE: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelFeatures {
    pub avg_r: f64,
    pub avg_g: f64,
    pub avg_b: f64,
    pub std_r: f64,
    pub std_g: f64,
    pub std_b: f64,
    /// Variance over every channel value of every pixel.
    pub variance: f64,
}

impl PixelFeatures {
    pub fn has_red(&self) -> bool {
        self.avg_r > self.avg_g && self.avg_r > self.avg_b
    }

    pub fn has_brown(&self) -> bool {
        self.avg_r > self.avg_g && self.avg_g > self.avg_b
    }

    pub fn has_purple(&self) -> bool {
        self.avg_r > self.avg_b && self.avg_b > self.avg_g
    }

    pub fn from_rgb(pixels: &[[u8; 3]]) -> Option<Self> {
        if pixels.is_empty() {
            return None;
        }
        let n = pixels.len() as f64;

        let mut sums = [0.0_f64; 3];
        for pixel in pixels {
            for (sum, value) in sums.iter_mut().zip(pixel) {
                *sum += f64::from(*value);
            }
        }
        let means = sums.map(|sum| sum / n);

        let mut squared = [0.0_f64; 3];
        for pixel in pixels {
            for ((acc, value), mean) in squared.iter_mut().zip(pixel).zip(means) {
                let delta = f64::from(*value) - mean;
                *acc += delta * delta;
            }
        }
        let channel_variance = squared.map(|acc| acc / n);

        let overall_mean = means.iter().sum::<f64>() / 3.0;
        let overall_squares: f64 = pixels
            .iter()
            .flat_map(|pixel| pixel.iter())
            .map(|value| {
                let delta = f64::from(*value) - overall_mean;
                delta * delta
            })
            .sum();

        Some(Self {
            avg_r: means[0],
            avg_g: means[1],
            avg_b: means[2],
            std_r: channel_variance[0].sqrt(),
            std_g: channel_variance[1].sqrt(),
            std_b: channel_variance[2].sqrt(),
            variance: overall_squares / (n * 3.0),
        })
    }
}

/// Threshold rules over colour averages and spread.
pub fn score_features(features: &PixelFeatures) -> ImageVerdict {
    let mut scores = [0.0_f64; 7];
    let mut add = |condition: Condition, amount: f64| {
        if let Some(slot) = Condition::KNOWN.iter().position(|c| *c == condition) {
            scores[slot] += amount;
        }
    };

    if features.has_red() && features.avg_r > 150.0 {
        add(Condition::Vasc, 0.3);
        add(Condition::Bcc, 0.2);
    }
    if features.has_brown() {
        add(Condition::Nv, 0.25);
        add(Condition::Bkl, 0.25);
        add(Condition::Mel, 0.15);
    }
    if features.has_purple() {
        add(Condition::Mel, 0.3);
        add(Condition::Vasc, 0.2);
    }
    if features.variance > 3000.0 {
        add(Condition::Mel, 0.2);
        add(Condition::Bcc, 0.15);
    }
    if features.std_r > 50.0 {
        add(Condition::Akiec, 0.2);
        add(Condition::Bcc, 0.15);
    }

    let mut best = 0;
    for (slot, score) in scores.iter().enumerate() {
        if *score > scores[best] {
            best = slot;
        }
    }
    let condition = Condition::KNOWN[best];

    ImageVerdict {
        condition,
        confidence: (scores[best] + CONFIDENCE_BASE).clamp(0.0, 1.0),
        name: condition.display_name().to_string(),
    }
}

fn unreadable_verdict() -> ImageVerdict {
    ImageVerdict {
        condition: Condition::Unknown,
        confidence: 0.0,
        name: "Unable to process image".to_string(),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PixelStatsClassifier;

impl PixelStatsClassifier {
    pub fn extract_features(&self, image: &[u8]) -> Result<PixelFeatures, DynError> {
        let decoded = image::load_from_memory(image)?.to_rgb8();
        let pixels: Vec<[u8; 3]> = decoded.pixels().map(|pixel| pixel.0).collect();
        PixelFeatures::from_rgb(&pixels).ok_or_else(|| "image has no pixels".into())
    }

    /// Never fails: undecodable input reports `unknown` with zero confidence.
    pub fn classify_or_unknown(&self, image: &[u8]) -> ImageVerdict {
        self.classify(image).unwrap_or_else(|error| {
            log::debug!("image features unavailable: {}", error);
            unreadable_verdict()
        })
    }
}

impl ImageClassifierPort for PixelStatsClassifier {
    fn classify(&self, image: &[u8]) -> Result<ImageVerdict, DynError> {
        let features = self.extract_features(image)?;
        Ok(score_features(&features))
    }
}
