/// Errors that can occur when creating validated score types.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScoreError {
    /// The value was NaN or infinite
    #[error("value must be a finite number")]
    NotFinite,
    /// A probability outside the closed interval [0, 1]
    #[error("probability must lie in [0, 1], got {0}")]
    ProbabilityOutOfRange(f64),
    /// A threshold outside the open interval (0, 1)
    #[error("threshold must lie strictly between 0 and 1, got {0}")]
    ThresholdOutOfRange(f64),
}

/// A probability guaranteed to be finite and within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Probability(f64);

impl Probability {
    /// Creates a new `Probability`, rejecting non-finite or out-of-range input.
    pub fn new(value: f64) -> Result<Self, ScoreError> {
        if !value.is_finite() {
            return Err(ScoreError::NotFinite);
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(ScoreError::ProbabilityOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Returns the raw value.
    pub fn value(self) -> f64 {
        self.0
    }

    /// The value rounded to four decimal places, as shown to API callers.
    pub fn rounded(self) -> f64 {
        (self.0 * 10_000.0).round() / 10_000.0
    }

    /// Percentage with one decimal place, from the unrounded value.
    ///
    /// `0.32446` becomes `"32.4%"` even though it displays as `0.3245`.
    pub fn as_percentage(self) -> String {
        format!("{:.1}%", self.0 * 100.0)
    }
}

impl std::fmt::Display for Probability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

impl serde::Serialize for Probability {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Probability {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v = f64::deserialize(deserializer)?;
        Probability::new(v).map_err(serde::de::Error::custom)
    }
}

/// Decision threshold guaranteed to lie strictly between 0 and 1.
///
/// A probability at or above the threshold is classified as positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Threshold(f64);

impl Threshold {
    /// Threshold used when the deployed model ships without one.
    pub const DEFAULT: Threshold = Threshold(0.40);

    /// Creates a new `Threshold`, rejecting values outside `(0, 1)`.
    pub fn new(value: f64) -> Result<Self, ScoreError> {
        if !value.is_finite() {
            return Err(ScoreError::NotFinite);
        }
        if value <= 0.0 || value >= 1.0 {
            return Err(ScoreError::ThresholdOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Returns the raw value.
    pub fn value(self) -> f64 {
        self.0
    }

    /// Returns `1` when `probability` meets the threshold, `0` otherwise.
    pub fn classify(self, probability: Probability) -> u8 {
        u8::from(probability.value() >= self.0)
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl serde::Serialize for Threshold {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Threshold {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v = f64::deserialize(deserializer)?;
        Threshold::new(v).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_rejects_out_of_range() {
        assert_eq!(
            Probability::new(1.5),
            Err(ScoreError::ProbabilityOutOfRange(1.5))
        );
        assert_eq!(Probability::new(f64::NAN), Err(ScoreError::NotFinite));
        assert!(Probability::new(0.0).is_ok());
        assert!(Probability::new(1.0).is_ok());
    }

    #[test]
    fn test_probability_display_formats() {
        let p = Probability::new(0.32446).unwrap();
        assert_eq!(p.as_percentage(), "32.4%");
        assert_eq!(p.rounded(), 0.3245);
        // 0.3245 * 100 is just above 32.45 in f64.
        assert_eq!(Probability::new(0.3245).unwrap().as_percentage(), "32.5%");
        assert_eq!(Probability::new(0.123456).unwrap().rounded(), 0.1235);
    }

    #[test]
    fn test_threshold_bounds_are_exclusive() {
        assert!(Threshold::new(0.0).is_err());
        assert!(Threshold::new(1.0).is_err());
        assert!(Threshold::new(0.4).is_ok());
    }

    #[test]
    fn test_threshold_classify_is_inclusive() {
        let t = Threshold::new(0.4).unwrap();
        assert_eq!(t.classify(Probability::new(0.4).unwrap()), 1);
        assert_eq!(t.classify(Probability::new(0.3999).unwrap()), 0);
        assert_eq!(t.classify(Probability::new(0.3245).unwrap()), 0);
    }

    #[test]
    fn test_threshold_deserialize_validates() {
        let t: Threshold = serde_json::from_str("0.35").unwrap();
        assert_eq!(t.value(), 0.35);
        assert!(serde_json::from_str::<Threshold>("1.2").is_err());
    }
}
