use serde::{Deserialize, Serialize};

/// Fine-grained column annotations that steer the preprocessors and the
/// predictor column selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subrole {
    #[serde(rename = "exclude predictors")]
    ExcludePredictors,
    #[serde(rename = "exclude preprocessors")]
    ExcludePreprocessors,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "email only")]
    EmailOnly,
    #[serde(rename = "substring only")]
    SubstringOnly,
    #[serde(rename = "exclude seasonal")]
    ExcludeSeasonal,
}

/// Whether `subroles` contains any of the subroles in `any_of`.
pub fn contains_any(subroles: &[Subrole], any_of: &[Subrole]) -> bool {
    subroles.iter().any(|s| any_of.contains(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_any() {
        let subroles = vec![Subrole::Email, Subrole::ExcludeSeasonal];
        assert!(contains_any(&subroles, &[Subrole::Email]));
        assert!(!contains_any(&subroles, &[Subrole::SubstringOnly]));
        assert!(!contains_any(&[], &[Subrole::Email]));
    }
}
