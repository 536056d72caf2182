use crate::model::GenerationParams;
use std::{fmt, str::FromStr};

/// Deployment-wide choice of generation defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Profile {
    /// Slower, longer summaries: 4 beams over up to 1024 input tokens.
    #[default]
    Quality,
    /// Cheaper summaries: 2 beams over up to 512 input tokens.
    Fast,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Quality => "quality",
            Profile::Fast => "fast",
        }
    }

    pub fn settings(&self) -> ProfileSettings {
        match self {
            Profile::Quality => ProfileSettings {
                max_length: 130,
                min_length: 30,
                truncation_limit: 1024,
                num_beams: 4,
                length_penalty: 2.0,
            },
            Profile::Fast => ProfileSettings {
                max_length: 100,
                min_length: 20,
                truncation_limit: 512,
                num_beams: 2,
                length_penalty: 1.5,
            },
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown profile '{0}', expected 'quality' or 'fast'")]
pub struct UnknownProfile(String);

impl FromStr for Profile {
    type Err = UnknownProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quality" => Ok(Profile::Quality),
            "fast" => Ok(Profile::Fast),
            _ => Err(UnknownProfile(s.to_string())),
        }
    }
}

/// The fixed numbers behind a [`Profile`].
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileSettings {
    pub max_length: usize,
    pub min_length: usize,
    pub truncation_limit: usize,
    pub num_beams: usize,
    pub length_penalty: f32,
}

/// Caller-supplied length overrides, shared by every item of a batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LengthOverrides {
    pub max_length: Option<usize>,
    pub min_length: Option<usize>,
}

/// Everything the pipeline needs to summarize one text.
#[derive(Clone, Debug, PartialEq)]
pub struct SummarizeConfig {
    pub truncation_limit: usize,
    pub generation: GenerationParams,
}

impl ProfileSettings {
    /// Applies per-request overrides on top of the profile defaults.
    ///
    /// `min_length > max_length` is passed through untouched.
    pub fn resolve(&self, overrides: LengthOverrides) -> SummarizeConfig {
        SummarizeConfig {
            truncation_limit: self.truncation_limit,
            generation: GenerationParams {
                max_length: overrides.max_length.unwrap_or(self.max_length),
                min_length: overrides.min_length.unwrap_or(self.min_length),
                num_beams: self.num_beams,
                length_penalty: self.length_penalty,
                early_stopping: true,
                deterministic: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_is_the_default_profile() {
        let settings = Profile::default().settings();
        assert_eq!(settings.max_length, 130);
        assert_eq!(settings.min_length, 30);
        assert_eq!(settings.truncation_limit, 1024);
        assert_eq!(settings.num_beams, 4);
        assert_eq!(settings.length_penalty, 2.0);
    }

    #[test]
    fn fast_profile_numbers() {
        let settings = Profile::Fast.settings();
        assert_eq!(settings.max_length, 100);
        assert_eq!(settings.min_length, 20);
        assert_eq!(settings.truncation_limit, 512);
        assert_eq!(settings.num_beams, 2);
        assert_eq!(settings.length_penalty, 1.5);
    }

    #[test]
    fn parses_profile_names_case_insensitively() {
        assert_eq!("quality".parse::<Profile>().unwrap(), Profile::Quality);
        assert_eq!(" FAST ".parse::<Profile>().unwrap(), Profile::Fast);
        assert!("turbo".parse::<Profile>().is_err());
    }

    #[test]
    fn overrides_replace_only_lengths() {
        let config = Profile::Fast.settings().resolve(LengthOverrides {
            max_length: Some(60),
            min_length: None,
        });
        assert_eq!(config.generation.max_length, 60);
        assert_eq!(config.generation.min_length, 20);
        assert_eq!(config.generation.num_beams, 2);
        assert_eq!(config.truncation_limit, 512);
        assert!(config.generation.early_stopping);
        assert!(config.generation.deterministic);
    }

    #[test]
    fn inverted_lengths_are_not_corrected() {
        let config = Profile::Quality.settings().resolve(LengthOverrides {
            max_length: Some(10),
            min_length: Some(50),
        });
        assert_eq!(config.generation.max_length, 10);
        assert_eq!(config.generation.min_length, 50);
    }
}
