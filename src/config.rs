// THEORY:
// `config` resolves the settings a run needs from three layers, weakest first:
// built-in defaults, an optional TOML file, and overrides from the command line.
//
// The file is named by `--config` or the `CENTROID_CONFIG` environment variable and
// has three optional tables: `[analysis]` (target color and threshold), `[output]`
// (results directory and frame rate) and `[jobs]` (how many jobs run at once). Unknown
// keys are rejected so a typo cannot silently fall back to a default. Every value is
// validated when the settings are built, so a bad color or threshold never reaches a
// running job.

use crate::core_modules::binarizer::{DEFAULT_THRESHOLD, Threshold};
use crate::core_modules::color::color::Color;
use crate::core_modules::frame_analyzer::AnalysisParams;
use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "CENTROID_CONFIG";

const DEFAULT_TARGET_COLOR: Color = Color::WHITE;
const DEFAULT_RESULTS_DIR: &str = "results";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    analysis: Option<AnalysisConfigFile>,
    output: Option<OutputConfigFile>,
    jobs: Option<JobsConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AnalysisConfigFile {
    target_color: Option<String>,
    threshold: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct OutputConfigFile {
    results_dir: Option<PathBuf>,
    frame_rate: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct JobsConfigFile {
    max_concurrent: Option<usize>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub analysis: AnalysisParams,
    pub results_dir: PathBuf,
    pub frame_rate: Option<f64>,
    pub max_concurrent_jobs: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            analysis: AnalysisParams::new(DEFAULT_TARGET_COLOR, DEFAULT_THRESHOLD),
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            frame_rate: None,
            max_concurrent_jobs: num_cpus::get().max(1),
        }
    }
}

impl Settings {
    /// Loads from `path` if given, else from `$CENTROID_CONFIG` if set, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&contents).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        Self::resolve(file)
    }

    fn resolve(file: ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let analysis = file.analysis.unwrap_or_default();
        let output = file.output.unwrap_or_default();
        let jobs = file.jobs.unwrap_or_default();

        let target = match analysis.target_color {
            Some(text) => Color::from_hex(&text)?,
            None => defaults.analysis.target,
        };
        let threshold = match analysis.threshold {
            Some(value) => Threshold::new(value)?,
            None => defaults.analysis.threshold,
        };

        let settings = Self {
            analysis: AnalysisParams::new(target, threshold),
            results_dir: output.results_dir.unwrap_or(defaults.results_dir),
            frame_rate: output.frame_rate,
            max_concurrent_jobs: jobs.max_concurrent.unwrap_or(defaults.max_concurrent_jobs),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_target_color(mut self, text: &str) -> Result<Self, ConfigError> {
        self.analysis.target = Color::from_hex(text)?;
        Ok(self)
    }

    pub fn with_threshold(mut self, value: f64) -> Result<Self, ConfigError> {
        self.analysis.threshold = Threshold::new(value)?;
        Ok(self)
    }

    pub fn with_frame_rate(mut self, fps: f64) -> Result<Self, ConfigError> {
        self.frame_rate = Some(fps);
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(fps) = self.frame_rate {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "frame_rate must be a positive number, got {fps}"
                )));
            }
        }
        if self.max_concurrent_jobs == 0 {
            return Err(ConfigError::Invalid(
                "jobs.max_concurrent must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.analysis.target, Color::WHITE);
        assert_eq!(settings.analysis.threshold.value(), 75.0);
        assert_eq!(settings.results_dir, PathBuf::from("results"));
        assert_eq!(settings.frame_rate, None);
        assert!(settings.max_concurrent_jobs >= 1);
    }

    #[test]
    fn full_file_is_applied() {
        let settings = Settings::from_toml(
            r##"
            [analysis]
            target_color = "#ff0000"
            threshold = 42.5

            [output]
            results_dir = "out/csv"
            frame_rate = 29.97

            [jobs]
            max_concurrent = 3
            "##,
        )
        .unwrap();
        assert_eq!(settings.analysis.target, Color::new(255, 0, 0));
        assert_eq!(settings.analysis.threshold.value(), 42.5);
        assert_eq!(settings.results_dir, PathBuf::from("out/csv"));
        assert_eq!(settings.frame_rate, Some(29.97));
        assert_eq!(settings.max_concurrent_jobs, 3);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cases = [
            "[analysis]\ntarget_color = \"#12\"",
            "[analysis]\nthreshold = -4.0",
            "[output]\nframe_rate = 0.0",
            "[jobs]\nmax_concurrent = 0",
        ];
        for case in cases {
            assert!(
                matches!(Settings::from_toml(case), Err(ConfigError::Invalid(_))),
                "{case}"
            );
        }
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        assert!(matches!(
            Settings::from_toml("[analysis]\ncolour = \"#ffffff\""),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn overrides_replace_file_values() {
        let settings = Settings::from_toml("[analysis]\nthreshold = 10.0")
            .unwrap()
            .with_threshold(20.0)
            .unwrap()
            .with_target_color("00ff00")
            .unwrap();
        assert_eq!(settings.analysis.threshold.value(), 20.0);
        assert_eq!(settings.analysis.target, Color::new(0, 255, 0));
        assert!(Settings::default().with_threshold(f64::NAN).is_err());
        assert!(Settings::default().with_frame_rate(-1.0).is_err());
    }

    #[test]
    fn from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("centroid.toml");
        std::fs::write(&path, "[analysis\n").unwrap();
        match Settings::from_file(&path) {
            Err(ConfigError::Parse { path: reported, .. }) => {
                assert!(reported.ends_with("centroid.toml"))
            }
            other => panic!("expected parse error, got {other:?}"),
        }
        assert!(matches!(
            Settings::from_file(&dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
