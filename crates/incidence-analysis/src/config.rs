//! Configuration loading and typed config structures for report builders.
//!
//! An analysis configuration names the variables, entity levels, and
//! thresholds each report uses. Every field has a default matching the
//! usual household income analysis, so an empty YAML document is a valid
//! configuration.

use std::borrow::Cow;
use std::path::Path;

use serde::{Deserialize, Serialize};

use incidence_microdata::{Bound, Filter};
use incidence_types::ProgrammeKind;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but its values are inconsistent.
    #[error("invalid analysis config: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level analysis configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Distributional impact settings.
    #[serde(default)]
    pub distribution: DistributionConfig,

    /// Inequality settings.
    #[serde(default)]
    pub inequality: InequalityConfig,

    /// Poverty settings.
    #[serde(default)]
    pub poverty: PovertyConfig,

    /// Budgetary impact settings.
    #[serde(default)]
    pub budget: BudgetConfig,
}

impl AnalysisConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that thresholds and counts are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.distribution.validate()
    }
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

/// Settings for [`crate::distributional_impact`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionConfig {
    /// Income variable whose change is measured.
    #[serde(default = "default_income_variable")]
    pub income_variable: String,

    /// Variable records are ranked by; the income variable when absent.
    #[serde(default)]
    pub ranking_variable: Option<String>,

    /// Entity level of the analysis.
    #[serde(default = "default_household")]
    pub entity: String,

    /// Number of rank buckets.
    #[serde(default = "default_bucket_count")]
    pub bucket_count: u32,

    /// Incomes below this are raised to it before computing percentage
    /// changes.
    #[serde(default = "default_income_floor")]
    pub income_floor: f64,

    /// Fractional change separating small from large gains and losses.
    #[serde(default = "default_small_change")]
    pub small_change: f64,

    /// Half-width of the band treated as no change.
    #[serde(default = "default_no_change_band")]
    pub no_change_band: f64,

    /// Per-record people count; when set, winner/loser shares and ranking
    /// weight each record by `weight * people`.
    #[serde(default)]
    pub people_variable: Option<String>,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            income_variable: default_income_variable(),
            ranking_variable: None,
            entity: default_household(),
            bucket_count: default_bucket_count(),
            income_floor: default_income_floor(),
            small_change: default_small_change(),
            no_change_band: default_no_change_band(),
            people_variable: None,
        }
    }
}

impl DistributionConfig {
    /// The variable records are ranked by.
    pub fn ranking_variable(&self) -> &str {
        self.ranking_variable
            .as_deref()
            .unwrap_or(&self.income_variable)
    }

    /// Check thresholds and bucket count.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let reason = if self.bucket_count == 0 {
            Some("distribution.bucket_count must be at least 1".to_owned())
        } else if self.income_floor.is_nan() || self.income_floor <= 0.0 {
            Some(format!(
                "distribution.income_floor must be positive, got {}",
                self.income_floor
            ))
        } else if self.no_change_band.is_nan() || self.no_change_band < 0.0 {
            Some(format!(
                "distribution.no_change_band must be non-negative, got {}",
                self.no_change_band
            ))
        } else if self.small_change.is_nan() || self.small_change < self.no_change_band {
            Some(format!(
                "distribution.small_change ({}) must not be below no_change_band ({})",
                self.small_change, self.no_change_band
            ))
        } else {
            None
        };
        reason.map_or(Ok(()), |reason| Err(ConfigError::Invalid { reason }))
    }
}

// ---------------------------------------------------------------------------
// Inequality
// ---------------------------------------------------------------------------

/// Settings for [`crate::inequality_impact`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InequalityConfig {
    /// Income variable measured.
    #[serde(default = "default_equivalised_income_variable")]
    pub income_variable: String,

    /// Entity level of the analysis.
    #[serde(default = "default_household")]
    pub entity: String,

    /// Per-record people count multiplying each weight.
    #[serde(default = "default_people_variable")]
    pub people_variable: Option<String>,

    /// Demographic restriction (for example one region).
    #[serde(default)]
    pub filter: Option<Filter>,
}

impl Default for InequalityConfig {
    fn default() -> Self {
        Self {
            income_variable: default_equivalised_income_variable(),
            entity: default_household(),
            people_variable: default_people_variable(),
            filter: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Poverty
// ---------------------------------------------------------------------------

/// A named demographic group for poverty counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PovertyGroup {
    /// Group label.
    pub name: String,
    /// Membership test on baseline values; everyone when absent.
    #[serde(default)]
    pub filter: Option<Filter>,
}

impl PovertyGroup {
    /// A group covering everyone.
    pub fn everyone(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filter: None,
        }
    }

    /// A group defined by a filter.
    pub fn filtered(name: impl Into<String>, filter: Filter) -> Self {
        Self {
            name: name.into(),
            filter: Some(filter),
        }
    }

    /// Everyone, then children (`age < 18`), working age
    /// (`18 <= age < 65`), and seniors (`age >= 65`) by `age_variable`.
    ///
    /// The age bands are half-open, so every record with a known age falls
    /// in exactly one of them.
    pub fn age_groups(age_variable: &str) -> Vec<Self> {
        vec![
            Self::everyone("all"),
            Self::filtered("child", Filter::threshold(age_variable, Bound::below(18.0))),
            Self::filtered(
                "working_age",
                Filter::threshold(age_variable, Bound::half_open(18.0, 65.0)),
            ),
            Self::filtered("senior", Filter::threshold(age_variable, Bound::at_least(65.0))),
        ]
    }
}

/// Settings for [`crate::poverty_impact`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PovertyConfig {
    /// Boolean poverty-status variable.
    #[serde(default = "default_poverty_variable")]
    pub poverty_variable: String,

    /// Boolean deep-poverty variable reported next to the poverty variable.
    #[serde(default)]
    pub deep_poverty_variable: Option<String>,

    /// Entity level people are counted at.
    #[serde(default = "default_person")]
    pub entity: String,

    /// Age variable behind the default age groups.
    #[serde(default = "default_age_variable")]
    pub age_variable: String,

    /// Groups reported, in order; the age groups over `age_variable` when
    /// absent.
    #[serde(default)]
    pub groups: Option<Vec<PovertyGroup>>,
}

impl PovertyConfig {
    /// The groups to report: the configured ones, or
    /// [`PovertyGroup::age_groups`] over the age variable.
    pub fn groups(&self) -> Cow<'_, [PovertyGroup]> {
        self.groups.as_deref().map_or_else(
            || Cow::Owned(PovertyGroup::age_groups(&self.age_variable)),
            Cow::Borrowed,
        )
    }
}

impl Default for PovertyConfig {
    fn default() -> Self {
        Self {
            poverty_variable: default_poverty_variable(),
            deep_poverty_variable: None,
            entity: default_person(),
            age_variable: default_age_variable(),
            groups: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Budget
// ---------------------------------------------------------------------------

/// A tax or benefit programme whose weighted total is compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Programme {
    /// Programme label.
    pub name: String,
    /// Variable summed.
    pub variable: String,
    /// Level to sum at; the variable's own level when absent.
    #[serde(default)]
    pub entity: Option<String>,
    /// Tax or benefit.
    pub kind: ProgrammeKind,
}

impl Programme {
    /// A programme summed at its variable's own level.
    pub fn new(name: impl Into<String>, variable: impl Into<String>, kind: ProgrammeKind) -> Self {
        Self {
            name: name.into(),
            variable: variable.into(),
            entity: None,
            kind,
        }
    }
}

/// Settings for [`crate::budgetary_impact`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Programmes reported, in order.
    #[serde(default = "default_programmes")]
    pub programmes: Vec<Programme>,

    /// Entity level whose weighted count is reported as the household
    /// population.
    #[serde(default = "default_household")]
    pub household_entity: String,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            programmes: default_programmes(),
            household_entity: default_household(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_income_variable() -> String {
    "household_net_income".to_owned()
}

fn default_equivalised_income_variable() -> String {
    "equiv_household_net_income".to_owned()
}

#[allow(clippy::unnecessary_wraps)]
fn default_people_variable() -> Option<String> {
    Some("household_count_people".to_owned())
}

fn default_poverty_variable() -> String {
    "in_poverty".to_owned()
}

fn default_household() -> String {
    "household".to_owned()
}

fn default_person() -> String {
    "person".to_owned()
}

const fn default_bucket_count() -> u32 {
    10
}

const fn default_income_floor() -> f64 {
    crate::distribution::INCOME_FLOOR
}

const fn default_small_change() -> f64 {
    0.05
}

const fn default_no_change_band() -> f64 {
    0.001
}

fn default_age_variable() -> String {
    "age".to_owned()
}

fn default_programmes() -> Vec<Programme> {
    vec![
        Programme::new("income_tax", "income_tax", ProgrammeKind::Tax),
        Programme::new("national_insurance", "national_insurance", ProgrammeKind::Tax),
        Programme::new("universal_credit", "universal_credit", ProgrammeKind::Benefit),
        Programme::new("child_benefit", "child_benefit", ProgrammeKind::Benefit),
        Programme::new("state_pension", "state_pension", ProgrammeKind::Benefit),
    ]
}
