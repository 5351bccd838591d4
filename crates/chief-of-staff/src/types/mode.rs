//! Analysis depth selected per request

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// How deep the assistant should go on a single request
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// A few direct key points
    #[default]
    QuickTake,
    /// Full analysis with valuation, landscape and risks
    DeepDive,
    /// Bull/Base/Bear scenarios
    ScenarioAnalysis,
}

impl AnalysisMode {
    /// All modes in selector order
    pub const ALL: [AnalysisMode; 3] = [
        AnalysisMode::QuickTake,
        AnalysisMode::DeepDive,
        AnalysisMode::ScenarioAnalysis,
    ];

    /// Instruction appended after the user's message
    pub fn instruction(&self) -> &'static str {
        match self {
            AnalysisMode::QuickTake => {
                "\n\nProvide a quick, direct take (3-5 key points) on this."
            }
            AnalysisMode::DeepDive => {
                "\n\nProvide a comprehensive analysis with valuation, competitive landscape, risks, and clear recommendation."
            }
            AnalysisMode::ScenarioAnalysis => {
                "\n\nProvide Bull/Base/Bear scenarios with key assumptions and probability-weighted outcomes."
            }
        }
    }

    /// Label shown in the front-end
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisMode::QuickTake => "Quick Take",
            AnalysisMode::DeepDive => "Deep Dive",
            AnalysisMode::ScenarioAnalysis => "Scenario Analysis",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AnalysisMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        match key.as_str() {
            "quick" | "quicktake" => Ok(AnalysisMode::QuickTake),
            "deep" | "deepdive" => Ok(AnalysisMode::DeepDive),
            "scenario" | "scenarios" | "scenarioanalysis" => Ok(AnalysisMode::ScenarioAnalysis),
            _ => Err(Error::config(format!(
                "Unknown analysis mode '{}' (expected quick, deep or scenario)",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode_aliases() {
        assert_eq!("quick".parse::<AnalysisMode>().unwrap(), AnalysisMode::QuickTake);
        assert_eq!("Deep Dive".parse::<AnalysisMode>().unwrap(), AnalysisMode::DeepDive);
        assert_eq!(
            "scenario_analysis".parse::<AnalysisMode>().unwrap(),
            AnalysisMode::ScenarioAnalysis
        );
        assert!("sideways".parse::<AnalysisMode>().is_err());
    }

    #[test]
    fn test_instructions_are_suffixes() {
        for mode in AnalysisMode::ALL {
            assert!(mode.instruction().starts_with("\n\nProvide"));
        }
        assert_eq!(AnalysisMode::default(), AnalysisMode::QuickTake);
    }
}
