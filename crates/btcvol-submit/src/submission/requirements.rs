//! Dependency manifest generation.

use std::collections::BTreeSet;

/// Known libraries: the import that reveals them and the pinned requirement.
const KNOWN_LIBRARIES: &[(&str, &str)] = &[
    ("import numpy", "numpy>=1.24.0"),
    ("import pandas", "pandas>=2.0.0"),
    ("import scipy", "scipy>=1.10.0"),
    ("import sklearn", "scikit-learn>=1.3.0"),
];

/// Requirement used when no known library is detected.
pub const BASELINE_REQUIREMENT: &str = "numpy>=1.24.0";

/// Detect the pinned requirements a piece of model code needs, sorted.
#[must_use]
pub fn detect_requirements(code: &str) -> Vec<&'static str> {
    let mut deps: BTreeSet<&'static str> = KNOWN_LIBRARIES
        .iter()
        .filter(|(import, _)| code.contains(import))
        .map(|(_, requirement)| *requirement)
        .collect();

    if deps.is_empty() {
        deps.insert(BASELINE_REQUIREMENT);
    }
    deps.into_iter().collect()
}

/// Render requirements as a `requirements.txt` body.
#[must_use]
pub fn render(requirements: &[&str]) -> String {
    format!("{}\n", requirements.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_numpy() {
        assert_eq!(detect_requirements("x = 1"), vec!["numpy>=1.24.0"]);
    }

    #[test]
    fn detects_and_sorts() {
        let code = "import scipy.stats\nimport pandas as pd\nfrom sklearn import linear_model\nimport sklearn\n";
        assert_eq!(
            detect_requirements(code),
            vec!["pandas>=2.0.0", "scikit-learn>=1.3.0", "scipy>=1.10.0"]
        );
    }

    #[test]
    fn from_imports_are_not_detected() {
        assert_eq!(
            detect_requirements("from pandas import DataFrame"),
            vec![BASELINE_REQUIREMENT]
        );
    }

    #[test]
    fn render_ends_with_newline() {
        assert_eq!(
            render(&["numpy>=1.24.0", "pandas>=2.0.0"]),
            "numpy>=1.24.0\npandas>=2.0.0\n"
        );
    }
}
