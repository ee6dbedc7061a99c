//! Model code extraction.
//!
//! Scripts pass through unchanged. Notebooks are reduced to their code cells,
//! minus cells that only make sense interactively: shell and magic commands,
//! package installs and local test runs.

use serde::Deserialize;
use tracing::debug;

use crate::error::{SubmitError, SubmitResult};
use crate::types::{ModelFile, ModelKind};

/// Substrings that mark a notebook cell as not part of the model.
const EXCLUDED_SNIPPETS: &[&str] = &["test_model_locally", "pip install", "# Test"];

/// Leading characters of shell and magic commands.
const MAGIC_PREFIXES: &[char] = &['%', '!'];

#[derive(Debug, Deserialize)]
struct Notebook {
    cells: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    cell_type: String,
    #[serde(default)]
    source: CellSource,
}

/// Notebook cell source: nbformat allows a list of lines or a single string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CellSource {
    Lines(Vec<String>),
    Text(String),
}

impl Default for CellSource {
    fn default() -> Self {
        Self::Lines(Vec::new())
    }
}

impl CellSource {
    fn into_code(self) -> String {
        match self {
            Self::Lines(lines) => lines.concat(),
            Self::Text(text) => text,
        }
    }
}

/// Return the code to ship for a validated model file.
pub fn extract_code(model: &ModelFile) -> SubmitResult<String> {
    match model.kind {
        ModelKind::Script => Ok(model.content.clone()),
        ModelKind::Notebook => {
            extract_notebook_code(&model.content).map_err(|source| SubmitError::NotebookParse {
                path: model.path.clone(),
                source,
            })
        }
    }
}

/// Concatenate the shippable code cells of a notebook document.
///
/// Kept cells are joined with a blank line, in notebook order.
pub fn extract_notebook_code(notebook_json: &str) -> Result<String, serde_json::Error> {
    let notebook: Notebook = serde_json::from_str(notebook_json)?;
    let total = notebook.cells.len();

    let kept: Vec<String> = notebook
        .cells
        .into_iter()
        .filter(|cell| cell.cell_type == "code")
        .map(|cell| cell.source.into_code())
        .filter(|code| is_model_code(code))
        .collect();

    debug!(total_cells = total, kept_cells = kept.len(), "extracted notebook code");

    Ok(kept.join("\n\n"))
}

fn is_model_code(code: &str) -> bool {
    let trimmed = code.trim();
    if trimmed.is_empty() || trimmed.starts_with(MAGIC_PREFIXES) {
        return false;
    }
    !EXCLUDED_SNIPPETS.iter().any(|snippet| code.contains(snippet))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn notebook(cells: serde_json::Value) -> String {
        json!({ "cells": cells, "metadata": {}, "nbformat": 4, "nbformat_minor": 5 }).to_string()
    }

    #[test]
    fn keeps_only_plain_model_code() {
        let doc = notebook(json!([
            { "cell_type": "code", "source": ["!pip install btcvol\n"] },
            { "cell_type": "code", "source": ["test_model_locally(MyTracker)\n"] },
            { "cell_type": "code", "source": ["class MyTracker(TrackerBase):\n", "    def predict(self):\n", "        return 1\n"] }
        ]));

        let code = extract_notebook_code(&doc).unwrap();
        assert_eq!(
            code,
            "class MyTracker(TrackerBase):\n    def predict(self):\n        return 1\n"
        );
    }

    #[test]
    fn drops_markdown_magic_and_empty_cells() {
        let doc = notebook(json!([
            { "cell_type": "markdown", "source": ["# Model\n"] },
            { "cell_type": "code", "source": ["%matplotlib inline"] },
            { "cell_type": "code", "source": ["   \n"] },
            { "cell_type": "code", "source": [] },
            { "cell_type": "code", "source": ["# Test the model\n", "run()"] },
            { "cell_type": "code", "source": ["import numpy as np"] },
            { "cell_type": "code", "source": ["x = np.zeros(3)"] }
        ]));

        let code = extract_notebook_code(&doc).unwrap();
        assert_eq!(code, "import numpy as np\n\nx = np.zeros(3)");
    }

    #[test]
    fn accepts_string_source() {
        let doc = notebook(json!([
            { "cell_type": "code", "source": "class T:\n    pass" }
        ]));

        assert_eq!(extract_notebook_code(&doc).unwrap(), "class T:\n    pass");
    }

    #[test]
    fn cell_without_source_is_skipped() {
        let doc = notebook(json!([{ "cell_type": "code" }]));
        assert_eq!(extract_notebook_code(&doc).unwrap(), "");
    }

    #[test]
    fn missing_cells_key_is_an_error() {
        assert!(extract_notebook_code(r#"{"metadata": {}}"#).is_err());
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(extract_notebook_code("not json").is_err());
    }

    #[test]
    fn notebook_error_carries_path() {
        let model = ModelFile {
            path: PathBuf::from("broken.ipynb"),
            kind: ModelKind::Notebook,
            content: "{".to_owned(),
        };

        let err = extract_code(&model).unwrap_err();
        assert!(matches!(err, SubmitError::NotebookParse { ref path, .. } if path == &PathBuf::from("broken.ipynb")));
    }

    #[test]
    fn script_passes_through() {
        let model = ModelFile {
            path: PathBuf::from("model.py"),
            kind: ModelKind::Script,
            content: "%not magic in a script\n".to_owned(),
        };

        assert_eq!(extract_code(&model).unwrap(), "%not magic in a script\n");
    }
}
