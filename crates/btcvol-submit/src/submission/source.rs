//! Entry-point source rewriting.

/// Import line the orchestrator runtime expects.
pub const CANONICAL_IMPORT: &str = "from btcvol.tracker import TrackerBase";

/// Shorthand import that is rewritten to [`CANONICAL_IMPORT`].
pub const ALTERNATE_IMPORT: &str = "from btcvol import TrackerBase";

const BASE_CLASS: &str = "TrackerBase";
const NUMPY_IMPORT: &str = "import numpy as np";
const NUMPY_USAGE: &str = "np.";
const MAIN_GUARD: &str = "if __name__";

/// Prepare model code for use as the submission entry point.
///
/// Fixes the tracker import, prepends imports the code relies on but does
/// not declare, and drops everything from the `if __name__` guard onwards.
#[must_use]
pub fn prepare_entry_point(code: &str) -> String {
    let code = fix_imports(code);
    strip_main_block(&code)
}

fn fix_imports(code: &str) -> String {
    let mut code = if code.contains(CANONICAL_IMPORT) {
        code.to_owned()
    } else {
        code.replace(ALTERNATE_IMPORT, CANONICAL_IMPORT)
    };

    let mut required = Vec::new();
    if code.contains(BASE_CLASS) && !code.contains(CANONICAL_IMPORT) {
        required.push(CANONICAL_IMPORT);
    }
    if code.contains(NUMPY_USAGE) && !code.contains(NUMPY_IMPORT) {
        required.push(NUMPY_IMPORT);
    }

    if !required.is_empty() {
        code = format!("{}\n\n\n{code}", required.join("\n"));
    }
    code
}

fn strip_main_block(code: &str) -> String {
    let lines: Vec<&str> = code.split('\n').collect();
    match lines
        .iter()
        .position(|line| line.trim().starts_with(MAIN_GUARD))
    {
        Some(guard) => lines[..guard].join("\n"),
        None => code.to_owned(),
    }
}
