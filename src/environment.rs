//! Terminal detection for choosing between the wizard and batch mode

use std::io::IsTerminal;

/// Check if prompts can be shown
///
/// Returns `false` if stdin or stdout is not a terminal, or if `CI` is set.
pub fn is_interactive_terminal() -> bool {
    if std::env::var_os("CI").is_some() {
        return false;
    }
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}
