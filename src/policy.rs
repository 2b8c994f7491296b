//! Auto-update decision.

use std::collections::BTreeSet;

use crate::settings::AutoUpdateMode;
use crate::types::CheckOutcome;

/// Decide whether an update should be dispatched for `container_name`.
///
/// Local images and containers without an available update are never
/// updated; otherwise `mode` and the allow-list decide.
pub fn should_update(
    mode: AutoUpdateMode,
    allow_list: &BTreeSet<String>,
    container_name: &str,
    outcome: &CheckOutcome,
) -> bool {
    if outcome.is_local || !outcome.update_available {
        return false;
    }
    match mode {
        AutoUpdateMode::All => true,
        AutoUpdateMode::Selected => allow_list.contains(container_name),
        AutoUpdateMode::Off => false,
    }
}
