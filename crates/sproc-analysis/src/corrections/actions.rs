//! Applying correction actions.

use sproc_core::errors::CorrectionError;

use super::types::CorrectionAction;

/// Apply `actions`.
///
/// A dry run logs what would be done, previewing the first `preview_limit`
/// actions, and returns the number of actions. Applying for real is not
/// supported: it changes nothing and returns `NotImplemented`.
pub fn apply(actions: &[CorrectionAction], dry_run: bool, preview_limit: usize) -> Result<usize, CorrectionError> {
    if !dry_run {
        tracing::warn!(actions = actions.len(), "applying correction actions is not implemented");
        return Err(CorrectionError::NotImplemented { actions: actions.len() });
    }

    tracing::info!("DRY RUN: Would apply {} correction actions", actions.len());
    for action in actions.iter().take(preview_limit) {
        tracing::info!(
            priority = action.priority,
            manual_review = action.requires_manual_review,
            "DRY RUN Action: {} - {}",
            action.kind,
            action.description
        );
    }
    Ok(actions.len())
}
