use serde::{Deserialize, Serialize};

use super::executor::{DeletionTarget, ExecutionResult, Executor, SkipReason, SkippedItem};
use crate::apps::bundle::AppBundle;
use crate::apps::resolver::RelatedFile;

/// Outcome of removing an application and its related files.
///
/// The two phases are reported independently; a failed bundle removal does
/// not stop related files from being attempted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UninstallResult {
    pub app_name: String,
    pub bundle: ExecutionResult,
    pub related: ExecutionResult,
}

impl UninstallResult {
    pub fn bytes_freed(&self) -> u64 {
        self.bundle.bytes_freed + self.related.bytes_freed
    }

    pub fn is_clean(&self) -> bool {
        self.bundle.is_clean() && self.related.is_clean()
    }
}

/// Remove `bundle` first, then each of `related`.
///
/// OS-vendor apps and running apps are skipped entirely. Related files in
/// system-wide locations are reported but never removed.
pub fn uninstall(
    executor: &Executor,
    bundle: &AppBundle,
    related: &[RelatedFile],
    simulate: bool,
) -> UninstallResult {
    let app_target = DeletionTarget {
        path: bundle.path.clone(),
        size: bundle.size,
        safety: executor.policy().classify(&bundle.path),
        label: bundle.display_name().to_string(),
    };
    let related_targets: Vec<DeletionTarget> = related.iter().map(DeletionTarget::from).collect();

    let refusal = if bundle.is_system_app() {
        Some(SkipReason::SystemApp)
    } else if executor.policy().running_inside(&bundle.path).is_some() {
        Some(SkipReason::AppRunning)
    } else {
        None
    };

    if let Some(reason) = refusal {
        tracing::info!(app = %bundle.display_name(), %reason, "uninstall skipped");
        return UninstallResult {
            app_name: bundle.display_name().to_string(),
            bundle: ExecutionResult::all_skipped([&app_target], reason.clone(), simulate),
            related: ExecutionResult::all_skipped(&related_targets, reason, simulate),
        };
    }

    let bundle_result = executor.execute(std::slice::from_ref(&app_target), simulate);
    if !bundle_result.is_clean() {
        tracing::warn!(app = %bundle.display_name(), "bundle removal failed; continuing with related files");
    }

    let (system_owned, removable): (Vec<_>, Vec<_>) = related
        .iter()
        .zip(related_targets)
        .partition(|(file, _)| file.system_owned);

    let removable: Vec<DeletionTarget> = removable.into_iter().map(|(_, t)| t).collect();
    let kept: Vec<SkippedItem> = system_owned
        .into_iter()
        .map(|(file, _)| SkippedItem {
            path: file.path.clone(),
            reason: SkipReason::SystemOwned,
        })
        .collect();
    let related_result = executor.execute_with_skips(&removable, kept, simulate);

    UninstallResult {
        app_name: bundle.display_name().to_string(),
        bundle: bundle_result,
        related: related_result,
    }
}
