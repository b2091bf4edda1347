//! Output formatting and exit status mapping.

use debqueue_common::error::DebqueueError;
use debqueue_resolve::Resolution;

/// Formats each queued package as `name version`.
#[must_use]
pub fn queue_lines(resolution: &Resolution) -> Vec<String> {
    resolution
        .packages()
        .iter()
        .map(|package| match package.version() {
            Some(version) => format!("{} {version}", package.identifier()),
            None => package.identifier().to_owned(),
        })
        .collect()
}

/// Maps a command failure onto the process exit status.
///
/// Library errors carry their own status; anything else exits with 1.
#[must_use]
pub fn exit_status(err: &anyhow::Error) -> u8 {
    let code = err
        .downcast_ref::<DebqueueError>()
        .map_or(1, DebqueueError::exit_code);
    u8::try_from(code).unwrap_or(1)
}
