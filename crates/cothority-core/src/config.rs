//! Wall-clock budgets shared by every protocol's suspension points
//! (`spec.md` §5: "All are bounded by a per-protocol timeout").

use std::time::Duration;

/// Default wall-clock budget for crypto protocols (`spec.md` §5: "default
/// 10 min for crypto protocols").
pub const DEFAULT_PROTOCOL_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Default per-subtree budget for the collective signer (`spec.md` §5:
/// "5 s per-subtree for signing").
pub const DEFAULT_SIGNING_SUBTREE_TIMEOUT: Duration = Duration::from_secs(5);
