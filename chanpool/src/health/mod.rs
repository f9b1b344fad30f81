//! チャネルヘルスチェック
//!
//! プローブ（計測）、ポリシー（判定）、スイープ（全体実行の排他）、定期実行。

pub mod policy;
pub mod probe;
pub mod scheduler;
pub mod sweep;

pub use policy::{decide, Decision, DisablePolicy};
pub use probe::{ChannelProber, ProbeRequest};
pub use scheduler::SweepScheduler;
pub use sweep::{ChannelTestReport, SweepCoordinator, SweepHandle, SweepSummary};
