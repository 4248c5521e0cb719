//! FactBot Classifiers
//!
//! LLM-backed classification for chat moderation.
//!
//! Messages pass through two few-shot stages:
//! - Validity: is the message a readable, non-abusive statement?
//! - Accuracy: does the statement contain misinformation?
//!
//! Each stage keeps its own conversation context, which grows with live
//! traffic and is periodically reloaded from its seed. The
//! [`QuiescenceGate`] makes those reloads wait for in-flight calls to drain
//! without serializing ordinary classification traffic.

pub mod chain;
pub mod gate;
pub mod profile;
pub mod settings;
pub mod stage;

pub use chain::StageChain;
pub use gate::{Admission, GateStatus, QuiescenceGate, ResetOutcome};
pub use profile::{StageKind, StageProfile, TagKeyword};
pub use settings::{StageSettings, StagesConfig};
pub use stage::ClassificationStage;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::chain::StageChain;
    pub use crate::gate::{QuiescenceGate, ResetOutcome};
    pub use crate::profile::{StageKind, StageProfile};
    pub use crate::settings::StageSettings;
    pub use crate::stage::ClassificationStage;
}
