//! Validity → accuracy chain with early exit

use crate::profile::StageKind;
use crate::stage::ClassificationStage;
use factbot_core::{Verdict, VerdictTag};
use tracing::debug;

/// Two stages run in order.
///
/// Validity runs first. A timeout or a structural rejection
/// (`Ungrammatical`, `Harmful`) is returned as is and the accuracy stage is
/// never called. `Grammatical` and `Unsure` hand the text on to accuracy,
/// whose verdict is the result.
pub struct StageChain {
    validity: ClassificationStage,
    accuracy: ClassificationStage,
}

impl StageChain {
    /// Create a chain from its two stages
    pub fn new(validity: ClassificationStage, accuracy: ClassificationStage) -> Self {
        debug_assert_eq!(validity.kind(), StageKind::Validity);
        debug_assert_eq!(accuracy.kind(), StageKind::Accuracy);
        Self { validity, accuracy }
    }

    pub fn validity(&self) -> &ClassificationStage {
        &self.validity
    }

    pub fn accuracy(&self) -> &ClassificationStage {
        &self.accuracy
    }

    /// Classify `text` through both stages
    pub async fn classify(&self, text: &str) -> Verdict {
        let verdict = self.validity.classify(text).await;

        match verdict.tag {
            VerdictTag::Timeout => verdict,
            tag if tag.rejects_structure() => {
                debug!(tag = %tag, "validity rejected input, skipping accuracy");
                verdict
            }
            _ => self.accuracy.classify(text).await,
        }
    }

    /// Reload both stages' conversation context
    pub async fn reload(&self) {
        futures::join!(self.validity.reload(), self.accuracy.reload());
    }
}
