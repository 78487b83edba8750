//! Result records returned to the request boundary.

use serde::{Serialize, Serializer, ser::SerializeMap};

use relaycheck_smtp::{Step, Transcript};

/// The outcome of one connection probe.
///
/// Serializes as `{"success", "message", "<step>_log"...}` with one log key
/// per attempted step, in handshake order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticReport {
    pub success: bool,
    pub message: String,
    transcripts: Vec<(Step, Transcript)>,
}

impl DiagnosticReport {
    pub(crate) fn new(
        success: bool,
        message: impl Into<String>,
        transcripts: Vec<(Step, Transcript)>,
    ) -> Self {
        Self {
            success,
            message: message.into(),
            transcripts,
        }
    }

    /// The transcript of `step`, if it was attempted.
    #[must_use]
    pub fn transcript(&self, step: Step) -> Option<&Transcript> {
        self.transcripts
            .iter()
            .find_map(|(s, transcript)| (*s == step).then_some(transcript))
    }

    /// Attempted steps in handshake order.
    pub fn steps(&self) -> impl Iterator<Item = Step> + '_ {
        self.transcripts.iter().map(|(step, _)| *step)
    }

    #[must_use]
    pub fn transcripts(&self) -> &[(Step, Transcript)] {
        &self.transcripts
    }
}

impl Serialize for DiagnosticReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2 + self.transcripts.len()))?;
        map.serialize_entry("success", &self.success)?;
        map.serialize_entry("message", &self.message)?;
        for (step, transcript) in &self.transcripts {
            map.serialize_entry(step.log_key(), &transcript.to_text())?;
        }
        map.end()
    }
}

/// The outcome of one test message dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub success: bool,
    pub message: String,
}

impl DispatchResult {
    pub(crate) fn sent() -> Self {
        Self {
            success: true,
            message: "Message has been sent".to_string(),
        }
    }

    pub(crate) fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
