//! The handshake shared by probes and dispatches.

use relaycheck_common::{Configuration, SecurityMode};
use relaycheck_smtp::{HandshakeError, MailSession, Step, Transcript};

/// The name announced in `EHLO`: this host's name, or `localhost` if it
/// cannot be determined.
#[must_use]
pub fn client_identity() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Transcripts of the steps attempted so far, in order.
#[derive(Debug, Default)]
pub(crate) struct Transcripts(Vec<(Step, Transcript)>);

impl Transcripts {
    /// Starts the transcript for `step`, or continues it if it is already the
    /// latest one.
    fn step(&mut self, step: Step) -> &mut Transcript {
        if self.0.last().is_none_or(|(last, _)| *last != step) {
            self.0.push((step, Transcript::new()));
        }

        let index = self.0.len() - 1;
        &mut self.0[index].1
    }

    pub(crate) fn into_inner(self) -> Vec<(Step, Transcript)> {
        self.0
    }
}

/// Runs `connect -> greet -> [upgrade_to_tls -> greet] -> [authenticate]`,
/// stopping at the first failure. The session is left open either way.
///
/// The greeting repeated on the encrypted channel is recorded under the TLS
/// step; its failure is still a greeting failure.
pub(crate) async fn run<S: MailSession>(
    session: &mut S,
    config: &Configuration,
    identity: &str,
    transcripts: &mut Transcripts,
) -> Result<(), HandshakeError> {
    session
        .connect(
            &config.host,
            config.port,
            config.timeouts.connect(),
            transcripts.step(Step::Connection),
        )
        .await?;

    session.greet(identity, transcripts.step(Step::Hello)).await?;

    if config.security == SecurityMode::StartTls {
        session.upgrade_to_tls(transcripts.step(Step::Tls)).await?;
        session.greet(identity, transcripts.step(Step::Tls)).await?;
    }

    if let Some((username, password)) = config.credentials() {
        session
            .authenticate(username, password, transcripts.step(Step::Auth))
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_identity_is_never_empty() {
        assert!(!client_identity().is_empty());
    }

    #[test]
    fn test_transcripts_continue_latest_step() {
        let mut transcripts = Transcripts::default();
        transcripts.step(Step::Connection);
        transcripts.step(Step::Hello);
        transcripts.step(Step::Hello);

        let steps: Vec<_> = transcripts.into_inner().into_iter().map(|(s, _)| s).collect();
        assert_eq!(steps, [Step::Connection, Step::Hello]);
    }
}
