/// Failure talking to the external listing service. The poller treats any
/// of these as "no observation this cycle".
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("listing source request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("listing source returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("unexpected listing source response: {0}")]
    Decode(String),
    #[error("listing source reported an error: {0}")]
    Upstream(String),
}

/// Outcomes of an intake action that are reported back to the owner
/// instead of advancing the conversation.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Ambiguity(String),
    #[error("location lookup failed: {0}")]
    Lookup(#[source] SourceError),
    #[error("storage failure: {0:#}")]
    Storage(#[source] anyhow::Error),
    #[error("rate limited")]
    RateLimited,
}

impl IntakeError {
    pub fn validation(message: impl Into<String>) -> Self {
        IntakeError::Validation(message.into())
    }

    /// Text shown to the owner.
    pub fn user_message(&self) -> String {
        match self {
            IntakeError::Validation(message) | IntakeError::Ambiguity(message) => message.clone(),
            IntakeError::Lookup(_) => {
                "The listing service is not answering right now, please try again later.".into()
            }
            IntakeError::Storage(_) => "Something went wrong while saving, please try again.".into(),
            IntakeError::RateLimited => "Hey, hey, don't type so fast...".into(),
        }
    }
}
