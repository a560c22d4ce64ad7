use std::{future::Future, sync::Arc};

use anyhow::Result;
use log::{debug, info, warn};

use crate::{
    db::{Database, OwnerId, WatchId},
    error::IntakeError,
    rate_guard::RateGuard,
    source::ListingSource,
};

use super::{
    commands::{ChoiceOption, Command, Inbound, Reply},
    filters::FilterParser,
    state::{IntakeSession, IntakeStage, LocationSlot, PendingChoice, SessionStore},
};

const ADD_USAGE: &str =
    "This is not how it works. Give me a location like this: /add <location>";

const HELP_TEXT: &str = "Use /add <location> to enter the input mode. Now you can write \
stuff like \"only 500€\" or \"min 80qm\" or \"around 20km\" or \"3 rooms\" to set some \
filters. If you are done, type /done. If you want to see the already given data, type \
/info. You can use /list to show the already tracked items. With /del you can delete \
items (/del all removes every item). Use /cancel if you want to dismiss the already \
given data.";

/// Drives the conversation that turns user messages into watch entries.
pub struct IntakeController {
    db: Database,
    source: Arc<dyn ListingSource>,
    sessions: SessionStore,
    rate_guard: Arc<RateGuard>,
    filters: FilterParser,
}

impl IntakeController {
    pub fn new(
        db: Database,
        source: Arc<dyn ListingSource>,
        sessions: SessionStore,
        rate_guard: Arc<RateGuard>,
    ) -> Result<Self> {
        Ok(Self {
            db,
            source,
            sessions,
            rate_guard,
            filters: FilterParser::new()?,
        })
    }

    /// Entry point for the transport. Every outcome, including errors, ends
    /// up as a reply for the owner.
    pub async fn handle(&self, owner_id: OwnerId, inbound: Inbound) -> Reply {
        let result = match inbound {
            Inbound::Command(Command::Help) => Ok(help()),
            Inbound::Command(Command::Cancel) => Ok(self.cancel(owner_id).await),
            Inbound::Selection(token) => self.select(owner_id, &token).await,
            Inbound::Command(Command::Add(text)) => {
                self.guarded(owner_id, self.start(owner_id, &text)).await
            }
            Inbound::Command(Command::Info) => self.guarded(owner_id, self.info(owner_id)).await,
            Inbound::Command(Command::Done) => {
                self.guarded(owner_id, self.finalize(owner_id)).await
            }
            Inbound::Command(Command::List) => self.guarded(owner_id, self.list(owner_id)).await,
            Inbound::Command(Command::Delete { all: false }) => {
                self.guarded(owner_id, self.begin_deletion(owner_id)).await
            }
            Inbound::Command(Command::Delete { all: true }) => {
                self.guarded(owner_id, self.delete_all(owner_id)).await
            }
            Inbound::Text(text) => {
                self.guarded(owner_id, self.filter_message(owner_id, &text))
                    .await
            }
        };

        result.unwrap_or_else(|err| {
            match &err {
                IntakeError::Lookup(_) | IntakeError::Storage(_) => {
                    warn!("Intake action for owner {owner_id} failed: {err}")
                }
                _ => debug!("Intake action for owner {owner_id} rejected: {err}"),
            }
            Reply::text(err.user_message())
        })
    }

    /// Runs `action` only if the owner is outside the throttle window. The
    /// future is not polled when throttled, so nothing changes.
    async fn guarded<F>(&self, owner_id: OwnerId, action: F) -> Result<Reply, IntakeError>
    where
        F: Future<Output = Result<Reply, IntakeError>>,
    {
        if self.rate_guard.should_throttle(owner_id) {
            return Err(IntakeError::RateLimited);
        }
        action.await
    }

    /// `add <text>`: resolves the location and opens a new session. Any
    /// previous session of the owner is discarded first.
    pub async fn start(&self, owner_id: OwnerId, text: &str) -> Result<Reply, IntakeError> {
        self.sessions.destroy(owner_id).await;

        let query = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if query.is_empty() {
            return Err(IntakeError::validation(ADD_USAGE));
        }

        let candidates = self
            .source
            .resolve_locations(&query)
            .await
            .map_err(IntakeError::Lookup)?;

        match candidates.len() {
            0 => Err(IntakeError::Ambiguity(
                "Can't find any information about this location!".into(),
            )),
            1 => {
                let name = candidates[0].name.clone();
                self.sessions
                    .create(IntakeSession::with_candidates(owner_id, candidates))
                    .await;
                Ok(Reply::text(format!(
                    "Set location to {name}, now give me some filters..."
                )))
            }
            _ => {
                let options = candidates
                    .iter()
                    .map(|candidate| ChoiceOption {
                        label: candidate.name.clone(),
                        token: candidate.id.clone(),
                    })
                    .collect();
                self.sessions
                    .create(IntakeSession::with_candidates(owner_id, candidates))
                    .await;
                Ok(Reply::Choices {
                    prompt: "Please choose:".into(),
                    options,
                })
            }
        }
    }

    /// Resolves whichever choice is outstanding for the owner.
    pub async fn select(&self, owner_id: OwnerId, token: &str) -> Result<Reply, IntakeError> {
        let pending = self
            .sessions
            .get(owner_id)
            .await
            .and_then(|session| session.pending);

        match pending {
            None => Err(IntakeError::validation(
                "There is nothing to choose right now.",
            )),
            Some(PendingChoice::Location) => {
                let chosen = self
                    .sessions
                    .update(owner_id, |session| session.select_location(token))
                    .await
                    .flatten()
                    .ok_or_else(|| {
                        IntakeError::validation("That is not one of the offered locations.")
                    })?;
                Ok(Reply::text(format!(
                    "Set location to {}, now give me some filters...",
                    chosen.name
                )))
            }
            Some(PendingChoice::Deletion(offered)) => {
                let watch_id = token
                    .parse::<WatchId>()
                    .ok()
                    .filter(|watch_id| offered.contains(watch_id))
                    .ok_or_else(|| {
                        IntakeError::validation("That is not one of the offered entries.")
                    })?;

                let removed = self
                    .db
                    .delete_watches(owner_id, Some(watch_id))
                    .await
                    .map_err(IntakeError::Storage)?;
                self.sessions.destroy(owner_id).await;

                if removed == 0 {
                    Ok(Reply::text("That entry was already gone."))
                } else {
                    info!("Owner {owner_id} deleted watch {watch_id}");
                    Ok(Reply::text("Deleted the selected entry!"))
                }
            }
        }
    }

    /// Free text while filters are being collected.
    pub async fn filter_message(&self, owner_id: OwnerId, text: &str) -> Result<Reply, IntakeError> {
        match self.sessions.get(owner_id).await.map(|session| session.stage()) {
            None => {
                return Err(IntakeError::validation(
                    "Use /add <location> to start a new search first.",
                ))
            }
            Some(IntakeStage::AwaitingDisambiguation) => {
                return Err(IntakeError::validation(
                    "Please choose one of the options first.",
                ))
            }
            Some(IntakeStage::AwaitingFilters) => {}
        }

        let found = self.filters.parse(text).ok_or_else(|| {
            IntakeError::validation(
                "Could not extract a filter value... Try \"500€\", \"3 rooms\", \"80qm\" or \"20km\".",
            )
        })?;

        self.sessions
            .update(owner_id, |session| session.set_filter(found.param, found.value))
            .await
            .ok_or_else(|| IntakeError::validation("Use /add <location> to start a new search first."))?;

        Ok(Reply::text(format!(
            "Set {} to {}!",
            found.param,
            found.param.format_value(found.value)
        )))
    }

    pub async fn info(&self, owner_id: OwnerId) -> Result<Reply, IntakeError> {
        let session = self
            .sessions
            .get(owner_id)
            .await
            .filter(|session| !matches!(session.pending, Some(PendingChoice::Deletion(_))))
            .ok_or_else(|| {
                IntakeError::validation("There is no search in progress. Use /add <location> first.")
            })?;

        let mut given = Vec::new();
        match &session.location {
            Some(LocationSlot::Resolved(location)) => given.push(format!("location: {}", location.name)),
            Some(LocationSlot::Candidates(candidates)) => given.push(format!(
                "location: one of {} candidates, please choose",
                candidates.len()
            )),
            None => {}
        }
        for (param, value) in &session.values {
            given.push(format!("{param}: {}", param.format_value(*value)));
        }

        let missing = session.missing_params();
        let additional = if missing.is_empty() {
            "Ready to go! Type /done".to_string()
        } else {
            let names: Vec<&str> = missing.iter().map(|param| param.as_str()).collect();
            format!("You can also set: {}", names.join(", "))
        };

        Ok(Reply::text(format!(
            "I've already got this information from you:\n{}\n\n{}",
            given.join("\n"),
            additional
        )))
    }

    /// `done`: persists the entry. On a storage failure the session is kept
    /// so the owner can retry.
    pub async fn finalize(&self, owner_id: OwnerId) -> Result<Reply, IntakeError> {
        let session = self.sessions.get(owner_id).await.ok_or_else(|| {
            IntakeError::validation("There is no search to save. Use /add <location> first.")
        })?;

        if session.stage() == IntakeStage::AwaitingDisambiguation {
            return Err(IntakeError::validation(
                "Please choose one of the options first.",
            ));
        }

        let watch = session
            .to_new_watch()
            .ok_or_else(|| IntakeError::validation("Please set a location first."))?;
        let description = format!("{} ({})", watch.location.name, watch.filters);

        let watch_id = self
            .db
            .create_watch(watch)
            .await
            .map_err(IntakeError::Storage)?;
        self.sessions.destroy(owner_id).await;

        info!("Owner {owner_id} created watch {watch_id}: {description}");
        Ok(Reply::text(format!(
            "Now watching {description}. I'll tell you when the number of listings changes."
        )))
    }

    pub async fn cancel(&self, owner_id: OwnerId) -> Reply {
        self.sessions.destroy(owner_id).await;
        Reply::text("Bye")
    }

    pub async fn list(&self, owner_id: OwnerId) -> Result<Reply, IntakeError> {
        let watches = self
            .db
            .list_watches_for_owner(owner_id)
            .await
            .map_err(IntakeError::Storage)?;

        if watches.is_empty() {
            return Ok(Reply::text("No entries found!"));
        }

        let lines: Vec<String> = watches.iter().map(|watch| watch.summary()).collect();
        Ok(Reply::text(lines.join("\n")))
    }

    /// `del`: offers every owned entry for deletion.
    pub async fn begin_deletion(&self, owner_id: OwnerId) -> Result<Reply, IntakeError> {
        let watches = self
            .db
            .list_watches_for_owner(owner_id)
            .await
            .map_err(IntakeError::Storage)?;

        if watches.is_empty() {
            return Ok(Reply::text("No entries found"));
        }

        let options = watches
            .iter()
            .map(|watch| ChoiceOption {
                label: watch.summary(),
                token: watch.id.to_string(),
            })
            .collect();
        let offered = watches.iter().map(|watch| watch.id).collect();
        self.sessions
            .create(IntakeSession::for_deletion(owner_id, offered))
            .await;

        Ok(Reply::Choices {
            prompt: "Which entry do you want to delete?".into(),
            options,
        })
    }

    pub async fn delete_all(&self, owner_id: OwnerId) -> Result<Reply, IntakeError> {
        let removed = self
            .db
            .delete_watches(owner_id, None)
            .await
            .map_err(IntakeError::Storage)?;

        info!("Owner {owner_id} deleted all {removed} watches");
        Ok(Reply::text(match removed {
            0 => "No entries found".to_string(),
            1 => "Deleted 1 entry!".to_string(),
            n => format!("Deleted {n} entries!"),
        }))
    }
}

pub fn help() -> Reply {
    Reply::text(HELP_TEXT)
}
