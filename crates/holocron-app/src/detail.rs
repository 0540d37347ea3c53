// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use url::Url;

use crate::{
    CollectionQuery, DetailField, DetailOutcome, DetailState, EntityUid, FetchToken,
    NavigationIntent, ResourceKind, TokenSequence,
};

#[derive(Debug, Clone, PartialEq)]
pub enum DetailCommand {
    Mount,
    FetchCompleted {
        token: FetchToken,
        outcome: DetailOutcome,
    },
    Teardown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailEvent {
    FetchRequested {
        token: FetchToken,
        kind: ResourceKind,
        id: EntityUid,
        url: Url,
    },
    StateChanged(DetailState),
    ResultDiscarded { token: FetchToken },
    Detached,
}

/// Controller for one detail screen, keyed by the identifier carried in the
/// navigation intent that opened it.
#[derive(Debug, Clone)]
pub struct DetailController {
    kind: ResourceKind,
    query: CollectionQuery,
    id: EntityUid,
    label: String,
    state: DetailState,
    tokens: TokenSequence,
    live_fetch: Option<FetchToken>,
    torn_down: bool,
}

impl DetailController {
    pub fn new(
        kind: ResourceKind,
        query: CollectionQuery,
        id: EntityUid,
        label: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            query,
            id,
            label: label.into(),
            state: DetailState::Loading,
            tokens: TokenSequence::default(),
            live_fetch: None,
            torn_down: false,
        }
    }

    pub fn from_intent(intent: &NavigationIntent, query: CollectionQuery) -> Result<Self> {
        let kind = ResourceKind::from_detail_screen(&intent.target_screen)
            .ok_or_else(|| anyhow!("unknown detail screen {:?}", intent.target_screen))?;
        let id = intent
            .param(kind.id_param())
            .ok_or_else(|| {
                anyhow!(
                    "{} intent is missing {}",
                    intent.target_screen,
                    kind.id_param()
                )
            })?;
        let label = intent.param(kind.label_param()).unwrap_or_default();
        Ok(Self::new(kind, query, EntityUid::from(id), label))
    }

    pub fn dispatch(&mut self, command: DetailCommand) -> Vec<DetailEvent> {
        if self.torn_down {
            return Vec::new();
        }
        match command {
            DetailCommand::Mount => {
                if self.live_fetch.is_some() {
                    return Vec::new();
                }
                let token = self.tokens.next_token();
                self.live_fetch = Some(token);
                let url = self.query.detail_url(&self.id);
                tracing::info!(
                    kind = self.kind.as_str(),
                    id = %self.id,
                    %url,
                    "detail fetch requested"
                );
                let mut events = Vec::new();
                if self.state != DetailState::Loading {
                    self.state = DetailState::Loading;
                    events.push(DetailEvent::StateChanged(self.state.clone()));
                }
                events.push(DetailEvent::FetchRequested {
                    token,
                    kind: self.kind,
                    id: self.id.clone(),
                    url,
                });
                events
            }
            DetailCommand::FetchCompleted { token, outcome } => {
                if self.live_fetch != Some(token) {
                    return vec![DetailEvent::ResultDiscarded { token }];
                }
                self.live_fetch = None;
                if let Err(failure) = &outcome {
                    tracing::warn!(
                        kind = self.kind.as_str(),
                        id = %self.id,
                        %failure,
                        "detail fetch failed"
                    );
                }
                self.state = DetailState::from(outcome);
                vec![DetailEvent::StateChanged(self.state.clone())]
            }
            DetailCommand::Teardown => {
                self.torn_down = true;
                self.live_fetch = None;
                vec![DetailEvent::Detached]
            }
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn id(&self) -> &EntityUid {
        &self.id
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn view(&self) -> DetailView {
        let singular = self.kind.singular();
        let body = match &self.state {
            DetailState::Loading => DetailBody::Loading {
                message: format!("Loading {singular} data..."),
            },
            DetailState::Failed(_) => DetailBody::Failed {
                message: format!("Unable to load {singular} details."),
            },
            DetailState::Loaded(properties) => DetailBody::Fields(properties.fields().to_vec()),
        };
        DetailView {
            title: self.label.clone(),
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailView {
    pub title: String,
    pub body: DetailBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailBody {
    Loading { message: String },
    Failed { message: String },
    Fields(Vec<DetailField>),
}
