// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::filter::filter_entities;
use crate::{
    CollectionQuery, CollectionState, EMPTY_RESULTS_MESSAGE, Entity, EntityUid, FetchOutcome,
    FetchToken, ListRow, NavigationIntent, ResourceKind, ScreenConfig, TokenSequence,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Unmounted,
    Mounted,
    TornDown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListCommand {
    Mount { online: bool },
    ConnectivityChanged(bool),
    FetchCompleted {
        token: FetchToken,
        outcome: FetchOutcome,
    },
    SetSearchTerm(String),
    SwipeOpen { uid: EntityUid },
    Remount,
    Teardown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListEvent {
    FetchRequested {
        token: FetchToken,
        query: CollectionQuery,
    },
    /// The in-flight request keeps running; its result will be discarded.
    FetchAbandoned { token: FetchToken },
    CollectionChanged(CollectionState),
    ConnectivityChanged(bool),
    ResultDiscarded { token: FetchToken },
    SearchChanged(String),
    NavigationRequested(NavigationIntent),
    Detached,
}

/// Per-screen state machine for one remote collection.
///
/// Owns the collection, the search term and the liveness token of the one
/// fetch it may have in flight. Side effects are returned as [`ListEvent`]s;
/// the caller performs the fetch and feeds the outcome back through
/// [`ListCommand::FetchCompleted`].
#[derive(Debug, Clone)]
pub struct ListController {
    config: ScreenConfig,
    lifecycle: Lifecycle,
    online: bool,
    collection: CollectionState,
    last_loaded: Vec<Entity>,
    search_term: String,
    tokens: TokenSequence,
    live_fetch: Option<FetchToken>,
}

impl ListController {
    pub fn new(config: ScreenConfig) -> Self {
        Self {
            config,
            lifecycle: Lifecycle::Unmounted,
            online: true,
            collection: CollectionState::Idle,
            last_loaded: Vec::new(),
            search_term: String::new(),
            tokens: TokenSequence::default(),
            live_fetch: None,
        }
    }

    pub fn dispatch(&mut self, command: ListCommand) -> Vec<ListEvent> {
        if self.lifecycle == Lifecycle::TornDown {
            return Vec::new();
        }
        match command {
            ListCommand::Mount { online } => self.mount(online),
            ListCommand::Remount => self.mount(self.online),
            ListCommand::ConnectivityChanged(online) => self.connectivity_changed(online),
            ListCommand::FetchCompleted { token, outcome } => self.fetch_completed(token, outcome),
            ListCommand::SetSearchTerm(term) => {
                if term == self.search_term {
                    return Vec::new();
                }
                self.search_term = term;
                vec![ListEvent::SearchChanged(self.search_term.clone())]
            }
            ListCommand::SwipeOpen { uid } => self.swipe_open(&uid).into_iter().collect(),
            ListCommand::Teardown => self.teardown(),
        }
    }

    fn mount(&mut self, online: bool) -> Vec<ListEvent> {
        self.lifecycle = Lifecycle::Mounted;
        let mut events = Vec::new();
        if self.online != online {
            self.online = online;
            events.push(ListEvent::ConnectivityChanged(online));
        }
        if online {
            events.extend(self.begin_fetch());
        } else {
            tracing::debug!(kind = self.kind().as_str(), "mounted offline, fetch suppressed");
        }
        events
    }

    fn connectivity_changed(&mut self, online: bool) -> Vec<ListEvent> {
        if self.online == online {
            return Vec::new();
        }
        self.online = online;
        let mut events = vec![ListEvent::ConnectivityChanged(online)];
        if self.lifecycle != Lifecycle::Mounted {
            return events;
        }
        if online {
            events.extend(self.begin_fetch());
        } else if let Some(token) = self.live_fetch.take() {
            tracing::info!(kind = self.kind().as_str(), %token, "went offline, abandoning fetch");
            events.push(ListEvent::FetchAbandoned { token });
        }
        events
    }

    /// Starts a fetch unless one is already live.
    fn begin_fetch(&mut self) -> Vec<ListEvent> {
        if self.live_fetch.is_some() {
            return Vec::new();
        }
        let token = self.tokens.next_token();
        self.live_fetch = Some(token);
        tracing::info!(
            kind = self.kind().as_str(),
            %token,
            endpoint = %self.config.query.endpoint(),
            "fetch requested"
        );
        let mut events = Vec::new();
        events.extend(self.set_collection(CollectionState::Loading));
        events.push(ListEvent::FetchRequested {
            token,
            query: self.config.query.clone(),
        });
        events
    }

    fn fetch_completed(&mut self, token: FetchToken, outcome: FetchOutcome) -> Vec<ListEvent> {
        if self.live_fetch != Some(token) {
            tracing::debug!(kind = self.kind().as_str(), %token, "discarding stale result");
            return vec![ListEvent::ResultDiscarded { token }];
        }
        self.live_fetch = None;
        match &outcome {
            Ok(items) => tracing::info!(
                kind = self.kind().as_str(),
                %token,
                count = items.len(),
                "fetch completed"
            ),
            Err(failure) => tracing::warn!(
                kind = self.kind().as_str(),
                %token,
                failure = failure.kind(),
                %failure,
                "fetch failed"
            ),
        }
        self.set_collection(CollectionState::from(outcome))
            .into_iter()
            .collect()
    }

    fn set_collection(&mut self, next: CollectionState) -> Option<ListEvent> {
        if self.collection == next {
            return None;
        }
        let previous = std::mem::replace(&mut self.collection, next);
        if let CollectionState::Loaded(items) = previous {
            self.last_loaded = items;
        }
        if matches!(self.collection, CollectionState::Loaded(_)) {
            self.last_loaded.clear();
        }
        Some(ListEvent::CollectionChanged(self.collection.clone()))
    }

    fn swipe_open(&self, uid: &EntityUid) -> Option<ListEvent> {
        let entity = self
            .current_items()
            .iter()
            .rev()
            .find(|entity| entity.uid().as_ref() == Some(uid))?;
        let intent = self.config.navigation_intent(entity)?;
        tracing::info!(
            target_screen = %intent.target_screen,
            uid = %uid,
            "navigation requested"
        );
        Some(ListEvent::NavigationRequested(intent))
    }

    fn teardown(&mut self) -> Vec<ListEvent> {
        self.lifecycle = Lifecycle::TornDown;
        let mut events = Vec::new();
        if let Some(token) = self.live_fetch.take() {
            events.push(ListEvent::FetchAbandoned { token });
        }
        events.push(ListEvent::Detached);
        tracing::debug!(kind = self.kind().as_str(), "list torn down");
        events
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    pub fn kind(&self) -> ResourceKind {
        self.config.kind
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn collection(&self) -> &CollectionState {
        &self.collection
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn live_fetch(&self) -> Option<FetchToken> {
        self.live_fetch
    }

    /// Items of the current load, or of the last successful one.
    pub fn current_items(&self) -> &[Entity] {
        match &self.collection {
            CollectionState::Loaded(items) => items,
            _ => &self.last_loaded,
        }
    }

    pub fn filtered_view(&self) -> Vec<Entity> {
        filter_entities(
            self.current_items(),
            &self.search_term,
            &self.config.display_field,
        )
    }

    pub fn view(&self) -> ListView {
        let kind = self.kind();
        let mut view = ListView {
            kind,
            online: self.online,
            banner: None,
            search_term: self.search_term.clone(),
            placeholder: kind.search_placeholder(),
            body: ListBody::Loading,
        };
        if !self.online {
            view.banner = Some(format!(
                "No Internet Connection — Please reconnect to load {}.",
                kind.as_str()
            ));
            view.body = ListBody::Unavailable {
                message: format!("Unable to load {} while offline.", kind.as_str()),
            };
            return view;
        }
        view.body = match &self.collection {
            CollectionState::Idle | CollectionState::Loading => ListBody::Loading,
            CollectionState::Loaded(_) => self.rows_body(),
            CollectionState::Failed(failure) => {
                let message = format!("Could not load {}: {failure}", kind.label());
                if self.last_loaded.is_empty() {
                    ListBody::Failed { message }
                } else {
                    view.banner = Some(message);
                    self.rows_body()
                }
            }
        };
        view
    }

    fn rows_body(&self) -> ListBody {
        let rows = self
            .filtered_view()
            .iter()
            .map(|entity| self.kind().row_for(entity))
            .collect::<Vec<_>>();
        if rows.is_empty() {
            ListBody::Empty {
                message: EMPTY_RESULTS_MESSAGE.to_owned(),
            }
        } else {
            ListBody::Rows(rows)
        }
    }
}

/// Everything a presentation layer needs to draw one list screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListView {
    pub kind: ResourceKind,
    pub online: bool,
    pub banner: Option<String>,
    pub search_term: String,
    pub placeholder: &'static str,
    pub body: ListBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListBody {
    Unavailable { message: String },
    Loading,
    Failed { message: String },
    Empty { message: String },
    Rows(Vec<ListRow>),
}

#[cfg(test)]
mod tests {
    use super::{Lifecycle, ListBody, ListCommand, ListController, ListEvent};
    use crate::{
        CollectionState, Entity, EntityUid, FetchFailure, FetchToken, ResourceKind, ScreenConfig,
    };
    use serde_json::json;

    fn controller(kind: ResourceKind) -> ListController {
        ListController::new(
            ScreenConfig::for_kind("https://swapi.tech/api", kind).expect("screen config"),
        )
    }

    fn planet(uid: &str, name: &str) -> Entity {
        Entity::from_value(json!({
            "uid": uid,
            "name": name,
            "climate": "temperate",
            "population": "1000"
        }))
        .expect("object")
    }

    fn requested_token(events: &[ListEvent]) -> FetchToken {
        events
            .iter()
            .find_map(|event| match event {
                ListEvent::FetchRequested { token, .. } => Some(*token),
                _ => None,
            })
            .expect("a fetch should have been requested")
    }

    fn fetch_count(events: &[ListEvent]) -> usize {
        events
            .iter()
            .filter(|event| matches!(event, ListEvent::FetchRequested { .. }))
            .count()
    }

    fn loaded(list: &mut ListController, items: Vec<Entity>) {
        let token = requested_token(&list.dispatch(ListCommand::Remount));
        list.dispatch(ListCommand::FetchCompleted {
            token,
            outcome: Ok(items),
        });
    }

    #[test]
    fn mount_online_requests_exactly_one_fetch() {
        let mut list = controller(ResourceKind::Planets);
        let events = list.dispatch(ListCommand::Mount { online: true });

        assert_eq!(fetch_count(&events), 1);
        assert_eq!(list.collection(), &CollectionState::Loading);
        assert_eq!(list.lifecycle(), Lifecycle::Mounted);
        assert!(events.contains(&ListEvent::CollectionChanged(CollectionState::Loading)));
    }

    #[test]
    fn mount_offline_stays_idle_and_shows_offline_message() {
        let mut list = controller(ResourceKind::Planets);
        let events = list.dispatch(ListCommand::Mount { online: false });

        assert_eq!(fetch_count(&events), 0);
        assert_eq!(list.collection(), &CollectionState::Idle);
        let view = list.view();
        assert_eq!(
            view.banner.as_deref(),
            Some("No Internet Connection — Please reconnect to load planets.")
        );
        assert_eq!(
            view.body,
            ListBody::Unavailable {
                message: "Unable to load planets while offline.".to_owned()
            }
        );
    }

    #[test]
    fn completion_with_live_token_loads_items() {
        let mut list = controller(ResourceKind::Planets);
        let token = requested_token(&list.dispatch(ListCommand::Mount { online: true }));

        let events = list.dispatch(ListCommand::FetchCompleted {
            token,
            outcome: Ok(vec![planet("1", "Tatooine")]),
        });

        assert_eq!(
            events,
            vec![ListEvent::CollectionChanged(CollectionState::Loaded(vec![
                planet("1", "Tatooine")
            ]))]
        );
        assert_eq!(list.live_fetch(), None);
    }

    #[test]
    fn going_offline_abandons_in_flight_fetch() {
        let mut list = controller(ResourceKind::Starships);
        let token = requested_token(&list.dispatch(ListCommand::Mount { online: true }));

        let events = list.dispatch(ListCommand::ConnectivityChanged(false));
        assert_eq!(
            events,
            vec![
                ListEvent::ConnectivityChanged(false),
                ListEvent::FetchAbandoned { token },
            ]
        );

        let late = list.dispatch(ListCommand::FetchCompleted {
            token,
            outcome: Ok(vec![planet("9", "Late")]),
        });
        assert_eq!(late, vec![ListEvent::ResultDiscarded { token }]);
        assert!(list.current_items().is_empty());
        assert!(matches!(list.view().body, ListBody::Unavailable { .. }));
    }

    #[test]
    fn reconnect_refetches_once_per_transition() {
        let mut list = controller(ResourceKind::Planets);
        loaded(&mut list, vec![planet("1", "Hoth")]);

        list.dispatch(ListCommand::ConnectivityChanged(false));
        let first = list.dispatch(ListCommand::ConnectivityChanged(true));
        let repeated = list.dispatch(ListCommand::ConnectivityChanged(true));

        assert_eq!(fetch_count(&first), 1);
        assert!(repeated.is_empty());
        assert_eq!(list.collection(), &CollectionState::Loading);
    }

    #[test]
    fn reconnect_after_failure_reenters_loading() {
        let mut list = controller(ResourceKind::Films);
        let token = requested_token(&list.dispatch(ListCommand::Mount { online: true }));
        list.dispatch(ListCommand::FetchCompleted {
            token,
            outcome: Err(FetchFailure::Http { status: 503 }),
        });

        list.dispatch(ListCommand::ConnectivityChanged(false));
        let events = list.dispatch(ListCommand::ConnectivityChanged(true));

        assert_eq!(fetch_count(&events), 1);
        assert!(events.contains(&ListEvent::CollectionChanged(CollectionState::Loading)));
    }

    #[test]
    fn reconnect_before_mount_does_not_fetch() {
        let mut list = controller(ResourceKind::Planets);
        list.dispatch(ListCommand::ConnectivityChanged(false));
        let events = list.dispatch(ListCommand::ConnectivityChanged(true));
        assert_eq!(events, vec![ListEvent::ConnectivityChanged(true)]);
    }

    #[test]
    fn offline_mount_then_reconnect_fetches() {
        let mut list = controller(ResourceKind::Planets);
        list.dispatch(ListCommand::Mount { online: false });
        let events = list.dispatch(ListCommand::ConnectivityChanged(true));
        assert_eq!(fetch_count(&events), 1);
    }

    #[test]
    fn remount_while_fetch_is_live_issues_nothing_new() {
        let mut list = controller(ResourceKind::Planets);
        list.dispatch(ListCommand::Mount { online: true });
        assert_eq!(fetch_count(&list.dispatch(ListCommand::Remount)), 0);
    }

    #[test]
    fn failure_keeps_last_loaded_items_filterable() {
        let mut list = controller(ResourceKind::Planets);
        loaded(&mut list, vec![planet("1", "Tatooine"), planet("2", "Hoth")]);

        let token = requested_token(&list.dispatch(ListCommand::Remount));
        list.dispatch(ListCommand::FetchCompleted {
            token,
            outcome: Err(FetchFailure::Network("connection reset".to_owned())),
        });
        list.dispatch(ListCommand::SetSearchTerm("hot".to_owned()));

        assert_eq!(list.filtered_view(), vec![planet("2", "Hoth")]);
        let view = list.view();
        assert_eq!(
            view.banner.as_deref(),
            Some("Could not load Planets: network error: connection reset")
        );
        match view.body {
            ListBody::Rows(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].title, "Hoth");
                assert_eq!(rows[0].subtitle, "Climate: temperate • Population: 1000");
            }
            other => panic!("expected rows, got {other:?}"),
        }
    }

    #[test]
    fn first_failure_without_items_is_the_body() {
        let mut list = controller(ResourceKind::Starships);
        let token = requested_token(&list.dispatch(ListCommand::Mount { online: true }));
        list.dispatch(ListCommand::FetchCompleted {
            token,
            outcome: Err(FetchFailure::Parse("expected value".to_owned())),
        });

        assert_eq!(
            list.view().body,
            ListBody::Failed {
                message: "Could not load Starships: malformed response: expected value".to_owned()
            }
        );
    }

    #[test]
    fn empty_collection_shows_no_results() {
        let mut list = controller(ResourceKind::Films);
        loaded(&mut list, Vec::new());
        assert_eq!(list.collection(), &CollectionState::Loaded(Vec::new()));
        assert_eq!(
            list.view().body,
            ListBody::Empty {
                message: "No results found".to_owned()
            }
        );
    }

    #[test]
    fn search_term_never_touches_collection() {
        let mut list = controller(ResourceKind::Planets);
        loaded(&mut list, vec![planet("1", "Tatooine")]);

        let events = list.dispatch(ListCommand::SetSearchTerm("zzz".to_owned()));
        assert_eq!(events, vec![ListEvent::SearchChanged("zzz".to_owned())]);
        assert_eq!(list.current_items().len(), 1);
        assert!(list.filtered_view().is_empty());
        assert!(list.dispatch(ListCommand::SetSearchTerm("zzz".to_owned())).is_empty());
    }

    #[test]
    fn swipe_emits_planet_navigation_intent() {
        let mut list = controller(ResourceKind::Planets);
        loaded(&mut list, vec![planet("10", "Tatooine")]);

        let events = list.dispatch(ListCommand::SwipeOpen {
            uid: EntityUid::from("10"),
        });
        let [ListEvent::NavigationRequested(intent)] = events.as_slice() else {
            panic!("expected one navigation intent, got {events:?}");
        };
        assert_eq!(intent.target_screen, "PlanetDetail");
        assert_eq!(intent.param("planetId"), Some("10"));
        assert_eq!(intent.param("planetName"), Some("Tatooine"));
    }

    #[test]
    fn swipe_with_duplicate_uids_uses_last_entity() {
        let mut list = controller(ResourceKind::Planets);
        loaded(&mut list, vec![planet("5", "First"), planet("5", "Second")]);

        let events = list.dispatch(ListCommand::SwipeOpen {
            uid: EntityUid::from("5"),
        });
        let [ListEvent::NavigationRequested(intent)] = events.as_slice() else {
            panic!("expected one navigation intent, got {events:?}");
        };
        assert_eq!(intent.param("planetName"), Some("Second"));
    }

    #[test]
    fn swipe_with_unknown_uid_emits_nothing() {
        let mut list = controller(ResourceKind::Planets);
        loaded(&mut list, vec![planet("1", "Tatooine")]);
        assert!(
            list.dispatch(ListCommand::SwipeOpen {
                uid: EntityUid::from("404"),
            })
            .is_empty()
        );
    }

    #[test]
    fn completion_after_teardown_changes_nothing() {
        let mut list = controller(ResourceKind::Planets);
        let token = requested_token(&list.dispatch(ListCommand::Mount { online: true }));

        let events = list.dispatch(ListCommand::Teardown);
        assert_eq!(
            events,
            vec![ListEvent::FetchAbandoned { token }, ListEvent::Detached]
        );

        let before = list.collection().clone();
        assert!(
            list.dispatch(ListCommand::FetchCompleted {
                token,
                outcome: Ok(vec![planet("1", "Tatooine")]),
            })
            .is_empty()
        );
        assert!(list.dispatch(ListCommand::ConnectivityChanged(false)).is_empty());
        assert!(list.dispatch(ListCommand::Remount).is_empty());
        assert_eq!(list.collection(), &before);
        assert!(list.is_online());
        assert_eq!(list.lifecycle(), Lifecycle::TornDown);
    }

    #[test]
    fn stale_token_from_previous_fetch_is_discarded() {
        let mut list = controller(ResourceKind::Planets);
        let first = requested_token(&list.dispatch(ListCommand::Mount { online: true }));
        list.dispatch(ListCommand::ConnectivityChanged(false));
        let second = requested_token(&list.dispatch(ListCommand::ConnectivityChanged(true)));
        assert_ne!(first, second);

        let events = list.dispatch(ListCommand::FetchCompleted {
            token: first,
            outcome: Ok(Vec::new()),
        });
        assert_eq!(events, vec![ListEvent::ResultDiscarded { token: first }]);
        assert_eq!(list.live_fetch(), Some(second));
    }

    #[test]
    fn film_rows_use_episode_title() {
        let mut list = controller(ResourceKind::Films);
        let film = Entity::from_value(json!({
            "uid": "1",
            "title": "A New Hope",
            "episode_id": 4
        }))
        .expect("object");
        loaded(&mut list, vec![film]);

        match list.view().body {
            ListBody::Rows(rows) => assert_eq!(rows[0].title, "A New Hope, Episode 4"),
            other => panic!("expected rows, got {other:?}"),
        }
    }
}
