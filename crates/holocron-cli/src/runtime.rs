// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use holocron_api::Client;
use holocron_app::{
    CollectionQuery, ConnectivityMonitor, DetailOutcome, EntityUid, FetchOutcome, FetchToken,
    ResourceKind, ScreenConfig,
};
use holocron_tui::{CatalogRuntime, DetailRequest, InternalEvent};
use std::sync::mpsc::Sender;
use std::thread;

/// Runtime backed by the HTTP catalog. Fetches run on their own threads and
/// report back through the TUI event channel.
pub struct HttpRuntime {
    client: Client,
    monitor: ConnectivityMonitor,
}

impl HttpRuntime {
    pub fn new(client: Client, monitor: ConnectivityMonitor) -> Self {
        Self { client, monitor }
    }
}

impl CatalogRuntime for HttpRuntime {
    fn connectivity(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    fn screen_config(&mut self, kind: ResourceKind) -> Result<ScreenConfig> {
        self.client.screen_config(kind)
    }

    fn fetch_collection(&mut self, query: &CollectionQuery) -> FetchOutcome {
        self.client.try_fetch_collection(query)
    }

    fn fetch_detail(
        &mut self,
        kind: ResourceKind,
        query: &CollectionQuery,
        id: &EntityUid,
    ) -> DetailOutcome {
        self.client.try_fetch_detail(kind, query, id)
    }

    fn spawn_collection_fetch(
        &mut self,
        kind: ResourceKind,
        token: FetchToken,
        query: CollectionQuery,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let client = self.client.clone();
        thread::spawn(move || {
            let outcome = client.try_fetch_collection(&query);
            // The receiver is gone once the TUI exits; nothing left to notify.
            let _ = tx.send(InternalEvent::CollectionFetched {
                kind,
                token,
                outcome,
            });
        });
        Ok(())
    }

    fn spawn_detail_fetch(
        &mut self,
        request: DetailRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let client = self.client.clone();
        thread::spawn(move || {
            let outcome = client.try_fetch_detail(request.kind, &request.query, &request.id);
            let _ = tx.send(InternalEvent::DetailFetched {
                generation: request.generation,
                token: request.token,
                outcome,
            });
        });
        Ok(())
    }
}
