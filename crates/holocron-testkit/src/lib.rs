// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use holocron_app::{Entity, ResourceKind};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tiny_http::{Header, Response, Server};

const PLANET_NAMES: [&str; 12] = [
    "Tatooine",
    "Alderaan",
    "Yavin IV",
    "Hoth",
    "Dagobah",
    "Bespin",
    "Endor",
    "Naboo",
    "Coruscant",
    "Kamino",
    "Geonosis",
    "Utapau",
];

const CLIMATES: [&str; 8] = [
    "arid",
    "temperate",
    "temperate, tropical",
    "frozen",
    "murky",
    "tropical",
    "polluted",
    "unknown",
];

const TERRAINS: [&str; 7] = [
    "desert",
    "grasslands, mountains",
    "jungle, rainforests",
    "tundra, ice caves",
    "swamp, jungles",
    "gas giant",
    "forests, mountains, lakes",
];

const STARSHIP_NAMES: [&str; 10] = [
    "CR90 corvette",
    "Star Destroyer",
    "Sentinel-class landing craft",
    "Death Star",
    "Millennium Falcon",
    "Y-wing",
    "X-wing",
    "TIE Advanced x1",
    "Executor",
    "Rebel transport",
];

const MANUFACTURERS: [&str; 6] = [
    "Corellian Engineering Corporation",
    "Kuat Drive Yards",
    "Sienar Fleet Systems",
    "Imperial Department of Military Research",
    "Koensayr Manufacturing",
    "Incom Corporation",
];

const STARSHIP_CLASSES: [&str; 6] = [
    "corvette",
    "Star Destroyer",
    "landing craft",
    "Light freighter",
    "assault starfighter",
    "Starfighter",
];

const FILM_TITLES: [(&str, u32); 6] = [
    ("A New Hope", 4),
    ("The Empire Strikes Back", 5),
    ("Return of the Jedi", 6),
    ("The Phantom Menace", 1),
    ("Attack of the Clones", 2),
    ("Revenge of the Sith", 3),
];

const DIRECTORS: [&str; 3] = ["George Lucas", "Irvin Kershner", "Richard Marquand"];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn range(&mut self, min: u64, max: u64) -> u64 {
        if max <= min {
            return min;
        }
        min + self.next_u64() % (max - min + 1)
    }
}

/// Seeded generator of catalog records shaped like the live API's.
#[derive(Debug, Clone)]
pub struct CatalogFaker {
    rng: DeterministicRng,
}

impl CatalogFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    /// List-shaped planet record.
    pub fn planet(&mut self, uid: u32) -> Value {
        json!({
            "uid": uid.to_string(),
            "name": self.pick(&PLANET_NAMES),
            "climate": self.pick(&CLIMATES),
            "population": self.rng.range(1_000, 2_000_000_000).to_string(),
            "url": format!("https://swapi.tech/api/planets/{uid}"),
        })
    }

    pub fn starship(&mut self, uid: u32) -> Value {
        json!({
            "uid": uid.to_string(),
            "name": self.pick(&STARSHIP_NAMES),
            "url": format!("https://swapi.tech/api/starships/{uid}"),
        })
    }

    pub fn film(&mut self, uid: u32) -> Value {
        let (title, episode_id) = FILM_TITLES[self.rng.int_n(FILM_TITLES.len())];
        json!({
            "uid": uid.to_string(),
            "title": title,
            "episode_id": episode_id,
            "director": self.pick(&DIRECTORS),
        })
    }

    pub fn record(&mut self, kind: ResourceKind, uid: u32) -> Value {
        match kind {
            ResourceKind::Planets => self.planet(uid),
            ResourceKind::Starships => self.starship(uid),
            ResourceKind::Films => self.film(uid),
        }
    }

    pub fn records(&mut self, kind: ResourceKind, count: u32) -> Vec<Value> {
        (1..=count).map(|uid| self.record(kind, uid)).collect()
    }

    pub fn entities(&mut self, kind: ResourceKind, count: u32) -> Vec<Entity> {
        self.records(kind, count)
            .into_iter()
            .filter_map(Entity::from_value)
            .collect()
    }

    /// `result.properties` of a starship detail response.
    pub fn starship_properties(&mut self) -> Value {
        json!({
            "model": self.pick(&STARSHIP_NAMES),
            "manufacturer": self.pick(&MANUFACTURERS),
            "starship_class": self.pick(&STARSHIP_CLASSES),
            "cost_in_credits": self.rng.range(10_000, 1_000_000_000).to_string(),
            "length": self.rng.range(5, 19_000).to_string(),
            "crew": self.rng.range(1, 300_000).to_string(),
            "passengers": self.rng.range(0, 800_000).to_string(),
            "max_atmosphering_speed": self.rng.range(500, 1_500).to_string(),
            "hyperdrive_rating": format!("{}.0", self.rng.range(1, 4)),
            "cargo_capacity": self.rng.range(0, 1_000_000).to_string(),
            "consumables": format!("{} months", self.rng.range(1, 24)),
        })
    }

    pub fn planet_properties(&mut self) -> Value {
        json!({
            "climate": self.pick(&CLIMATES),
            "population": self.rng.range(1_000, 2_000_000_000).to_string(),
            "terrain": self.pick(&TERRAINS),
            "diameter": self.rng.range(4_000, 20_000).to_string(),
            "gravity": "1 standard",
            "rotation_period": self.rng.range(12, 36).to_string(),
            "orbital_period": self.rng.range(200, 600).to_string(),
            "surface_water": self.rng.range(0, 100).to_string(),
        })
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

/// `{"results": [...]}`, the shape of most collection endpoints.
pub fn results_payload(items: &[Value]) -> String {
    json!({ "message": "ok", "results": items }).to_string()
}

/// `{"result": [...]}`, the shape the films endpoint uses.
pub fn result_payload(items: &[Value]) -> String {
    json!({ "message": "ok", "result": items }).to_string()
}

pub fn detail_payload(properties: Value) -> String {
    json!({ "message": "ok", "result": { "properties": properties } }).to_string()
}

/// Path of `kind`'s collection below a mock catalog's `/api` prefix.
pub fn collection_path(kind: ResourceKind) -> String {
    format!("/api/{}", kind.path())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRoute {
    pub path: String,
    pub status: u16,
    pub body: String,
}

impl MockRoute {
    pub fn json(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(path: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status,
            body: body.into(),
        }
    }
}

/// Catalog served from a background `tiny_http` server. Unrouted paths get a
/// 404. The server is shut down when the value is dropped.
pub struct MockCatalog {
    base_url: String,
    server: Arc<Server>,
    requests: Arc<Mutex<Vec<String>>>,
    handle: Option<JoinHandle<()>>,
}

impl MockCatalog {
    pub fn start(routes: Vec<MockRoute>) -> Result<Self> {
        let server = Server::http("127.0.0.1:0")
            .map_err(|error| anyhow!("start mock catalog: {error}"))?;
        let server = Arc::new(server);
        let base_url = format!("http://{}/api", server.server_addr());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let worker_server = Arc::clone(&server);
        let worker_requests = Arc::clone(&requests);
        let handle = thread::spawn(move || {
            for request in worker_server.incoming_requests() {
                let path = request
                    .url()
                    .split('?')
                    .next()
                    .unwrap_or_default()
                    .to_owned();
                if let Ok(mut seen) = worker_requests.lock() {
                    seen.push(path.clone());
                }
                let (status, body) = routes
                    .iter()
                    .find(|route| route.path == path)
                    .map(|route| (route.status, route.body.clone()))
                    .unwrap_or((404, r#"{"message":"not found"}"#.to_owned()));
                let mut response = Response::from_string(body).with_status_code(status);
                if let Ok(header) = Header::from_bytes("Content-Type", "application/json") {
                    response = response.with_header(header);
                }
                let _ = request.respond(response);
            }
        });

        Ok(Self {
            base_url,
            server,
            requests,
            handle: Some(handle),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Paths requested so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        match self.requests.lock() {
            Ok(seen) => seen.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn request_count(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|requested| requested.as_str() == path)
            .count()
    }
}

impl Drop for MockCatalog {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CatalogFaker, MockCatalog, MockRoute, collection_path, detail_payload, result_payload,
        results_payload,
    };
    use holocron_app::ResourceKind;
    use serde_json::Value;

    #[test]
    fn same_seed_same_records() {
        let mut left = CatalogFaker::new(42);
        let mut right = CatalogFaker::new(42);
        assert_eq!(
            left.records(ResourceKind::Planets, 5),
            right.records(ResourceKind::Planets, 5)
        );
    }

    #[test]
    fn records_carry_uid_and_display_field() {
        let mut faker = CatalogFaker::new(7);
        for kind in ResourceKind::ALL {
            for (index, entity) in faker.entities(kind, 4).iter().enumerate() {
                assert_eq!(
                    entity.uid().map(|uid| uid.to_string()),
                    Some((index + 1).to_string())
                );
                assert!(entity.field_text(kind.display_field()).is_some(), "{kind:?}");
            }
        }
    }

    #[test]
    fn starship_properties_cover_every_known_field() {
        let mut faker = CatalogFaker::new(3);
        let properties = faker.starship_properties();
        for spec in ResourceKind::Starships.detail_fields() {
            assert!(properties.get(spec.key).is_some(), "missing {}", spec.key);
        }
    }

    #[test]
    fn payload_builders_use_catalog_envelopes() {
        let results: Value = serde_json::from_str(&results_payload(&[])).expect("json");
        assert!(results["results"].is_array());
        let result: Value = serde_json::from_str(&result_payload(&[])).expect("json");
        assert!(result["result"].is_array());
        let detail: Value =
            serde_json::from_str(&detail_payload(serde_json::json!({ "model": "X" })))
                .expect("json");
        assert_eq!(detail["result"]["properties"]["model"], "X");
    }

    #[test]
    fn mock_catalog_records_requested_paths() {
        let catalog = MockCatalog::start(vec![MockRoute::json(
            collection_path(ResourceKind::Starships),
            results_payload(&[]),
        )])
        .expect("mock catalog should start");
        assert!(catalog.base_url().ends_with("/api"));
        assert!(catalog.requests().is_empty());
        assert_eq!(collection_path(ResourceKind::Starships), "/api/starships/");
    }
}
