//! Response catalog: topic name to a fixed list of canned replies.
//!
//! The built-in table covers the five sports the service has always
//! answered for. A TOML file with a `[topics]` table can replace it.

use std::collections::BTreeMap;
use std::path::Path;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{HuddleError, Result};

const RUGBY: &[&str] = &[
    "Le rugby est un sport de combat collectif qui se joue à 15 contre 15.",
    "Le XV de France a remporté le Tournoi des Six Nations en 2022.",
    "La Coupe du Monde de Rugby se déroule tous les quatre ans.",
    "L'essai vaut 5 points, la transformation 2 points et le drop ou la pénalité 3 points.",
];

const FOOTBALL: &[&str] = &[
    "Le football se joue à 11 contre 11 avec un ballon rond.",
    "La Coupe du Monde de football a lieu tous les quatre ans.",
    "Le Real Madrid est le club le plus titré en Ligue des Champions.",
    "Un match de football dure 90 minutes, réparties en deux mi-temps de 45 minutes.",
];

const TENNIS: &[&str] = &[
    "Le tennis se joue en simple (1 contre 1) ou en double (2 contre 2).",
    "Les quatre tournois du Grand Chelem sont l'Open d'Australie, Roland-Garros, Wimbledon et l'US Open.",
    "Le service alterne tous les deux points, et les joueurs changent de côté tous les jeux impairs.",
    "Le tie-break se joue à 6-6 dans la plupart des sets.",
];

const VOLLEY: &[&str] = &[
    "Le volleyball se joue à 6 contre 6 sur un terrain séparé par un filet.",
    "Chaque équipe peut toucher le ballon trois fois avant de le renvoyer.",
    "Un match se joue en trois sets gagnants de 25 points (avec 2 points d'écart).",
    "La position des joueurs sur le terrain est réglementée et doit suivre un ordre précis.",
];

const CYCLISME: &[&str] = &[
    "Le Tour de France est la plus célèbre course cycliste au monde.",
    "Le cyclisme sur route comprend différents types d'épreuves : contre-la-montre, courses en ligne, etc.",
    "Le maillot jaune est porté par le leader du classement général du Tour de France.",
    "Un vélo de course pèse environ 7 kg et doit respecter des normes précises fixées par l'UCI.",
];

/// Read-only mapping from topic to its canned responses.
///
/// Every topic key is lower case and maps to a non-empty list of non-blank
/// strings; construction rejects anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseCatalog {
    topics: BTreeMap<String, Vec<String>>,
}

impl ResponseCatalog {
    /// Build a catalog from an explicit table, validating every entry.
    pub fn new(topics: BTreeMap<String, Vec<String>>) -> Result<Self> {
        if topics.is_empty() {
            return Err(HuddleError::Config(
                "response catalog must define at least one topic".to_string(),
            ));
        }
        for (topic, responses) in &topics {
            if topic.trim().is_empty() || *topic != topic.to_lowercase() {
                return Err(HuddleError::Config(format!(
                    "topic '{}' must be a non-empty lower-case key",
                    topic
                )));
            }
            if responses.is_empty() {
                return Err(HuddleError::Config(format!(
                    "topic '{}' has no responses",
                    topic
                )));
            }
            if responses.iter().any(|r| r.trim().is_empty()) {
                return Err(HuddleError::Config(format!(
                    "topic '{}' contains a blank response",
                    topic
                )));
            }
        }
        Ok(Self { topics })
    }

    /// The table shipped with the service.
    pub fn builtin() -> Self {
        let table: [(&str, &[&str]); 5] = [
            ("rugby", RUGBY),
            ("football", FOOTBALL),
            ("tennis", TENNIS),
            ("volley", VOLLEY),
            ("cyclisme", CYCLISME),
        ];
        let topics = table
            .iter()
            .map(|(topic, responses)| {
                (
                    topic.to_string(),
                    responses.iter().map(|r| r.to_string()).collect(),
                )
            })
            .collect();
        Self { topics }
    }

    /// Load a catalog from a TOML file containing a `[topics]` table.
    pub fn load(path: &Path) -> Result<Self> {
        #[derive(Deserialize)]
        struct CatalogFile {
            topics: BTreeMap<String, Vec<String>>,
        }

        let content = std::fs::read_to_string(path)?;
        let file: CatalogFile = toml::from_str(&content)?;
        let catalog = Self::new(file.topics)?;
        info!(
            topics = catalog.len(),
            "Response catalog loaded from {}",
            path.display()
        );
        Ok(catalog)
    }

    /// Load from `path` when given, otherwise use the built-in table.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::builtin()),
        }
    }

    /// Responses for a topic. The lookup is exact; callers normalize case.
    pub fn get(&self, topic: &str) -> Option<&[String]> {
        self.topics.get(topic).map(Vec::as_slice)
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    /// Topic names in sorted order.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Draw one response for `topic` uniformly at random.
    pub fn pick(&self, topic: &str) -> Option<&str> {
        self.pick_with(topic, &mut rand::rng())
    }

    /// Same as [`pick`](Self::pick) with a caller-supplied generator.
    pub fn pick_with<R: Rng + ?Sized>(&self, topic: &str, rng: &mut R) -> Option<&str> {
        self.get(topic)
            .and_then(|responses| responses.choose(rng))
            .map(String::as_str)
    }
}

impl Default for ResponseCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
