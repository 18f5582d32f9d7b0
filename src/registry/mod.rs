// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Read-only catalog of the node kinds a host exposes.
//!
//! The registry is populated once at service startup from the host catalog
//! and never mutated by commands. A host whose catalog changes mid-session
//! does not retroactively invalidate graphs built against the snapshot; that
//! consistency boundary is deliberate.

use std::collections::BTreeMap;

use crate::model::{KindId, NodeKind};

/// Fuzzy-match score (0..=100) a wrong kind id must reach before it is worth
/// suggesting a correction to the caller.
const SUGGESTION_MIN_SCORE: f64 = 62.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("host catalog declares kind '{kind_id}' more than once")]
    DuplicateKind { kind_id: KindId },
    #[error("host catalog is empty")]
    EmptyCatalog,
}

#[derive(Debug)]
pub struct SchemaRegistry {
    kinds: Vec<NodeKind>,
    index: BTreeMap<KindId, usize>,
}

impl SchemaRegistry {
    /// Builds the startup snapshot. Registration order is preserved and is
    /// the order `kinds()` reports forever after.
    pub fn from_catalog(kinds: Vec<NodeKind>) -> Result<Self, CatalogError> {
        if kinds.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }

        let mut index = BTreeMap::new();
        for (position, kind) in kinds.iter().enumerate() {
            if index.insert(kind.kind_id().clone(), position).is_some() {
                return Err(CatalogError::DuplicateKind {
                    kind_id: kind.kind_id().clone(),
                });
            }
        }

        Ok(Self { kinds, index })
    }

    pub fn lookup(&self, kind_id: &KindId) -> Option<&NodeKind> {
        self.index.get(kind_id).map(|&position| &self.kinds[position])
    }

    /// All kinds in registration order.
    pub fn kinds(&self) -> &[NodeKind] {
        &self.kinds
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Closest catalog entry to an unknown kind id, for error hints.
    pub fn suggest(&self, unknown: &str) -> Option<&KindId> {
        let mut best: Option<(&KindId, f64)> = None;
        for kind in &self.kinds {
            let score = rapidfuzz::fuzz::ratio(unknown.chars(), kind.kind_id().as_str().chars());
            if score < SUGGESTION_MIN_SCORE {
                continue;
            }
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((kind.kind_id(), score));
            }
        }
        best.map(|(kind_id, _)| kind_id)
    }
}

#[cfg(test)]
mod tests {
    use super::{CatalogError, SchemaRegistry};
    use crate::model::{DataType, KindId, NodeKind, PinSpec};

    fn kind(id: &str) -> NodeKind {
        NodeKind::new(
            KindId::new(id).expect("kind id"),
            id,
            [PinSpec::new("in", DataType::Float)],
            [PinSpec::new("out", DataType::Float)],
        )
    }

    fn registry() -> SchemaRegistry {
        SchemaRegistry::from_catalog(vec![
            kind("math.add"),
            kind("math.compare"),
            kind("string.format"),
        ])
        .expect("registry")
    }

    #[test]
    fn lookup_hits_and_misses() {
        let registry = registry();
        let add = KindId::new("math.add").expect("kind id");
        assert!(registry.lookup(&add).is_some());

        let missing = KindId::new("math.sub").expect("kind id");
        assert!(registry.lookup(&missing).is_none());
    }

    #[test]
    fn kinds_keep_registration_order() {
        let registry = registry();
        let ids: Vec<&str> = registry.kinds().iter().map(|k| k.kind_id().as_str()).collect();
        assert_eq!(ids, ["math.add", "math.compare", "string.format"]);
    }

    #[test]
    fn duplicate_kinds_are_rejected() {
        let result = SchemaRegistry::from_catalog(vec![kind("math.add"), kind("math.add")]);
        assert!(matches!(result, Err(CatalogError::DuplicateKind { .. })));
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert_eq!(
            SchemaRegistry::from_catalog(Vec::new()).unwrap_err(),
            CatalogError::EmptyCatalog
        );
    }

    #[test]
    fn near_misses_get_a_suggestion_and_garbage_does_not() {
        let registry = registry();
        assert_eq!(
            registry.suggest("math.ad").map(|k| k.as_str()),
            Some("math.add")
        );
        assert_eq!(registry.suggest("zzzzqq"), None);
    }
}
