use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MatchingError {
    #[error("a matching exercise needs at least one pair")]
    Empty,

    #[error("concept {0} has no matching definition")]
    Unpaired(u32),

    #[error("concept {0} does not exist")]
    UnknownConcept(u32),

    #[error("definition {0} does not exist")]
    UnknownDefinition(usize),

    #[error("concept {0} is already matched")]
    AlreadyMatched(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub id: u32,
    pub label: String,
    pub match_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    pub match_id: String,
    pub text: String,
}

/// Result of dropping a concept onto a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// `displaced` is a concept that occupied the zone and went back to the pool.
    Matched { displaced: Option<u32> },
    Mismatch { displaced: Option<u32> },
}

impl DropOutcome {
    #[must_use]
    pub fn is_match(self) -> bool {
        matches!(self, DropOutcome::Matched { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingExercise {
    concepts: Vec<Concept>,
    definitions: Vec<Definition>,
    /// Concept placed on each definition, indexed like `definitions`.
    placed: Vec<Option<u32>>,
    pool: Vec<u32>,
}

impl MatchingExercise {
    /// # Errors
    ///
    /// Returns `MatchingError::Empty` without concepts and
    /// `MatchingError::Unpaired` when a concept has no definition.
    pub fn new(concepts: Vec<Concept>, definitions: Vec<Definition>) -> Result<Self, MatchingError> {
        if concepts.is_empty() {
            return Err(MatchingError::Empty);
        }
        if let Some(orphan) = concepts
            .iter()
            .find(|c| !definitions.iter().any(|d| d.match_id == c.match_id))
        {
            return Err(MatchingError::Unpaired(orphan.id));
        }
        let pool = concepts.iter().map(|c| c.id).collect();
        let placed = vec![None; definitions.len()];
        Ok(Self {
            concepts,
            definitions,
            placed,
            pool,
        })
    }

    #[must_use]
    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    #[must_use]
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    #[must_use]
    pub fn pool(&self) -> &[u32] {
        &self.pool
    }

    #[must_use]
    pub fn placed_on(&self, definition: usize) -> Option<u32> {
        self.placed.get(definition).copied().flatten()
    }

    /// Drops `concept` onto the definition at `definition`. Whatever sat there
    /// returns to the pool first; only a correct match stays placed.
    ///
    /// # Errors
    ///
    /// Returns `MatchingError::UnknownConcept`, `MatchingError::UnknownDefinition`
    /// or `MatchingError::AlreadyMatched` for a concept that is already placed.
    pub fn drop_concept(
        &mut self,
        concept: u32,
        definition: usize,
    ) -> Result<DropOutcome, MatchingError> {
        let match_id = self
            .concepts
            .iter()
            .find(|c| c.id == concept)
            .map(|c| c.match_id.clone())
            .ok_or(MatchingError::UnknownConcept(concept))?;
        let target = self
            .definitions
            .get(definition)
            .ok_or(MatchingError::UnknownDefinition(definition))?;
        if self.placed.contains(&Some(concept)) {
            return Err(MatchingError::AlreadyMatched(concept));
        }
        let is_match = target.match_id == match_id;

        let displaced = self.placed[definition].take();
        if let Some(previous) = displaced {
            self.pool.push(previous);
        }

        if is_match {
            self.pool.retain(|id| *id != concept);
            self.placed[definition] = Some(concept);
            Ok(DropOutcome::Matched { displaced })
        } else {
            Ok(DropOutcome::Mismatch { displaced })
        }
    }

    /// Correct once every definition holds its concept.
    #[must_use]
    pub fn check(&self) -> bool {
        self.definitions.iter().zip(&self.placed).all(|(def, placed)| {
            placed.is_some_and(|id| {
                self.concepts
                    .iter()
                    .any(|c| c.id == id && c.match_id == def.match_id)
            })
        })
    }

    pub fn reset(&mut self) {
        self.placed.iter_mut().for_each(|slot| *slot = None);
        self.pool = self.concepts.iter().map(|c| c.id).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise() -> MatchingExercise {
        MatchingExercise::new(
            vec![
                Concept { id: 1, label: "list".into(), match_id: "list".into() },
                Concept { id: 2, label: "dict".into(), match_id: "dict".into() },
            ],
            vec![
                Definition { match_id: "dict".into(), text: "Key-value pairs".into() },
                Definition { match_id: "list".into(), text: "Ordered, mutable".into() },
            ],
        )
        .unwrap()
    }

    #[test]
    fn correct_drops_complete_the_exercise() {
        let mut ex = exercise();
        assert!(ex.drop_concept(1, 1).unwrap().is_match());
        assert!(!ex.check());
        assert!(ex.drop_concept(2, 0).unwrap().is_match());
        assert!(ex.check());
        assert!(ex.pool().is_empty());
    }

    #[test]
    fn mismatch_keeps_concept_in_pool() {
        let mut ex = exercise();
        assert_eq!(
            ex.drop_concept(1, 0).unwrap(),
            DropOutcome::Mismatch { displaced: None }
        );
        assert_eq!(ex.pool(), &[1, 2]);
        assert_eq!(ex.placed_on(0), None);
    }

    #[test]
    fn dropping_onto_occupied_zone_displaces_first() {
        let mut ex = exercise();
        ex.drop_concept(2, 0).unwrap();
        assert_eq!(
            ex.drop_concept(1, 0).unwrap(),
            DropOutcome::Mismatch { displaced: Some(2) }
        );
        assert!(ex.pool().contains(&2));
        assert_eq!(ex.placed_on(0), None);
    }

    #[test]
    fn placed_concept_cannot_be_dropped_again() {
        let mut ex = exercise();
        ex.drop_concept(1, 1).unwrap();
        assert_eq!(
            ex.drop_concept(1, 1).unwrap_err(),
            MatchingError::AlreadyMatched(1)
        );
        ex.reset();
        assert_eq!(ex.pool(), &[1, 2]);
        assert!(ex.drop_concept(1, 1).unwrap().is_match());
    }

    #[test]
    fn unpaired_concepts_are_rejected() {
        let err = MatchingExercise::new(
            vec![Concept { id: 7, label: "tuple".into(), match_id: "tuple".into() }],
            vec![Definition { match_id: "list".into(), text: "x".into() }],
        )
        .unwrap_err();
        assert_eq!(err, MatchingError::Unpaired(7));
    }
}
