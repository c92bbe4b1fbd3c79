use crate::algorithms::initializer::ParameterInitializer;
use crate::error::{ModelError, Result};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Entities that carry explicit parameters: a latent vector and, in bias
/// mode, a bias scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    User,
    Item,
}

/// The four families of latent vectors a model owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VectorKind {
    User,
    Item,
    PositiveImplicit,
    NegativeImplicit,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::User => f.write_str("User"),
            EntityKind::Item => f.write_str("Item"),
        }
    }
}

/// Lazily materialized per-entity parameters.
///
/// Lookups through [`ParameterStore::vector_for`] and
/// [`ParameterStore::bias_for`] never fail: an unknown id gets fresh random
/// parameters which are then kept and mutated in place for the rest of the
/// store's life. Nothing is ever removed.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    dimension: usize,
    user_vectors: HashMap<String, DVector<f64>>,
    item_vectors: HashMap<String, DVector<f64>>,
    positive_implicit_vectors: HashMap<String, DVector<f64>>,
    negative_implicit_vectors: HashMap<String, DVector<f64>>,
    user_biases: HashMap<String, f64>,
    item_biases: HashMap<String, f64>,
    initializer: ParameterInitializer,
}

/// Plain, ordered form of a [`ParameterStore`] used for checkpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    pub user_vectors: BTreeMap<String, Vec<f64>>,
    pub item_vectors: BTreeMap<String, Vec<f64>>,
    pub positive_implicit_vectors: BTreeMap<String, Vec<f64>>,
    pub negative_implicit_vectors: BTreeMap<String, Vec<f64>>,
    pub user_biases: BTreeMap<String, f64>,
    pub item_biases: BTreeMap<String, f64>,
}

impl ParameterStore {
    pub fn new(dimension: usize, initializer: ParameterInitializer) -> Self {
        Self {
            dimension,
            user_vectors: HashMap::new(),
            item_vectors: HashMap::new(),
            positive_implicit_vectors: HashMap::new(),
            negative_implicit_vectors: HashMap::new(),
            user_biases: HashMap::new(),
            item_biases: HashMap::new(),
            initializer,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Returns the vector for `id`, creating a random one on first access.
    pub fn vector_for(&mut self, kind: VectorKind, id: &str) -> &mut DVector<f64> {
        let dimension = self.dimension;
        let initializer = &mut self.initializer;
        let vectors = match kind {
            VectorKind::User => &mut self.user_vectors,
            VectorKind::Item => &mut self.item_vectors,
            VectorKind::PositiveImplicit => &mut self.positive_implicit_vectors,
            VectorKind::NegativeImplicit => &mut self.negative_implicit_vectors,
        };
        vectors
            .entry(id.to_owned())
            .or_insert_with(|| initializer.uniform_vector(dimension))
    }

    /// Returns the bias for `id`, creating a random one on first access.
    pub fn bias_for(&mut self, kind: EntityKind, id: &str) -> &mut f64 {
        let initializer = &mut self.initializer;
        let biases = match kind {
            EntityKind::User => &mut self.user_biases,
            EntityKind::Item => &mut self.item_biases,
        };
        biases
            .entry(id.to_owned())
            .or_insert_with(|| initializer.uniform_scalar())
    }

    pub fn vector(&self, kind: VectorKind, id: &str) -> Option<&DVector<f64>> {
        self.vectors(kind).get(id)
    }

    pub fn bias(&self, kind: EntityKind, id: &str) -> Option<f64> {
        self.biases(kind).get(id).copied()
    }

    pub fn vector_count(&self, kind: VectorKind) -> usize {
        self.vectors(kind).len()
    }

    pub fn bias_count(&self, kind: EntityKind) -> usize {
        self.biases(kind).len()
    }

    fn vectors(&self, kind: VectorKind) -> &HashMap<String, DVector<f64>> {
        match kind {
            VectorKind::User => &self.user_vectors,
            VectorKind::Item => &self.item_vectors,
            VectorKind::PositiveImplicit => &self.positive_implicit_vectors,
            VectorKind::NegativeImplicit => &self.negative_implicit_vectors,
        }
    }

    fn biases(&self, kind: EntityKind) -> &HashMap<String, f64> {
        match kind {
            EntityKind::User => &self.user_biases,
            EntityKind::Item => &self.item_biases,
        }
    }

    pub fn snapshot(&self) -> ParameterSnapshot {
        fn vectors(map: &HashMap<String, DVector<f64>>) -> BTreeMap<String, Vec<f64>> {
            map.iter()
                .map(|(id, v)| (id.clone(), v.as_slice().to_vec()))
                .collect()
        }
        fn biases(map: &HashMap<String, f64>) -> BTreeMap<String, f64> {
            map.iter().map(|(id, b)| (id.clone(), *b)).collect()
        }

        ParameterSnapshot {
            user_vectors: vectors(&self.user_vectors),
            item_vectors: vectors(&self.item_vectors),
            positive_implicit_vectors: vectors(&self.positive_implicit_vectors),
            negative_implicit_vectors: vectors(&self.negative_implicit_vectors),
            user_biases: biases(&self.user_biases),
            item_biases: biases(&self.item_biases),
        }
    }

    /// Rebuilds a store from a snapshot. Every vector must have exactly
    /// `dimension` coordinates.
    pub fn from_snapshot(
        snapshot: ParameterSnapshot,
        dimension: usize,
        initializer: ParameterInitializer,
    ) -> Result<Self> {
        fn vectors(
            map: BTreeMap<String, Vec<f64>>,
            dimension: usize,
            family: &str,
        ) -> Result<HashMap<String, DVector<f64>>> {
            map.into_iter()
                .map(|(id, values)| {
                    if values.len() != dimension {
                        return Err(ModelError::invalid(format!(
                            "{} vector for {} has {} factors, expected {}",
                            family,
                            id,
                            values.len(),
                            dimension
                        )));
                    }
                    Ok((id, DVector::from_vec(values)))
                })
                .collect()
        }

        Ok(Self {
            dimension,
            user_vectors: vectors(snapshot.user_vectors, dimension, "user")?,
            item_vectors: vectors(snapshot.item_vectors, dimension, "item")?,
            positive_implicit_vectors: vectors(
                snapshot.positive_implicit_vectors,
                dimension,
                "positive implicit",
            )?,
            negative_implicit_vectors: vectors(
                snapshot.negative_implicit_vectors,
                dimension,
                "negative implicit",
            )?,
            user_biases: snapshot.user_biases.into_iter().collect(),
            item_biases: snapshot.item_biases.into_iter().collect(),
            initializer,
        })
    }
}
