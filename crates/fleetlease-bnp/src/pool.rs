// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Per-unit, per-family column pools with structural deduplication.

use crate::scheme::{Family, Scheme};
use fleetlease_model::index::EquipmentIndex;
use rustc_hash::{FxHashMap, FxHasher};
use smallvec::SmallVec;
use std::hash::{Hash, Hasher};

/// Schemes of one unit and one family.
///
/// Insertion order is preserved; it fixes the column order of the master
/// problem and therefore the determinism of the whole search.
#[derive(Debug, Clone, Default)]
pub struct ColumnPool {
    schemes: Vec<Scheme>,
    index: FxHashMap<u64, SmallVec<[usize; 2]>>,
}

#[inline]
fn fingerprint(scheme: &Scheme) -> u64 {
    let mut hasher = FxHasher::default();
    scheme.hash(&mut hasher);
    hasher.finish()
}

impl ColumnPool {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }

    #[inline]
    pub fn schemes(&self) -> &[Scheme] {
        &self.schemes
    }

    #[inline]
    pub fn get(&self, position: usize) -> Option<&Scheme> {
        self.schemes.get(position)
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Scheme> {
        self.schemes.iter()
    }

    /// `true` if a structurally identical scheme is pooled.
    pub fn contains(&self, scheme: &Scheme) -> bool {
        self.index
            .get(&fingerprint(scheme))
            .is_some_and(|hits| hits.iter().any(|&p| self.schemes[p] == *scheme))
    }

    /// Adds `scheme` unless an identical one is pooled. Returns its position.
    pub fn insert(&mut self, scheme: Scheme) -> Option<usize> {
        let key = fingerprint(&scheme);
        if let Some(hits) = self.index.get(&key)
            && hits.iter().any(|&p| self.schemes[p] == scheme)
        {
            return None;
        }
        let position = self.schemes.len();
        self.schemes.push(scheme);
        self.index.entry(key).or_default().push(position);
        Some(position)
    }

    /// Keeps only the schemes for which `keep` holds. Returns how many were removed.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&Scheme) -> bool,
    {
        let before = self.schemes.len();
        self.schemes.retain(|s| keep(s));
        let removed = before - self.schemes.len();
        if removed > 0 {
            self.reindex();
        }
        removed
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (position, scheme) in self.schemes.iter().enumerate() {
            self.index
                .entry(fingerprint(scheme))
                .or_default()
                .push(position);
        }
    }
}

/// All column pools of one node.
#[derive(Debug, Clone, Default)]
pub struct NodePools {
    lease: Vec<ColumnPool>,
    work: Vec<ColumnPool>,
}

impl NodePools {
    /// Empty pools for `num_equipment` units.
    pub fn new(num_equipment: usize) -> Self {
        Self {
            lease: vec![ColumnPool::new(); num_equipment],
            work: vec![ColumnPool::new(); num_equipment],
        }
    }

    /// The pool holding `family` columns of `equipment`. Work and combined
    /// columns share a pool since a layout never uses both.
    #[inline]
    pub fn pool(&self, equipment: EquipmentIndex, family: Family) -> &ColumnPool {
        match family {
            Family::Lease => &self.lease[equipment.get()],
            Family::Work | Family::Combined => &self.work[equipment.get()],
        }
    }

    #[inline]
    pub fn pool_mut(&mut self, equipment: EquipmentIndex, family: Family) -> &mut ColumnPool {
        match family {
            Family::Lease => &mut self.lease[equipment.get()],
            Family::Work | Family::Combined => &mut self.work[equipment.get()],
        }
    }

    #[inline]
    pub fn num_equipment(&self) -> usize {
        self.work.len()
    }

    /// Adds `scheme` to the pool of its unit and family.
    #[inline]
    pub fn insert(&mut self, scheme: Scheme) -> Option<usize> {
        let (e, f) = (scheme.equipment(), scheme.family());
        self.pool_mut(e, f).insert(scheme)
    }

    /// Keeps only the schemes for which `keep` holds, in every pool.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&Scheme) -> bool,
    {
        self.lease
            .iter_mut()
            .chain(self.work.iter_mut())
            .map(|p| p.retain(&mut keep))
            .sum()
    }

    /// Total number of pooled columns.
    pub fn num_columns(&self) -> usize {
        self.lease
            .iter()
            .chain(self.work.iter())
            .map(ColumnPool::len)
            .sum()
    }
}

impl<'a> IntoIterator for &'a ColumnPool {
    type Item = &'a Scheme;
    type IntoIter = std::slice::Iter<'a, Scheme>;

    fn into_iter(self) -> Self::IntoIter {
        self.schemes.iter()
    }
}
