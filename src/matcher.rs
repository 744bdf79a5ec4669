// 🧩 Capability Matcher - which companies cover a product's requirements
// Three result classes: Full Match (one company), Pair, Triple
//
// Pure functions over in-memory snapshots: no I/O, no shared state.
// Matching is boolean subset coverage, nothing is scored.

use crate::entities::{CapabilityId, CompanyId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

// ============================================================================
// REQUIREMENT SET
// ============================================================================

/// No capability was selected, so there is nothing to match against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no capabilities selected - select at least one capability to see matches")]
pub struct EmptySelection;

/// Non-empty set of required capabilities
///
/// Every company covers the empty set, so an empty requirement would match
/// everything. The constructor refuses it instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequirementSet(BTreeSet<CapabilityId>);

impl RequirementSet {
    pub fn new<I>(ids: I) -> Result<Self, EmptySelection>
    where
        I: IntoIterator,
        I::Item: Into<CapabilityId>,
    {
        let set: BTreeSet<CapabilityId> = ids.into_iter().map(Into::into).collect();
        if set.is_empty() {
            return Err(EmptySelection);
        }
        Ok(RequirementSet(set))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: CapabilityId) -> bool {
        self.0.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = CapabilityId> + '_ {
        self.0.iter().copied()
    }

    pub fn as_set(&self) -> &BTreeSet<CapabilityId> {
        &self.0
    }

    /// R ⊆ capabilities
    pub fn is_covered_by(&self, capabilities: &BTreeSet<CapabilityId>) -> bool {
        self.0.is_subset(capabilities)
    }

    /// R ⊆ ∪ sets, checked per requirement without materializing the union
    pub fn is_covered_by_union(&self, sets: &[&BTreeSet<CapabilityId>]) -> bool {
        self.0
            .iter()
            .all(|cap| sets.iter().any(|set| set.contains(cap)))
    }
}

// ============================================================================
// CAPABILITY INDEX (matcher input)
// ============================================================================

/// One company as the matcher sees it
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyEntry {
    pub id: CompanyId,
    pub name: Option<String>,
    pub capabilities: BTreeSet<CapabilityId>,
}

impl CompanyEntry {
    /// Only named companies take part in combination search
    pub fn is_combinable(&self) -> bool {
        self.name.is_some()
    }
}

/// Company → capability set, plus company → name
#[derive(Debug, Clone, Default)]
pub struct CapabilityIndex {
    companies: BTreeMap<CompanyId, CompanyEntry>,
}

impl CapabilityIndex {
    pub fn new() -> Self {
        CapabilityIndex::default()
    }

    /// Build from the two mappings the caller holds
    pub fn from_maps(
        capabilities: &BTreeMap<CompanyId, BTreeSet<CapabilityId>>,
        names: &BTreeMap<CompanyId, String>,
    ) -> Self {
        let mut index = CapabilityIndex::new();
        for (id, caps) in capabilities {
            index.insert(*id, names.get(id).cloned(), caps.iter().copied());
        }
        index
    }

    /// Add a company; inserting the same id twice merges capability sets
    pub fn insert<I>(&mut self, id: CompanyId, name: Option<String>, capabilities: I)
    where
        I: IntoIterator,
        I::Item: Into<CapabilityId>,
    {
        let entry = self.companies.entry(id).or_insert_with(|| CompanyEntry {
            id,
            name: None,
            capabilities: BTreeSet::new(),
        });
        if name.is_some() {
            entry.name = name;
        }
        entry
            .capabilities
            .extend(capabilities.into_iter().map(Into::into));
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    pub fn get(&self, id: CompanyId) -> Option<&CompanyEntry> {
        self.companies.get(&id)
    }

    /// Entries in ascending id order
    pub fn entries(&self) -> impl Iterator<Item = &CompanyEntry> {
        self.companies.values()
    }

    /// Display name, or `#id` when the company has none
    pub fn display_name(&self, id: CompanyId) -> String {
        match self.get(id).and_then(|e| e.name.as_ref()) {
            Some(name) => name.clone(),
            None => format!("#{}", id),
        }
    }
}

// ============================================================================
// COMBINATION GENERATOR
// ============================================================================

/// Lazy k-of-n index combinations in lexicographic order
///
/// Yields `[0,1,2], [0,1,3], …, [n-3,n-2,n-1]` for k = 3. Finite; build a new
/// one to restart.
#[derive(Debug, Clone)]
pub struct Combinations {
    n: usize,
    indices: Vec<usize>,
    started: bool,
    done: bool,
}

impl Combinations {
    pub fn new(n: usize, k: usize) -> Self {
        Combinations {
            n,
            indices: (0..k).collect(),
            started: false,
            done: k > n,
        }
    }

    /// Advance `indices` to the next combination; false when exhausted
    fn advance(&mut self) -> bool {
        let k = self.indices.len();

        // Rightmost position that has not reached its maximum value
        let mut i = k;
        while i > 0 {
            i -= 1;
            if self.indices[i] != i + self.n - k {
                self.indices[i] += 1;
                for j in (i + 1)..k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
                return true;
            }
        }

        false
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if !self.started {
            self.started = true;
        } else if !self.advance() {
            self.done = true;
            return None;
        }

        Some(self.indices.clone())
    }
}

/// C(n, k), saturating
pub fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: usize = 1;
    for i in 0..k {
        result = result.saturating_mul(n - i) / (i + 1);
    }
    result
}

// ============================================================================
// COMBINATION MATCHES
// ============================================================================

/// Size of a company combination; larger groups are not searched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombinationSize {
    Pair,
    Triple,
}

impl CombinationSize {
    pub fn len(self) -> usize {
        match self {
            CombinationSize::Pair => 2,
            CombinationSize::Triple => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CombinationSize::Pair => "Kombi 2",
            CombinationSize::Triple => "Kombi 3",
        }
    }
}

/// Distinct companies that together cover the requirements
///
/// Members are kept in ascending id order, so two combinations with the same
/// companies are equal regardless of how they were found.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CompanyCombination {
    pub members: Vec<CompanyId>,
    pub label: String,
}

impl CompanyCombination {
    pub fn from_entries(entries: &[&CompanyEntry]) -> Self {
        let mut sorted: Vec<&CompanyEntry> = entries.to_vec();
        sorted.sort_by_key(|e| e.id);
        sorted.dedup_by_key(|e| e.id);

        let label = sorted
            .iter()
            .map(|e| match &e.name {
                Some(name) => name.clone(),
                None => format!("#{}", e.id),
            })
            .collect::<Vec<_>>()
            .join(" + ");

        CompanyCombination {
            members: sorted.iter().map(|e| e.id).collect(),
            label,
        }
    }

    pub fn contains(&self, id: CompanyId) -> bool {
        self.members.contains(&id)
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }
}

// ============================================================================
// MATCH OPERATIONS
// ============================================================================

/// Every company whose own capability set covers the requirements
pub fn find_full_matches(
    index: &CapabilityIndex,
    requirements: &RequirementSet,
) -> BTreeSet<CompanyId> {
    index
        .entries()
        .filter(|entry| requirements.is_covered_by(&entry.capabilities))
        .map(|entry| entry.id)
        .collect()
}

/// Every combination of `size` distinct named companies whose union covers
/// the requirements
///
/// O(n²) evaluations for pairs and O(n³) for triples over the n named
/// companies. Fine for tens to low hundreds of companies.
pub fn find_combination_matches(
    index: &CapabilityIndex,
    requirements: &RequirementSet,
    size: CombinationSize,
) -> Vec<CompanyCombination> {
    let eligible: Vec<&CompanyEntry> = index.entries().filter(|e| e.is_combinable()).collect();

    debug!(
        eligible = eligible.len(),
        size = size.len(),
        candidates = binomial(eligible.len(), size.len()),
        "searching company combinations"
    );

    let mut matches = Vec::new();
    let mut members: Vec<&CompanyEntry> = Vec::with_capacity(size.len());
    let mut sets: Vec<&BTreeSet<CapabilityId>> = Vec::with_capacity(size.len());

    for combo in Combinations::new(eligible.len(), size.len()) {
        members.clear();
        sets.clear();
        for &i in &combo {
            members.push(eligible[i]);
            sets.push(&eligible[i].capabilities);
        }

        if requirements.is_covered_by_union(&sets) {
            matches.push(CompanyCombination::from_entries(&members));
        }
    }

    matches
}

/// Counts per result class, in chart order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MatchSummary {
    pub individual: usize,
    pub pairs: usize,
    pub triples: usize,
}

impl MatchSummary {
    pub const LABEL_INDIVIDUAL: &'static str = "Individuelt";

    /// (Matchtype, Antal) rows for the overview chart
    pub fn rows(&self) -> [(&'static str, usize); 3] {
        [
            (Self::LABEL_INDIVIDUAL, self.individual),
            (CombinationSize::Pair.label(), self.pairs),
            (CombinationSize::Triple.label(), self.triples),
        ]
    }

    pub fn total(&self) -> usize {
        self.individual + self.pairs + self.triples
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

pub fn summarize(
    full: &BTreeSet<CompanyId>,
    pairs: &[CompanyCombination],
    triples: &[CompanyCombination],
) -> MatchSummary {
    MatchSummary {
        individual: full.len(),
        pairs: pairs.len(),
        triples: triples.len(),
    }
}

/// All three result classes for one requirement set
///
/// Classes are not exclusive: a full-match company also shows up inside
/// pairs and triples.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MatchReport {
    pub full: BTreeSet<CompanyId>,
    pub pairs: Vec<CompanyCombination>,
    pub triples: Vec<CompanyCombination>,
}

impl MatchReport {
    pub fn summary(&self) -> MatchSummary {
        summarize(&self.full, &self.pairs, &self.triples)
    }

    pub fn is_empty(&self) -> bool {
        self.summary().is_empty()
    }

    pub fn combinations(&self, size: CombinationSize) -> &[CompanyCombination] {
        match size {
            CombinationSize::Pair => &self.pairs,
            CombinationSize::Triple => &self.triples,
        }
    }

    /// Full-match company names, sorted alphabetically
    pub fn full_labels(&self, index: &CapabilityIndex) -> Vec<String> {
        let mut labels: Vec<String> = self.full.iter().map(|id| index.display_name(*id)).collect();
        labels.sort();
        labels
    }

    /// Combinations of one size, sorted by label
    pub fn sorted_combinations(&self, size: CombinationSize) -> Vec<&CompanyCombination> {
        let mut combos: Vec<&CompanyCombination> = self.combinations(size).iter().collect();
        combos.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.members.cmp(&b.members)));
        combos
    }
}

/// Run full, pair and triple search
pub fn match_requirements(index: &CapabilityIndex, requirements: &RequirementSet) -> MatchReport {
    let full = find_full_matches(index, requirements);
    let pairs = find_combination_matches(index, requirements, CombinationSize::Pair);
    let triples = find_combination_matches(index, requirements, CombinationSize::Triple);

    let report = MatchReport { full, pairs, triples };
    let summary = report.summary();
    debug!(
        requirements = requirements.len(),
        companies = index.len(),
        individual = summary.individual,
        pairs = summary.pairs,
        triples = summary.triples,
        "matching finished"
    );

    report
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn req(ids: &[i64]) -> RequirementSet {
        RequirementSet::new(ids.iter().copied()).unwrap()
    }

    fn set(ids: &[i64]) -> BTreeSet<CapabilityId> {
        ids.iter().copied().map(CapabilityId).collect()
    }

    /// A={1,2}, B={3}, C={1,2,3}
    fn abc_index() -> CapabilityIndex {
        let mut index = CapabilityIndex::new();
        index.insert(CompanyId(1), Some("A".to_string()), [1i64, 2]);
        index.insert(CompanyId(2), Some("B".to_string()), [3i64]);
        index.insert(CompanyId(3), Some("C".to_string()), [1i64, 2, 3]);
        index
    }

    fn labels(combos: &[CompanyCombination]) -> Vec<String> {
        let mut labels: Vec<String> = combos.iter().map(|c| c.label.clone()).collect();
        labels.sort();
        labels
    }

    #[test]
    fn test_requirement_set_rejects_empty() {
        assert_eq!(RequirementSet::new(Vec::<i64>::new()), Err(EmptySelection));
    }

    #[test]
    fn test_requirement_set_collapses_duplicates() {
        let r = req(&[3, 1, 3, 1]);
        assert_eq!(r.len(), 2);
        assert!(r.contains(CapabilityId(1)));
        assert!(r.contains(CapabilityId(3)));
    }

    #[test]
    fn test_abc_scenario() {
        let index = abc_index();
        let report = match_requirements(&index, &req(&[1, 2, 3]));

        assert_eq!(report.full, [CompanyId(3)].into_iter().collect());
        assert_eq!(labels(&report.pairs), vec!["A + B", "A + C", "B + C"]);
        assert_eq!(labels(&report.triples), vec!["A + B + C"]);
        assert_eq!(
            report.summary(),
            MatchSummary {
                individual: 1,
                pairs: 3,
                triples: 1
            }
        );
    }

    #[test]
    fn test_full_matches_are_exact_partition() {
        let index = abc_index();
        let r = req(&[1, 2]);
        let full = find_full_matches(&index, &r);

        for entry in index.entries() {
            assert_eq!(full.contains(&entry.id), r.is_covered_by(&entry.capabilities));
        }
        assert_eq!(full, [CompanyId(1), CompanyId(3)].into_iter().collect());
    }

    #[test]
    fn test_every_reported_combination_covers_requirements() {
        let mut index = CapabilityIndex::new();
        for (id, caps) in [
            (1, vec![1i64]),
            (2, vec![2]),
            (3, vec![3]),
            (4, vec![1, 4]),
            (5, vec![]),
            (6, vec![2, 3]),
        ] {
            index.insert(CompanyId(id), Some(format!("Co{}", id)), caps);
        }
        let r = req(&[1, 2, 3]);

        for size in [CombinationSize::Pair, CombinationSize::Triple] {
            for combo in find_combination_matches(&index, &r, size) {
                assert_eq!(combo.size(), size.len());
                let union: BTreeSet<CapabilityId> = combo
                    .members
                    .iter()
                    .flat_map(|id| index.get(*id).unwrap().capabilities.iter().copied())
                    .collect();
                assert!(r.is_covered_by(&union), "{} does not cover", combo.label);
            }
        }
    }

    #[test]
    fn test_combination_members_are_distinct() {
        let index = abc_index();
        let report = match_requirements(&index, &req(&[1]));

        for combo in report.pairs.iter().chain(report.triples.iter()) {
            let unique: BTreeSet<CompanyId> = combo.members.iter().copied().collect();
            assert_eq!(unique.len(), combo.members.len());
        }
        // 3 companies → 3 pairs, 1 triple
        assert_eq!(report.pairs.len(), 3);
        assert_eq!(report.triples.len(), 1);
    }

    #[test]
    fn test_empty_capability_company_can_join_combination() {
        let mut index = CapabilityIndex::new();
        index.insert(CompanyId(1), Some("Full".to_string()), [1i64, 2]);
        index.insert(CompanyId(2), Some("Empty".to_string()), Vec::<i64>::new());

        let pairs = find_combination_matches(&index, &req(&[1, 2]), CombinationSize::Pair);

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].members, vec![CompanyId(1), CompanyId(2)]);
        assert_eq!(pairs[0].label, "Full + Empty");
    }

    #[test]
    fn test_nameless_company_only_matches_individually() {
        let mut index = abc_index();
        index.insert(CompanyId(4), None, [1i64, 2, 3]);
        let r = req(&[1, 2, 3]);

        let full = find_full_matches(&index, &r);
        assert!(full.contains(&CompanyId(4)));

        let pairs = find_combination_matches(&index, &r, CombinationSize::Pair);
        let triples = find_combination_matches(&index, &r, CombinationSize::Triple);
        assert!(pairs.iter().all(|c| !c.contains(CompanyId(4))));
        assert!(triples.iter().all(|c| !c.contains(CompanyId(4))));

        assert_eq!(index.display_name(CompanyId(4)), "#4");
    }

    #[test]
    fn test_single_requirement_boundary() {
        let mut index = CapabilityIndex::new();
        index.insert(CompanyId(7), Some("Solo".to_string()), [42i64]);

        let full = find_full_matches(&index, &req(&[42]));
        assert_eq!(full, [CompanyId(7)].into_iter().collect());
    }

    #[test]
    fn test_monotonicity_of_full_matches() {
        let index = abc_index();
        let wide = find_full_matches(&index, &req(&[1, 2, 3]));
        let narrow = find_full_matches(&index, &req(&[1, 2]));

        assert!(wide.is_subset(&narrow));
        assert!(narrow.len() > wide.len());
    }

    #[test]
    fn test_matching_is_idempotent() {
        let index = abc_index();
        let r = req(&[1, 3]);

        let first = match_requirements(&index, &r);
        let second = match_requirements(&index, &r);

        assert_eq!(first, second);
    }

    #[test]
    fn test_no_matches_is_empty_report() {
        let index = abc_index();
        let report = match_requirements(&index, &req(&[99]));

        assert!(report.is_empty());
        assert_eq!(report.summary().rows()[0], ("Individuelt", 0));
    }

    #[test]
    fn test_from_maps_keeps_unnamed_companies() {
        let mut caps = BTreeMap::new();
        caps.insert(CompanyId(1), set(&[1]));
        caps.insert(CompanyId(2), set(&[1]));
        let mut names = BTreeMap::new();
        names.insert(CompanyId(1), "Named".to_string());

        let index = CapabilityIndex::from_maps(&caps, &names);

        assert_eq!(index.len(), 2);
        assert!(index.get(CompanyId(1)).unwrap().is_combinable());
        assert!(!index.get(CompanyId(2)).unwrap().is_combinable());
    }

    #[test]
    fn test_combination_label_is_canonical() {
        let a = CompanyEntry {
            id: CompanyId(5),
            name: Some("Zeta".to_string()),
            capabilities: set(&[]),
        };
        let b = CompanyEntry {
            id: CompanyId(2),
            name: Some("Alfa".to_string()),
            capabilities: set(&[]),
        };

        let ab = CompanyCombination::from_entries(&[&a, &b]);
        let ba = CompanyCombination::from_entries(&[&b, &a]);

        assert_eq!(ab, ba);
        assert_eq!(ab.label, "Alfa + Zeta");
    }

    #[test]
    fn test_combinations_lexicographic() {
        let combos: Vec<Vec<usize>> = Combinations::new(4, 2).collect();
        assert_eq!(
            combos,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
    }

    #[test]
    fn test_combinations_count_matches_binomial() {
        for n in 0..9 {
            for k in 1..4 {
                assert_eq!(Combinations::new(n, k).count(), binomial(n, k), "C({}, {})", n, k);
            }
        }
        assert_eq!(binomial(100, 3), 161_700);
    }

    #[test]
    fn test_combinations_too_few_items() {
        assert_eq!(Combinations::new(2, 3).next(), None);
        assert_eq!(Combinations::new(0, 2).next(), None);
    }

    #[test]
    fn test_sorted_combinations_by_label() {
        let index = abc_index();
        let report = match_requirements(&index, &req(&[3]));
        let sorted: Vec<&str> = report
            .sorted_combinations(CombinationSize::Pair)
            .iter()
            .map(|c| c.label.as_str())
            .collect();

        assert_eq!(sorted, vec!["A + B", "A + C", "B + C"]);
        assert_eq!(report.full_labels(&index), vec!["B", "C"]);
    }
}
