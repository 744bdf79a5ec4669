// ☑️ Selection - product requirements with user deselection
// Guards the matcher: an empty selection never reaches it.

use crate::dataset::Dataset;
use crate::entities::{Capability, CapabilityId, ProductId};
use crate::matcher::{match_requirements, CapabilityIndex, EmptySelection, MatchReport, RequirementSet};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

/// Result of evaluating a selection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "report", rename_all = "snake_case")]
pub enum MatchOutcome {
    /// Every requirement was deselected; matching was not attempted
    NoSelection,

    /// Matching ran and nothing covers the requirements
    NoMatches,

    Matches(MatchReport),
}

impl MatchOutcome {
    pub fn report(&self) -> Option<&MatchReport> {
        match self {
            MatchOutcome::Matches(report) => Some(report),
            _ => None,
        }
    }
}

/// One requirement row: capability plus its checkbox state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequirementChoice {
    pub capability: Capability,
    pub selected: bool,
}

/// Requirements of one product, each selected unless the user unticks it
#[derive(Debug, Clone)]
pub struct Selection {
    product: ProductId,
    requirements: Vec<Capability>,
    excluded: BTreeSet<CapabilityId>,
}

impl Selection {
    /// All of the product's requirements, selected, in capability table order
    pub fn for_product(dataset: &Dataset, product: ProductId) -> Self {
        Selection {
            product,
            requirements: dataset
                .requirements_of(product)
                .into_iter()
                .cloned()
                .collect(),
            excluded: BTreeSet::new(),
        }
    }

    pub fn product(&self) -> ProductId {
        self.product
    }

    pub fn requirements(&self) -> &[Capability] {
        &self.requirements
    }

    pub fn choices(&self) -> Vec<RequirementChoice> {
        self.requirements
            .iter()
            .map(|cap| RequirementChoice {
                capability: cap.clone(),
                selected: !self.excluded.contains(&cap.id),
            })
            .collect()
    }

    pub fn is_selected(&self, id: CapabilityId) -> bool {
        self.requirements.iter().any(|cap| cap.id == id) && !self.excluded.contains(&id)
    }

    /// Flip one checkbox; ids outside the product's requirements are ignored
    pub fn toggle(&mut self, id: CapabilityId) {
        if !self.requirements.iter().any(|cap| cap.id == id) {
            return;
        }
        if !self.excluded.remove(&id) {
            self.excluded.insert(id);
        }
    }

    pub fn deselect(&mut self, id: CapabilityId) {
        if self.requirements.iter().any(|cap| cap.id == id) {
            self.excluded.insert(id);
        }
    }

    pub fn select(&mut self, id: CapabilityId) {
        self.excluded.remove(&id);
    }

    pub fn selected(&self) -> impl Iterator<Item = &Capability> {
        self.requirements
            .iter()
            .filter(|cap| !self.excluded.contains(&cap.id))
    }

    pub fn requirement_set(&self) -> Result<RequirementSet, EmptySelection> {
        RequirementSet::new(self.selected().map(|cap| cap.id))
    }

    /// Evaluate with a caller-supplied matcher; `run` is only called for a
    /// non-empty selection
    pub fn evaluate_with<F>(&self, run: F) -> MatchOutcome
    where
        F: FnOnce(&RequirementSet) -> MatchReport,
    {
        let requirements = match self.requirement_set() {
            Ok(requirements) => requirements,
            Err(EmptySelection) => {
                debug!(product = %self.product, "empty selection, matching skipped");
                return MatchOutcome::NoSelection;
            }
        };

        let report = run(&requirements);
        if report.is_empty() {
            MatchOutcome::NoMatches
        } else {
            MatchOutcome::Matches(report)
        }
    }

    pub fn evaluate(&self, index: &CapabilityIndex) -> MatchOutcome {
        self.evaluate_with(|requirements| match_requirements(index, requirements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Company, CompanyId, Product};

    fn dataset() -> Dataset {
        Dataset::from_parts(
            vec![
                Capability::new(1, "Fræsning"),
                Capability::new(2, "Drejning"),
                Capability::new(3, "Svejsning"),
            ],
            vec![Product::new(10, "Beslag"), Product::new(11, "Tomt")],
            vec![Company::new(1, "A"), Company::new(2, "B"), Company::new(3, "C")],
            vec![
                (ProductId(10), CapabilityId(1)),
                (ProductId(10), CapabilityId(2)),
                (ProductId(10), CapabilityId(3)),
            ],
            vec![
                (CompanyId(1), CapabilityId(1)),
                (CompanyId(1), CapabilityId(2)),
                (CompanyId(2), CapabilityId(3)),
                (CompanyId(3), CapabilityId(1)),
                (CompanyId(3), CapabilityId(2)),
                (CompanyId(3), CapabilityId(3)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_all_requirements_selected_by_default() {
        let ds = dataset();
        let selection = Selection::for_product(&ds, ProductId(10));

        assert_eq!(selection.selected().count(), 3);
        assert!(selection.choices().iter().all(|c| c.selected));
    }

    #[test]
    fn test_toggle_flips_and_ignores_foreign_ids() {
        let ds = dataset();
        let mut selection = Selection::for_product(&ds, ProductId(10));

        selection.toggle(CapabilityId(2));
        assert!(!selection.is_selected(CapabilityId(2)));
        selection.toggle(CapabilityId(2));
        assert!(selection.is_selected(CapabilityId(2)));

        selection.toggle(CapabilityId(99));
        assert!(!selection.is_selected(CapabilityId(99)));
        assert_eq!(selection.selected().count(), 3);
    }

    #[test]
    fn test_guard_fires_before_matching() {
        let ds = dataset();
        let mut selection = Selection::for_product(&ds, ProductId(10));
        for id in [1, 2, 3] {
            selection.deselect(CapabilityId(id));
        }

        let outcome = selection.evaluate_with(|_| panic!("matcher must not run on empty selection"));

        assert_eq!(outcome, MatchOutcome::NoSelection);
        assert_eq!(selection.requirement_set(), Err(EmptySelection));
    }

    #[test]
    fn test_product_without_requirements_is_no_selection() {
        let ds = dataset();
        let selection = Selection::for_product(&ds, ProductId(11));

        assert_eq!(selection.evaluate(&ds.capability_index()), MatchOutcome::NoSelection);
    }

    #[test]
    fn test_no_matches_is_distinct_from_no_selection() {
        let ds = dataset();
        let selection = Selection::for_product(&ds, ProductId(10));

        let outcome = selection.evaluate_with(|_| MatchReport::default());

        assert_eq!(outcome, MatchOutcome::NoMatches);
        assert_ne!(outcome, MatchOutcome::NoSelection);
    }

    #[test]
    fn test_deselection_widens_full_matches() {
        let ds = dataset();
        let index = ds.capability_index();
        let mut selection = Selection::for_product(&ds, ProductId(10));

        let all = selection.evaluate(&index);
        assert_eq!(all.report().unwrap().full, [CompanyId(3)].into_iter().collect());

        selection.deselect(CapabilityId(3));
        let trimmed = selection.evaluate(&index);
        assert_eq!(
            trimmed.report().unwrap().full,
            [CompanyId(1), CompanyId(3)].into_iter().collect()
        );
    }
}
