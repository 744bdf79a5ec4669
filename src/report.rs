// 📊 Report - presentation-neutral view of one product match
// Used by the CLI (text / JSON), the terminal UI and the HTTP server.

use crate::dataset::Dataset;
use crate::entities::{CompanyProfile, Product};
use crate::matcher::{CapabilityIndex, CombinationSize, CompanyCombination, MatchSummary};
use crate::selection::{MatchOutcome, RequirementChoice, Selection};
use serde::Serialize;

pub const CHART_TITLE: &str = "Match-oversigt";
pub const EMPTY_SELECTION_HINT: &str = "Vælg mindst én kapabilitet for at se match.";
pub const NO_MATCHES_HINT: &str = "Ingen virksomheder dækker de valgte kapabiliteter.";

/// Everything a front end needs to show for one product
#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    pub product: Product,
    pub requirements: Vec<RequirementChoice>,
    pub status: ReportStatus,
    pub summary: MatchSummary,
    pub full: Vec<String>,
    pub pairs: Vec<String>,
    pub triples: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    NoSelection,
    NoMatches,
    Matches,
}

impl ReportView {
    pub fn build(
        product: &Product,
        selection: &Selection,
        outcome: &MatchOutcome,
        index: &CapabilityIndex,
    ) -> Self {
        let (status, summary, full, pairs, triples) = match outcome {
            MatchOutcome::NoSelection => (
                ReportStatus::NoSelection,
                MatchSummary::default(),
                Vec::new(),
                Vec::new(),
                Vec::new(),
            ),
            MatchOutcome::NoMatches => (
                ReportStatus::NoMatches,
                MatchSummary::default(),
                Vec::new(),
                Vec::new(),
                Vec::new(),
            ),
            MatchOutcome::Matches(report) => (
                ReportStatus::Matches,
                report.summary(),
                report.full_labels(index),
                labels(report.sorted_combinations(CombinationSize::Pair)),
                labels(report.sorted_combinations(CombinationSize::Triple)),
            ),
        };

        ReportView {
            product: product.clone(),
            requirements: selection.choices(),
            status,
            summary,
            full,
            pairs,
            triples,
        }
    }

    /// Plain-text rendering for the terminal
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("Produkt: {}\n\n", self.product.name));
        out.push_str("Kapabilitetskrav:\n");
        for choice in &self.requirements {
            let mark = if choice.selected { "x" } else { " " };
            out.push_str(&format!(
                "  [{}] {} ({})\n",
                mark, choice.capability.name, choice.capability.id
            ));
        }
        out.push('\n');

        match self.status {
            ReportStatus::NoSelection => {
                out.push_str(EMPTY_SELECTION_HINT);
                out.push('\n');
                return out;
            }
            ReportStatus::NoMatches => {
                out.push_str(&render_chart(&self.summary, 40));
                out.push('\n');
                out.push_str(NO_MATCHES_HINT);
                out.push('\n');
                return out;
            }
            ReportStatus::Matches => {}
        }

        out.push_str(&render_chart(&self.summary, 40));

        for (title, items) in [
            ("Individuelle match", &self.full),
            ("Kombi - 2 virksomheder", &self.pairs),
            ("Kombi - 3 virksomheder", &self.triples),
        ] {
            if items.is_empty() {
                continue;
            }
            out.push_str(&format!("\n{} ({}):\n", title, items.len()));
            for item in items {
                out.push_str(&format!("  {}\n", item));
            }
        }

        out
    }
}

fn labels(combos: Vec<&CompanyCombination>) -> Vec<String> {
    combos.into_iter().map(|c| c.label.clone()).collect()
}

/// Horizontal bar chart of the three match counts
pub fn render_chart(summary: &MatchSummary, width: usize) -> String {
    let rows = summary.rows();
    let max = rows.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let label_width = rows.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);

    let mut out = format!("{}\n", CHART_TITLE);
    for (label, count) in rows {
        let bar = if max == 0 {
            0
        } else {
            // Non-zero counts always get at least one cell
            ((count * width) / max).max(usize::from(count > 0))
        };
        out.push_str(&format!(
            "  {:<lw$} │{} {}\n",
            label,
            "█".repeat(bar),
            count,
            lw = label_width
        ));
    }
    out
}

/// Member profiles of a combination, in member order
pub fn combination_profiles(dataset: &Dataset, combo: &CompanyCombination) -> Vec<CompanyProfile> {
    combo
        .members
        .iter()
        .filter_map(|id| dataset.company_profile(*id))
        .collect()
}
