use serde::Serialize;
use strum::{Display, EnumString, IntoEnumIterator};

use crate::{
    error::CaseError,
    protocol::{Condition, Costs, Operation},
};

pub const NAME_WIDTH: usize = 30;
pub const COST_WIDTH: usize = 6;
pub const PLACEHOLDER: &str = "-";

/// What the table shows for a variant with a failed case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum FailurePolicy {
    /// Drop the variant's row entirely.
    Omit,
    /// Keep the row and print [`PLACEHOLDER`] in every cell of the failed case.
    #[default]
    Placeholder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub include_credit: bool,
    pub failures: FailurePolicy,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_credit: true,
            failures: FailurePolicy::default(),
        }
    }
}

/// One (operation, condition) column of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub operation: Operation,
    pub condition: Condition,
}

impl Column {
    fn title(&self) -> String {
        format!("{} ({})", self.operation, self.condition)
    }
}

#[derive(Debug)]
pub struct CaseOutcome {
    pub variant: String,
    pub condition: Condition,
    pub result: Result<Costs, CaseError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Measurement {
    pub variant: String,
    pub condition: Condition,
    pub operation: Operation,
    pub cost: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub variant: String,
    pub condition: Condition,
    pub stage: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub measurements: Vec<Measurement>,
    pub failures: Vec<FailureRecord>,
}

/// Collects case outcomes in execution order and renders the comparison table.
#[derive(Debug, Default)]
pub struct Reporter {
    options: ReportOptions,
    outcomes: Vec<CaseOutcome>,
}

impl Reporter {
    pub fn new(options: ReportOptions) -> Self {
        Self {
            options,
            outcomes: Vec::new(),
        }
    }

    pub fn record(
        &mut self,
        variant: &str,
        condition: Condition,
        result: Result<Costs, CaseError>,
    ) {
        self.outcomes.push(CaseOutcome {
            variant: variant.to_owned(),
            condition,
            result,
        });
    }

    pub fn outcomes(&self) -> &[CaseOutcome] {
        &self.outcomes
    }

    pub fn costs(&self, variant: &str, condition: Condition) -> Option<&Costs> {
        self.outcome(variant, condition)
            .and_then(|outcome| outcome.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseError> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().err())
    }

    fn outcome(&self, variant: &str, condition: Condition) -> Option<&CaseOutcome> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.variant == variant && outcome.condition == condition)
    }

    /// Columns in fixed order: every operation of the clean condition, then
    /// every operation of the dirty one.
    pub fn columns(&self) -> Vec<Column> {
        Condition::iter()
            .flat_map(|condition| {
                Operation::iter().map(move |operation| Column {
                    operation,
                    condition,
                })
            })
            .filter(|column| self.options.include_credit || column.operation != Operation::Credit)
            .collect()
    }

    /// Variant names in the order their first case was recorded.
    fn variants(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for outcome in &self.outcomes {
            if !names.contains(&outcome.variant.as_str()) {
                names.push(&outcome.variant);
            }
        }
        names
    }

    pub fn header(&self) -> String {
        let titles: Vec<String> = self.columns().iter().map(Column::title).collect();
        format!("| Description | {} |", titles.join(" | "))
    }

    pub fn separator(&self) -> String {
        format!("|-|{}", "-:|".repeat(self.columns().len()))
    }

    /// Table cells of one variant, or `None` when the failure policy drops it.
    fn cells(&self, variant: &str, columns: &[Column]) -> Option<Vec<String>> {
        let complete = Condition::iter().all(|condition| self.costs(variant, condition).is_some());
        if !complete && self.options.failures == FailurePolicy::Omit {
            return None;
        }
        Some(
            columns
                .iter()
                .map(|column| match self.costs(variant, column.condition) {
                    Some(costs) => costs.get(column.operation).to_string(),
                    None => PLACEHOLDER.to_owned(),
                })
                .collect(),
        )
    }

    pub fn rows(&self) -> Vec<String> {
        let columns = self.columns();
        self.variants()
            .into_iter()
            .filter_map(|variant| {
                let cells = self.cells(variant, &columns)?;
                let cells: Vec<String> = cells
                    .iter()
                    .map(|cell| format!("{cell:>COST_WIDTH$}"))
                    .collect();
                Some(format!("| {variant:<NAME_WIDTH$} | {} |", cells.join(" | ")))
            })
            .collect()
    }

    pub fn render(&self) -> String {
        let mut table = String::new();
        table.push_str(&self.header());
        table.push('\n');
        table.push_str(&self.separator());
        table.push('\n');
        for row in self.rows() {
            table.push_str(&row);
            table.push('\n');
        }
        table
    }

    /// One line per failed case, naming the matrix cell it belongs to.
    pub fn failure_lines(&self) -> Vec<String> {
        self.failures().map(|failure| failure.to_string()).collect()
    }

    pub fn measurements(&self) -> Vec<Measurement> {
        self.outcomes
            .iter()
            .filter_map(|outcome| Some((outcome, outcome.result.as_ref().ok()?)))
            .flat_map(|(outcome, costs)| {
                Operation::iter().map(move |operation| Measurement {
                    variant: outcome.variant.clone(),
                    condition: outcome.condition,
                    operation,
                    cost: costs.get(operation),
                })
            })
            .collect()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            measurements: self.measurements(),
            failures: self
                .failures()
                .map(|failure| FailureRecord {
                    variant: failure.variant.clone(),
                    condition: failure.condition,
                    stage: failure.stage.to_string(),
                    error: failure.source.to_string(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.summary())
    }
}
