//! Probability x impact matrix placement
//!
//! Global invariants enforced:
//! - The grid is always 10x10, indexed `(impact, probability)`, both 1-based
//! - Cell zone depends only on the cell coordinates, never on its occupant
//! - Collisions keep the first risk in input order; the input set is untouched
//! - Every input risk appears in `entries`, placed in the grid or not

use crate::risk::Risk;
use crate::scoring::{self, SeverityThresholds, MAX_RATING};
use serde::{Deserialize, Serialize};

/// Grid dimension on both axes
pub const GRID_SIZE: usize = MAX_RATING as usize;

/// Colour zone of a matrix cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    /// Green
    Low,
    /// Orange
    Medium,
    /// Red
    High,
}

impl Zone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Low => "low",
            Zone::Medium => "medium",
            Zone::High => "high",
        }
    }

    /// Zone for a grid position
    ///
    /// Uses the medium/high score cut-offs only; the critical split is a
    /// severity refinement with no colour of its own.
    pub fn for_cell(probability: u8, impact: u8, thresholds: &SeverityThresholds) -> Zone {
        let s = scoring::score(probability, impact);
        if s > thresholds.high {
            Zone::High
        } else if s > thresholds.medium {
            Zone::Medium
        } else {
            Zone::Low
        }
    }
}

/// Risk shown in a cell
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct CellOccupant {
    pub risk_id: i64,
    pub title: String,
}

/// One grid position
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct MatrixCell {
    pub probability: u8,
    pub impact: u8,
    pub score: u32,
    pub zone: Zone,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupant: Option<CellOccupant>,
    /// Risks mapped here but hidden behind the occupant
    #[serde(default, skip_serializing_if = "is_zero")]
    pub hidden: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// Per-risk line for the list view beside the grid
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct MatrixEntry {
    pub risk_id: i64,
    pub title: String,
    pub probability: u8,
    pub impact: u8,
    pub score: f64,
}

/// Complete matrix output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct RiskMatrix {
    /// `rows[impact - 1][probability - 1]`
    pub rows: Vec<Vec<MatrixCell>>,
    pub entries: Vec<MatrixEntry>,
}

impl RiskMatrix {
    /// Empty grid with zones filled in
    pub fn empty(thresholds: &SeverityThresholds) -> Self {
        let rows = (1..=GRID_SIZE as u8)
            .map(|impact| {
                (1..=GRID_SIZE as u8)
                    .map(|probability| MatrixCell {
                        probability,
                        impact,
                        score: scoring::score(probability, impact),
                        zone: Zone::for_cell(probability, impact, thresholds),
                        occupant: None,
                        hidden: 0,
                    })
                    .collect()
            })
            .collect();

        RiskMatrix {
            rows,
            entries: Vec::new(),
        }
    }

    /// Cell at 1-based `(impact, probability)`
    pub fn cell(&self, impact: u8, probability: u8) -> Option<&MatrixCell> {
        let row = (impact as usize).checked_sub(1)?;
        let col = (probability as usize).checked_sub(1)?;
        self.rows.get(row)?.get(col)
    }

    fn cell_mut(&mut self, impact: u8, probability: u8) -> &mut MatrixCell {
        // Callers pass clamped coordinates
        &mut self.rows[impact as usize - 1][probability as usize - 1]
    }

    /// Number of cells holding a risk
    pub fn occupied_count(&self) -> usize {
        self.rows
            .iter()
            .flatten()
            .filter(|c| c.occupant.is_some())
            .count()
    }
}

/// Place risks into the grid
///
/// Row = `clamp(impact)`, column = `clamp(probability)`. The first risk in
/// input order takes a cell; later ones only bump its `hidden` count.
pub fn place_risks(risks: &[Risk], thresholds: &SeverityThresholds) -> RiskMatrix {
    let mut matrix = RiskMatrix::empty(thresholds);

    for risk in risks {
        let row = scoring::clamp_rating(risk.impact as i64);
        let col = scoring::clamp_rating(risk.probability as i64);
        let cell = matrix.cell_mut(row, col);

        if cell.occupant.is_none() {
            cell.occupant = Some(CellOccupant {
                risk_id: risk.id,
                title: risk.title.clone(),
            });
        } else {
            cell.hidden += 1;
        }

        matrix.entries.push(MatrixEntry {
            risk_id: risk.id,
            title: risk.title.clone(),
            probability: risk.probability,
            impact: risk.impact,
            score: risk.display_score(),
        });
    }

    matrix
}
