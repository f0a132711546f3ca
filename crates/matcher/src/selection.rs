use crate::ranker::ScoreRecord;
use serde::{Deserialize, Serialize};

/// Confidence thresholds for picking the final topics out of a ranking
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionThresholds {
    /// A top score at or above this is selected alone
    pub high: f64,

    /// A top score at or above this is selected alone when it leads by `margin`
    pub mid: f64,

    pub margin: f64,
}

impl Default for SelectionThresholds {
    fn default() -> Self {
        Self {
            high: 0.80,
            mid: 0.65,
            margin: 0.15,
        }
    }
}

impl SelectionThresholds {
    /// How many of the leading scores (sorted descending) are selected: 0, 1 or 2
    pub fn selected_len(&self, sorted_scores: &[f64]) -> usize {
        let Some(&top1) = sorted_scores.first() else {
            return 0;
        };
        if top1 >= self.high {
            return 1;
        }
        match sorted_scores.get(1) {
            Some(&top2) if top1 >= self.mid && top1 - top2 >= self.margin => 1,
            Some(_) => 2,
            None => 1,
        }
    }

    /// Selected prefix of a ranking sorted by `combined_score` descending
    pub fn select<'a>(&self, sorted: &'a [ScoreRecord]) -> &'a [ScoreRecord] {
        let leading: Vec<f64> = sorted.iter().take(2).map(|r| r.combined_score).collect();
        &sorted[..self.selected_len(&leading)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn selected(scores: &[f64]) -> usize {
        SelectionThresholds::default().selected_len(scores)
    }

    #[test]
    fn confident_top_is_selected_alone() {
        assert_eq!(selected(&[0.85, 0.40]), 1);
        assert_eq!(selected(&[0.80, 0.79]), 1);
    }

    #[test]
    fn clear_lead_above_mid_is_selected_alone() {
        assert_eq!(selected(&[0.70, 0.50]), 1);
    }

    #[test]
    fn lead_of_exactly_margin_at_mid_is_selected_alone() {
        assert_eq!(selected(&[0.65, 0.50]), 1);
        assert_eq!(selected(&[0.65, 0.51]), 2);
    }

    #[test]
    fn close_runner_up_is_selected_too() {
        assert_eq!(selected(&[0.70, 0.60]), 2);
        // below mid the lead does not matter
        assert_eq!(selected(&[0.60, 0.10]), 2);
    }

    #[test]
    fn single_and_empty_rankings() {
        assert_eq!(selected(&[0.50]), 1);
        assert_eq!(selected(&[]), 0);
    }

    #[test]
    fn select_returns_prefix() {
        let records: Vec<ScoreRecord> = [0.70, 0.60, 0.10]
            .iter()
            .enumerate()
            .map(|(i, &score)| ScoreRecord {
                subject: "physics".to_string(),
                id: format!("P{i}"),
                title: String::new(),
                emb_sim: 0.0,
                keyword_score: 0.0,
                centrality: 0.0,
                combined_score: score,
                evidence: None,
            })
            .collect();

        let picked = SelectionThresholds::default().select(&records);
        let ids: Vec<&str> = picked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["P0", "P1"]);
        assert!(SelectionThresholds::default().select(&[]).is_empty());
    }
}
