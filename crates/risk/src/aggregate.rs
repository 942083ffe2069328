//! Ranking and overall risk aggregation

use fto_common::config::ScoringConfig;
use fto_common::models::{OverallAssessment, RiskLevel, ScoredPatent};
use std::cmp::Ordering;
use std::sync::Arc;

const STRONG_KEYWORD_OVERLAP: f64 = 0.6;
const RECENT_PATENTS: f64 = 0.8;

/// Stable descending sort by composite score. Equal scores keep input order.
pub fn rank(patents: &mut [ScoredPatent]) {
    patents.sort_by(|a, b| descending(a.risk_score, b.risk_score));
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

/// Folds scored patents into one verdict
#[derive(Debug, Clone)]
pub struct Aggregator {
    config: Arc<ScoringConfig>,
}

impl Aggregator {
    pub fn new(config: Arc<ScoringConfig>) -> Self {
        Self { config }
    }

    pub fn aggregate(&self, mut patents: Vec<ScoredPatent>) -> OverallAssessment {
        if patents.is_empty() {
            return OverallAssessment::no_patents();
        }

        rank(&mut patents);

        let total_analyzed = patents.len();
        let high_risk_count = patents
            .iter()
            .filter(|p| p.risk_level == RiskLevel::High)
            .count();

        let (score, level) = self.overall(&patents);
        let factors = Self::risk_drivers(&patents, high_risk_count);

        patents.truncate(self.config.top_n);

        OverallAssessment {
            level,
            score,
            factors,
            analyzed_patents: patents,
            high_risk_count,
            total_analyzed,
        }
    }

    /// A single HIGH-risk top patent decides the verdict on its own score.
    /// Otherwise the leading window is averaged.
    fn overall(&self, ranked: &[ScoredPatent]) -> (f64, RiskLevel) {
        let top = &ranked[0];
        if top.risk_level == RiskLevel::High {
            return (top.risk_score, RiskLevel::High);
        }

        let window = &ranked[..ranked.len().min(self.config.average_window)];
        let mean = window.iter().map(|p| p.risk_score).sum::<f64>() / window.len() as f64;

        (mean, RiskLevel::from_score(mean, &self.config.thresholds))
    }

    fn risk_drivers(ranked: &[ScoredPatent], high_risk_count: usize) -> Vec<String> {
        let top = &ranked[0];
        let mut factors = Vec::new();

        if high_risk_count > 0 {
            factors.push(format!("{} high-risk patents identified", high_risk_count));
        }
        if top.factors.keyword_overlap > STRONG_KEYWORD_OVERLAP {
            factors.push("Strong keyword overlap with existing patents".to_string());
        }
        if top.factors.recency > RECENT_PATENTS {
            factors.push("Recent patents in your research area".to_string());
        }

        factors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fto_common::models::{PatentRecord, RiskFactors};

    fn config() -> Arc<ScoringConfig> {
        Arc::new(ScoringConfig::default())
    }

    fn patent(id: &str, score: f64) -> ScoredPatent {
        let level = RiskLevel::from_score(score, &config().thresholds);
        ScoredPatent {
            record: PatentRecord::new(id, format!("Patent {}", id), "US"),
            risk_score: score,
            risk_level: level,
            factors: RiskFactors::default(),
            explanation: String::new(),
        }
    }

    fn ids(assessment: &OverallAssessment) -> Vec<&str> {
        assessment
            .analyzed_patents
            .iter()
            .map(|p| p.record.id.as_str())
            .collect()
    }

    #[test]
    fn test_rank_is_stable() {
        let mut patents = vec![
            patent("a", 0.5),
            patent("b", 0.9),
            patent("c", 0.5),
            patent("d", 0.5),
        ];
        rank(&mut patents);
        let order: Vec<_> = patents.iter().map(|p| p.record.id.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_empty_input() {
        let assessment = Aggregator::new(config()).aggregate(Vec::new());
        assert_eq!(assessment, OverallAssessment::no_patents());
    }

    #[test]
    fn test_top_high_uses_own_score() {
        let patents = vec![patent("a", 0.2), patent("b", 0.75), patent("c", 0.1)];
        let assessment = Aggregator::new(config()).aggregate(patents);

        assert_eq!(assessment.level, RiskLevel::High);
        assert_eq!(assessment.score, 0.75);
        assert_eq!(assessment.high_risk_count, 1);
        assert_eq!(assessment.factors, vec!["1 high-risk patents identified"]);
        assert_eq!(ids(&assessment), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_mean_of_top_window() {
        let patents = vec![
            patent("a", 0.6),
            patent("b", 0.6),
            patent("c", 0.5),
            patent("d", 0.5),
            patent("e", 0.3),
            patent("f", 0.0),
        ];
        let assessment = Aggregator::new(config()).aggregate(patents);

        assert!((assessment.score - 0.5).abs() < 1e-9);
        assert_eq!(assessment.level, RiskLevel::Medium);
        assert!(assessment.factors.is_empty());
        assert_eq!(assessment.high_risk_count, 0);
    }

    #[test]
    fn test_truncates_to_top_n_but_counts_all() {
        let patents: Vec<_> = (0..12)
            .map(|i| patent(&format!("p{}", i), i as f64 / 11.0))
            .collect();
        let assessment = Aggregator::new(config()).aggregate(patents);

        assert_eq!(assessment.analyzed_patents.len(), 10);
        assert_eq!(assessment.total_analyzed, 12);
        // 8/11 through 11/11
        assert_eq!(assessment.high_risk_count, 4);
        assert_eq!(assessment.top().map(|p| p.record.id.as_str()), Some("p11"));
        assert_eq!(assessment.score, 1.0);
        assert_eq!(assessment.analyzed_patents.last().map(|p| p.record.id.as_str()), Some("p2"));
    }

    #[test]
    fn test_driver_order() {
        let mut top = patent("a", 0.8);
        top.factors.keyword_overlap = 1.0;
        top.factors.recency = 1.0;
        let assessment = Aggregator::new(config()).aggregate(vec![patent("b", 0.71), top]);

        assert_eq!(
            assessment.factors,
            vec![
                "2 high-risk patents identified",
                "Strong keyword overlap with existing patents",
                "Recent patents in your research area",
            ]
        );
    }
}
