use std::cmp::Ordering;

use crate::{FilterCriteria, Post};

/// How a filtered batch is ordered. The two tunings belong to different
/// candidate sources and are kept apart on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingStrategy {
    /// Provider batches: viral potential, highest first.
    ViralPotential,
    /// Static dataset: `weighted_engagement * 0.6 + viral_potential * 4`.
    Blended,
}

impl RankingStrategy {
    pub fn label(self) -> &'static str {
        match self {
            RankingStrategy::ViralPotential => "viral_potential",
            RankingStrategy::Blended => "blended",
        }
    }

    pub fn rank_score(self, post: &Post) -> f64 {
        match self {
            RankingStrategy::ViralPotential => post.viral_potential as f64,
            RankingStrategy::Blended => {
                post.weighted_engagement() as f64 * 0.6 + post.viral_potential as f64 * 4.0
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterPipeline {
    criteria: FilterCriteria,
    topics: Vec<String>,
}

impl FilterPipeline {
    pub fn new(criteria: &FilterCriteria) -> Self {
        let topics = criteria
            .topics
            .iter()
            .map(|topic| topic.trim().to_lowercase())
            .filter(|topic| !topic.is_empty())
            .collect();
        Self {
            criteria: criteria.clone(),
            topics,
        }
    }

    /// Applies the threshold, verification and topic checks in order.
    pub fn accepts(&self, post: &Post) -> bool {
        if post.viral_potential < self.criteria.min_viral_potential {
            return false;
        }
        if post.weighted_engagement() < self.criteria.min_engagement {
            return false;
        }
        if self.criteria.only_verified && !post.is_verified {
            return false;
        }
        if !self.topics.is_empty() {
            let content = post.content.to_lowercase();
            if !self.topics.iter().any(|topic| content.contains(topic.as_str())) {
                return false;
            }
        }
        true
    }

    /// Returns the surviving candidates ranked highest first. Equal scores
    /// keep their input order.
    pub fn apply(&self, candidates: &[Post], strategy: RankingStrategy) -> Vec<Post> {
        let mut ranked: Vec<(f64, &Post)> = candidates
            .iter()
            .filter(|post| self.accepts(post))
            .map(|post| (strategy.rank_score(post), post))
            .collect();

        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        ranked.into_iter().map(|(_, post)| post.clone()).collect()
    }
}
