pub mod function_call;
pub mod mock;
pub mod normalize;
pub mod structured;
pub mod tool_augmented;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::llm::LlmClient;
use crate::scoring::{FilterPipeline, RankingStrategy};
use crate::{FilterCriteria, Post, ProviderError};

pub use function_call::FunctionCallProvider;
pub use mock::MockProvider;
pub use structured::StructuredSearchProvider;
pub use tool_augmented::{ToolAugmentedProvider, ToolhouseClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Structured,
    FunctionCall,
    ToolAugmented,
    Mock,
}

impl SourceKind {
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Structured => "structured",
            SourceKind::FunctionCall => "function_call",
            SourceKind::ToolAugmented => "tool_augmented",
            SourceKind::Mock => "mock",
        }
    }

    pub fn id_prefix(self) -> &'static str {
        match self {
            SourceKind::Structured => "web",
            SourceKind::FunctionCall => "fn",
            SourceKind::ToolAugmented => "toolhouse",
            SourceKind::Mock => "mock",
        }
    }

    pub fn ranking(self) -> RankingStrategy {
        match self {
            SourceKind::Mock => RankingStrategy::Blended,
            _ => RankingStrategy::ViralPotential,
        }
    }
}

/// Which search provider leads the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMethod {
    #[default]
    Structured,
    FunctionCall,
}

impl SearchMethod {
    /// `function` selects function calling; anything else is structured.
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(|value| value.trim().to_lowercase()).as_deref() {
            Some("function") => SearchMethod::FunctionCall,
            _ => SearchMethod::Structured,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SearchMethod::Structured => "structured",
            SearchMethod::FunctionCall => "function",
        }
    }
}

#[async_trait]
pub trait CandidateProvider: Send + Sync {
    fn source(&self) -> SourceKind;

    async fn fetch(&self, criteria: &FilterCriteria) -> Result<Vec<Post>, ProviderError>;
}

/// Progress notifications emitted while a chain resolves.
#[derive(Debug)]
pub enum ChainStep<'a> {
    Attempt(SourceKind),
    Failed {
        source: SourceKind,
        error: &'a ProviderError,
    },
    Resolved {
        source: SourceKind,
        count: usize,
    },
}

#[derive(Debug, Clone)]
pub struct ResolvedBatch {
    pub source: SourceKind,
    pub posts: Vec<Post>,
    pub failures: Vec<(SourceKind, String)>,
}

impl ResolvedBatch {
    /// Filters and orders the batch with the ranking that belongs to its source.
    pub fn ranked(&self, criteria: &FilterCriteria) -> Vec<Post> {
        FilterPipeline::new(criteria).apply(&self.posts, self.source.ranking())
    }
}

/// Ordered providers tried until one yields posts, ending in the mock
/// dataset, which cannot fail.
#[derive(Clone)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn CandidateProvider>>,
    terminal: MockProvider,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn CandidateProvider>>, terminal: MockProvider) -> Self {
        Self {
            providers,
            terminal,
        }
    }

    /// Search provider picked by `method`, then the tool-augmented
    /// provider, then the static dataset.
    pub fn for_method(
        method: SearchMethod,
        llm: Option<LlmClient>,
        tools: Option<ToolhouseClient>,
        model: &str,
    ) -> Self {
        let primary: Arc<dyn CandidateProvider> = match method {
            SearchMethod::Structured => Arc::new(StructuredSearchProvider::new(llm.clone(), model)),
            SearchMethod::FunctionCall => Arc::new(FunctionCallProvider::new(llm.clone(), model)),
        };
        let secondary: Arc<dyn CandidateProvider> =
            Arc::new(ToolAugmentedProvider::new(llm, tools, model));
        Self::new(vec![primary, secondary], MockProvider)
    }

    pub fn mock_only() -> Self {
        Self::new(Vec::new(), MockProvider)
    }

    pub fn sources(&self) -> Vec<SourceKind> {
        self.providers
            .iter()
            .map(|provider| provider.source())
            .chain(std::iter::once(SourceKind::Mock))
            .collect()
    }

    pub async fn resolve(&self, criteria: &FilterCriteria) -> ResolvedBatch {
        self.resolve_with(criteria, |_| {}).await
    }

    pub async fn resolve_with<F>(&self, criteria: &FilterCriteria, mut observe: F) -> ResolvedBatch
    where
        F: FnMut(ChainStep<'_>) + Send,
    {
        let mut failures = Vec::new();

        for provider in &self.providers {
            let source = provider.source();
            observe(ChainStep::Attempt(source));

            let error = match provider.fetch(criteria).await {
                Ok(posts) if !posts.is_empty() => {
                    info!(source = source.label(), count = posts.len(), "candidates resolved");
                    observe(ChainStep::Resolved {
                        source,
                        count: posts.len(),
                    });
                    return ResolvedBatch {
                        source,
                        posts,
                        failures,
                    };
                }
                Ok(_) => ProviderError::EmptyResult,
                Err(error) => error,
            };

            warn!(source = source.label(), error = %error, "provider failed, falling through");
            observe(ChainStep::Failed {
                source,
                error: &error,
            });
            failures.push((source, error.to_string()));
        }

        observe(ChainStep::Attempt(SourceKind::Mock));
        let posts = self.terminal.candidates();
        info!(source = SourceKind::Mock.label(), count = posts.len(), "using static dataset");
        observe(ChainStep::Resolved {
            source: SourceKind::Mock,
            count: posts.len(),
        });
        ResolvedBatch {
            source: SourceKind::Mock,
            posts,
            failures,
        }
    }
}
