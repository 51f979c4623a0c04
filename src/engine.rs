//! # Generation Engine
//! Orchestrates one `POST /api/articles` request:
//! registry lookup → concurrent feed harvest → candidate selection → per-candidate
//! enrichment (extract, translate, structure, cover) → normalized articles.
//!
//! Enrichment runs in waves of `count` candidates, each candidate under its own
//! timeout. Failed candidates are skipped; if none succeeds, articles are built from
//! feed metadata so a request with content never comes back empty.

use futures::future::join_all;
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::article::{Category, GenerateRequest, NormalizedArticle};
use crate::config::{AiConfig, FeedRegistry, PipelineSettings};
use crate::cover::{cover_note, cover_query, CoverUrlBuilder, TemplateCoverUrl};
use crate::error::GenerateError;
use crate::extract::{ArticleSource, HttpArticleExtractor};
use crate::ingest::fetcher::HttpFeedFetcher;
use crate::ingest::harvest;
use crate::ingest::types::{Candidate, FeedFetcher};
use crate::select::{select_candidates, SelectionPolicy};
use crate::structure::{render_document, slugify, word_bounded, DocumentInput, EXCERPT_MAX_CHARS};
use crate::translate::ai::build_transform;
use crate::translate::circuit::CircuitBreaker;
use crate::translate::providers::{GoogleGtxTranslator, MyMemoryTranslator};
use crate::translate::{SourceText, TranslationPipeline};

pub const DEFAULT_CANDIDATE_TIMEOUT: Duration = Duration::from_secs(45);
pub const DEFAULT_MIN_ARTICLE_CHARS: usize = 200;

/// Articles plus the diagnostics surfaced as response headers.
#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    pub articles: Vec<NormalizedArticle>,
    pub feeds_attempted: usize,
    pub feeds_yielded: usize,
    pub translated: usize,
    /// True when every enrichment failed and articles came from feed metadata.
    pub metadata_fallback: bool,
}

pub struct Engine {
    registry: Arc<FeedRegistry>,
    fetcher: Arc<dyn FeedFetcher>,
    extractor: Arc<dyn ArticleSource>,
    pipeline: Arc<TranslationPipeline>,
    cover: Arc<dyn CoverUrlBuilder>,
    policy: SelectionPolicy,
    candidate_timeout: Duration,
    min_article_chars: usize,
}

impl Engine {
    pub fn new(
        registry: Arc<FeedRegistry>,
        fetcher: Arc<dyn FeedFetcher>,
        extractor: Arc<dyn ArticleSource>,
        pipeline: Arc<TranslationPipeline>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            extractor,
            pipeline,
            cover: Arc::new(TemplateCoverUrl::default()),
            policy: SelectionPolicy::default(),
            candidate_timeout: DEFAULT_CANDIDATE_TIMEOUT,
            min_article_chars: DEFAULT_MIN_ARTICLE_CHARS,
        }
    }

    /// Production wiring: reqwest transports, AI from config, Google then MyMemory.
    pub fn from_settings(
        settings: &PipelineSettings,
        registry: FeedRegistry,
        ai: &AiConfig,
    ) -> anyhow::Result<Self> {
        let fetcher = HttpFeedFetcher::new(settings.feed_timeout)?;
        let extractor =
            HttpArticleExtractor::new(settings.article_timeout, settings.max_article_chars)?;
        let google = GoogleGtxTranslator::new(settings.translate_timeout)?;
        let mymemory = MyMemoryTranslator::new(&settings.source_locale, settings.translate_timeout)?
            .with_contact_email(settings.mymemory_email.clone());

        let pipeline = TranslationPipeline::new(
            CircuitBreaker::shared(settings.ai_cooldown),
            &settings.target_locale,
        )
        .with_ai(build_transform(ai, settings.ai_timeout)?)
        .with_tone(&settings.tone)
        .with_ai_timeout(settings.ai_timeout)
        .with_translator(Arc::new(google))
        .with_translator(Arc::new(mymemory));

        tracing::info!(
            target: "engine",
            feeds = registry.len(),
            ai = ai.enabled,
            locale = %settings.target_locale,
            "engine configured"
        );

        Ok(Self::new(
            Arc::new(registry),
            Arc::new(fetcher),
            Arc::new(extractor),
            Arc::new(pipeline),
        )
        .with_policy(settings.selection_policy())
        .with_cover(Arc::new(TemplateCoverUrl::new(&settings.cover_url_template)))
        .with_candidate_timeout(settings.candidate_timeout)
        .with_min_article_chars(settings.min_article_chars))
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cover(mut self, cover: Arc<dyn CoverUrlBuilder>) -> Self {
        self.cover = cover;
        self
    }

    pub fn with_candidate_timeout(mut self, timeout: Duration) -> Self {
        self.candidate_timeout = timeout;
        self
    }

    pub fn with_min_article_chars(mut self, chars: usize) -> Self {
        self.min_article_chars = chars;
        self
    }

    pub fn registry(&self) -> &FeedRegistry {
        &self.registry
    }

    pub async fn generate(&self, req: &GenerateRequest) -> Result<GenerateOutcome, GenerateError> {
        let t0 = Instant::now();
        let count = req.bounded_count();

        let sources = self.registry.lookup(req.region, req.category);
        if sources.is_empty() {
            return Err(GenerateError::NoFeedsConfigured {
                region: req.region,
                category: req.category,
            });
        }

        let harvest = harvest(self.fetcher.as_ref(), sources).await;
        let (attempted, yielded) = (harvest.attempted, harvest.yielded);
        let no_content = GenerateError::NoContent { attempted, yielded };
        if harvest.items.is_empty() {
            tracing::warn!(target: "engine", region = %req.region, category = %req.category, attempted, "no feed produced items");
            return Err(no_content);
        }

        let candidates = select_candidates(harvest.items, count, &self.policy);
        if candidates.is_empty() {
            tracing::warn!(target: "engine", region = %req.region, category = %req.category, attempted, yielded, "no usable candidates");
            return Err(no_content);
        }

        let mut articles = Vec::with_capacity(count);
        for wave in candidates.chunks(count) {
            let done = join_all(wave.iter().map(|c| self.enrich_bounded(c, req.category))).await;
            articles.extend(done.into_iter().flatten());
            if articles.len() >= count {
                break;
            }
        }
        articles.truncate(count);

        let metadata_fallback = articles.is_empty();
        if metadata_fallback {
            tracing::warn!(target: "engine", candidates = candidates.len(), "every enrichment failed, using feed metadata");
            articles = candidates
                .iter()
                .take(count)
                .map(|c| self.from_metadata(c, req.category))
                .collect();
        }

        let translated = articles.iter().filter(|a| a.is_translated).count();
        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        counter!("articles_generated_total").increment(articles.len() as u64);
        histogram!("generate_duration_ms").record(ms);
        tracing::info!(
            target: "engine",
            region = %req.region,
            category = %req.category,
            requested = count,
            candidates = candidates.len(),
            articles = articles.len(),
            translated,
            elapsed_ms = ms as u64,
            "generation finished"
        );

        Ok(GenerateOutcome {
            articles,
            feeds_attempted: attempted,
            feeds_yielded: yielded,
            translated,
            metadata_fallback,
        })
    }

    async fn enrich_bounded(&self, c: &Candidate, category: Category) -> Option<NormalizedArticle> {
        match tokio::time::timeout(self.candidate_timeout, self.enrich(c, category)).await {
            Ok(article) => article,
            Err(_) => {
                tracing::warn!(
                    target: "engine",
                    host = %c.hostname,
                    timeout_secs = self.candidate_timeout.as_secs(),
                    "candidate enrichment timed out"
                );
                None
            }
        }
    }

    async fn enrich(&self, c: &Candidate, category: Category) -> Option<NormalizedArticle> {
        let text = self.extractor.fetch_text(&c.item.link).await;
        // a short page still beats an empty description
        let body = if text.chars().count() >= self.min_article_chars
            || c.item.description.trim().is_empty()
        {
            text
        } else {
            c.item.description.clone()
        };
        if body.trim().is_empty() {
            tracing::debug!(target: "engine", host = %c.hostname, "no body text, skipping candidate");
            return None;
        }

        let src = SourceText {
            title: c.item.title.clone(),
            description: c.item.description.clone(),
            body,
        };
        let out = self.pipeline.run(&src).await;
        tracing::debug!(
            target: "engine",
            host = %c.hostname,
            stage = out.stage.as_str(),
            chars = out.content.chars().count(),
            "candidate enriched"
        );
        Some(self.assemble(c, category, &out.title, &out.excerpt, &out.content, out.used_ai))
    }

    fn from_metadata(&self, c: &Candidate, category: Category) -> NormalizedArticle {
        let body = if c.item.description.trim().is_empty() {
            c.item.title.as_str()
        } else {
            c.item.description.as_str()
        };
        self.assemble(c, category, &c.item.title, &c.item.description, body, false)
    }

    fn assemble(
        &self,
        c: &Candidate,
        category: Category,
        title: &str,
        excerpt: &str,
        body: &str,
        translated: bool,
    ) -> NormalizedArticle {
        let sources = vec![c.item.link.clone()];
        let excerpt = word_bounded(excerpt, EXCERPT_MAX_CHARS);
        let doc = render_document(DocumentInput {
            title,
            excerpt: &excerpt,
            body,
            sources: &sources,
        });
        // keywords come from the feed title; image search works on the source language
        let query = cover_query(category, &c.item.title);

        NormalizedArticle {
            title: title.to_string(),
            slug: slugify(title),
            excerpt: doc.excerpt,
            category,
            cover_url: self.cover.build(&query),
            cover_note: cover_note(&query),
            cover_query: query,
            sources,
            content: doc.content,
            is_translated: translated,
        }
    }
}
