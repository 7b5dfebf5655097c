use crate::compensation::CompensationPolicy;
use crate::error::Result;
use crate::index::{build_corpus, IndexConfig, VectorSpace};
use crate::loader;
use crate::schema::Schema;
use crate::stats::{self, Overview, PlacementStats, ProgramStats, TopPackage};
use crate::summary;
use crate::table::{Record, Table};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub schema: Schema,
    pub index: IndexConfig,
    /// Minimum similarity for [`PlacementEngine::query`] to return a row.
    pub retrieval_floor: f32,
    /// Minimum similarity for [`PlacementEngine::answer`] to treat a row as
    /// an answer to the question.
    pub answer_floor: f32,
    pub program_policy: CompensationPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema: Schema::default(),
            index: IndexConfig::default(),
            retrieval_floor: 0.1,
            answer_floor: 0.2,
            program_policy: CompensationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub row_index: usize,
    pub similarity: f32,
    pub row: Record,
    pub matched_text: String,
}

/// Cleaned table, its synthetic corpus and the fitted vector space. Built
/// once and read-only afterwards, so it can be shared across threads.
#[derive(Debug, Clone)]
pub struct PlacementEngine {
    table: Table,
    corpus: Vec<String>,
    vector_space: VectorSpace,
    config: EngineConfig,
}

impl PlacementEngine {
    /// Load, clean and index a data file.
    pub fn open<P: AsRef<Path>>(path: P, config: EngineConfig) -> Result<Self> {
        let table = loader::load_clean(path, &config.schema)?;
        Ok(Self::build(table, config))
    }

    /// Index a table that is already in memory. The table is cleaned first.
    pub fn from_table(mut table: Table, config: EngineConfig) -> Self {
        loader::clean(&mut table, &config.schema);
        Self::build(table, config)
    }

    fn build(table: Table, config: EngineConfig) -> Self {
        let corpus = build_corpus(&table);
        let vector_space = VectorSpace::fit(&corpus, &config.index);
        tracing::info!(
            rows = table.len(),
            vocabulary = vector_space.vocabulary_len(),
            "placement engine ready"
        );
        Self { table, corpus, vector_space, config }
    }

    pub fn table(&self) -> &Table { &self.table }

    pub fn corpus(&self) -> &[String] { &self.corpus }

    pub fn vector_space(&self) -> &VectorSpace { &self.vector_space }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn schema(&self) -> &Schema { &self.config.schema }

    /// Best row for `text` if it clears the retrieval floor.
    pub fn query(&self, text: &str) -> Option<Match> {
        self.query_with_floor(text, self.config.retrieval_floor)
    }

    /// Best row for `text` if it is relevant enough to answer with.
    pub fn answer(&self, text: &str) -> Option<Match> {
        self.query_with_floor(text, self.config.answer_floor)
    }

    pub fn query_with_floor(&self, text: &str, floor: f32) -> Option<Match> {
        let Some((doc_id, similarity)) = self.vector_space.best_match(text) else {
            tracing::debug!("query against empty index");
            return None;
        };
        if similarity == 0.0 {
            tracing::debug!("query shares no vocabulary with the index");
            return None;
        }
        if similarity <= floor {
            tracing::debug!(similarity, floor, "best match below relevance floor");
            return None;
        }
        let row_index = doc_id as usize;
        Some(Match {
            row_index,
            similarity,
            row: self.table.record(row_index)?,
            matched_text: self.corpus.get(row_index)?.clone(),
        })
    }

    pub fn snapshot(&self) -> PlacementStats { stats::snapshot(&self.table, self.schema()) }

    pub fn program_stats(&self, program: &str) -> Option<ProgramStats> {
        stats::program_stats(&self.table, self.schema(), program, self.config.program_policy)
    }

    pub fn overview(&self) -> Overview { stats::overview(&self.table, self.schema()) }

    pub fn search_by_company(&self, company: &str) -> Vec<Record> {
        stats::search_by_company(&self.table, self.schema(), company)
    }

    pub fn search_by_role(&self, role: &str) -> Vec<Record> {
        stats::search_by_role(&self.table, self.schema(), role)
    }

    pub fn highest_package(&self) -> Option<TopPackage> { stats::highest_package(&self.table, self.schema()) }

    pub fn data_summary(&self) -> String { summary::data_summary(&self.table, self.schema()) }

    pub fn analysis_prompt(&self, question: &str) -> String {
        summary::analysis_prompt(question, &self.data_summary())
    }
}
