use crate::table::Table;
use crate::tokenizer::{tokenize, TokenizerConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type TermId = u32;
pub type DocId = u32;

/// Column name skipped when building documents, so a table that already
/// carries a derived text column is not indexed twice.
pub const DERIVED_COLUMN: &str = "combined_text";
pub const FRAGMENT_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdfMode {
    /// ln(N/df); terms present in every row weigh nothing.
    Plain,
    /// ln(1 + N/df)
    Smoothed,
    /// ln((1 + N)/(1 + df)) + 1, as if one extra row held every term.
    Standard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub max_features: usize,
    pub idf: IdfMode,
    /// Use 1 + ln(tf) instead of the raw count. Off by default.
    pub sublinear_tf: bool,
    pub tokenizer: TokenizerConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { max_features: 500, idf: IdfMode::Standard, sublinear_tf: false, tokenizer: TokenizerConfig::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub weight: f32, // normalized tf-idf weight
}

/// Fitted term-weighting model plus the per-row weights, stored inverted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorSpace {
    pub dictionary: HashMap<String, TermId>,
    pub df: Vec<u32>,
    pub idf: Vec<f32>,
    pub postings: Vec<Vec<Posting>>, // indexed by term id, sorted by doc_id
    pub num_docs: u32,
    pub config: IndexConfig,
}

/// One synthetic document per row: every non-blank `column: value` pair
/// joined with ` | `, in column order.
pub fn build_corpus(table: &Table) -> Vec<String> {
    table
        .rows
        .iter()
        .map(|row| {
            table
                .columns
                .iter()
                .zip(row.iter())
                .filter(|(col, _)| col.as_str() != DERIVED_COLUMN)
                .filter_map(|(col, value)| {
                    let text = value.to_text()?;
                    if text.trim().is_empty() { None } else { Some(format!("{col}: {text}")) }
                })
                .collect::<Vec<_>>()
                .join(FRAGMENT_SEPARATOR)
        })
        .collect()
}

impl VectorSpace {
    pub fn fit<S: AsRef<str>>(corpus: &[S], config: &IndexConfig) -> Self {
        let docs: Vec<Vec<String>> = corpus.iter().map(|d| tokenize(d.as_ref(), config.tokenizer)).collect();

        // Corpus-wide counts pick the vocabulary
        let mut total: HashMap<&str, u64> = HashMap::new();
        for doc in &docs {
            for term in doc {
                *total.entry(term.as_str()).or_insert(0) += 1;
            }
        }
        let mut ranked: Vec<(&str, u64)> = total.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(config.max_features);
        let mut vocab: Vec<&str> = ranked.into_iter().map(|(t, _)| t).collect();
        vocab.sort_unstable();

        let dictionary: HashMap<String, TermId> =
            vocab.iter().enumerate().map(|(i, t)| (t.to_string(), i as TermId)).collect();

        let num_docs = docs.len() as u32;
        let mut df: Vec<u32> = vec![0; dictionary.len()];
        let mut raw: Vec<Vec<(DocId, u32)>> = vec![Vec::new(); dictionary.len()];
        for (doc_id, doc) in docs.iter().enumerate() {
            let mut tf_counts: HashMap<TermId, u32> = HashMap::new();
            for term in doc {
                if let Some(&tid) = dictionary.get(term) {
                    *tf_counts.entry(tid).or_insert(0) += 1;
                }
            }
            for (tid, count) in tf_counts {
                df[tid as usize] += 1;
                raw[tid as usize].push((doc_id as DocId, count));
            }
        }

        let n = num_docs.max(1);
        let idf: Vec<f32> = df.iter().map(|&d| idf_weight(config.idf, n, d)).collect();

        // First pass: tf-idf and norms
        let mut doc_norms: Vec<f32> = vec![0.0; num_docs as usize];
        let mut weighted: Vec<Vec<(DocId, f32)>> = Vec::with_capacity(raw.len());
        for (tid, plist) in raw.into_iter().enumerate() {
            let mut out = Vec::with_capacity(plist.len());
            for (doc_id, tf_raw) in plist {
                let w = tf_weight(config.sublinear_tf, tf_raw) * idf[tid];
                doc_norms[doc_id as usize] += w * w;
                out.push((doc_id, w));
            }
            weighted.push(out);
        }
        for dn in doc_norms.iter_mut() {
            *dn = dn.sqrt();
            if *dn == 0.0 { *dn = 1.0; }
        }

        // Second pass: normalized postings, zero weights dropped
        let postings: Vec<Vec<Posting>> = weighted
            .into_iter()
            .map(|plist| {
                let mut out: Vec<Posting> = plist
                    .into_iter()
                    .filter(|(_, w)| *w > 0.0)
                    .map(|(doc_id, w)| Posting { doc_id, weight: w / doc_norms[doc_id as usize] })
                    .collect();
                out.sort_by_key(|p| p.doc_id);
                out
            })
            .collect();

        tracing::info!(num_docs, num_terms = dictionary.len(), "fitted vector space");
        Self { dictionary, df, idf, postings, num_docs, config: config.clone() }
    }

    pub fn vocabulary_len(&self) -> usize { self.dictionary.len() }

    /// Project text into the fitted space. Out-of-vocabulary terms are
    /// ignored; an empty result means nothing overlapped.
    pub fn transform(&self, text: &str) -> Vec<(TermId, f32)> {
        let mut tf_q_raw: HashMap<TermId, u32> = HashMap::new();
        for term in tokenize(text, self.config.tokenizer) {
            if let Some(&tid) = self.dictionary.get(&term) {
                *tf_q_raw.entry(tid).or_insert(0) += 1;
            }
        }
        // Sorted by term id so scores sum in a fixed order
        let mut q_weights: Vec<(TermId, f32)> = tf_q_raw
            .into_iter()
            .map(|(tid, tf_raw)| (tid, tf_weight(self.config.sublinear_tf, tf_raw) * self.idf[tid as usize]))
            .filter(|(_, w)| *w > 0.0)
            .collect();
        q_weights.sort_by_key(|(tid, _)| *tid);
        let norm = q_weights.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in q_weights.iter_mut() { *w /= norm; }
        }
        q_weights
    }

    /// Cosine similarity of `text` against every row, in row order.
    pub fn similarities(&self, text: &str) -> Vec<f32> {
        let mut scores = vec![0.0f32; self.num_docs as usize];
        for (tid, q_w) in self.transform(text) {
            for p in &self.postings[tid as usize] {
                scores[p.doc_id as usize] += p.weight * q_w; // cosine since doc weights are normalized
            }
        }
        scores
    }

    /// Highest-scoring row; the lowest index wins ties. `None` for an empty
    /// index.
    pub fn best_match(&self, text: &str) -> Option<(DocId, f32)> {
        let scores = self.similarities(text);
        let mut best: Option<(DocId, f32)> = None;
        for (doc_id, score) in scores.into_iter().enumerate() {
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((doc_id as DocId, score)),
            }
        }
        best
    }
}

fn tf_weight(sublinear: bool, tf_raw: u32) -> f32 {
    if tf_raw == 0 {
        0.0
    } else if sublinear {
        1.0 + (tf_raw as f32).ln()
    } else {
        tf_raw as f32
    }
}

fn idf_weight(mode: IdfMode, n: u32, df: u32) -> f32 {
    let df_t = df.max(1) as f32;
    match mode {
        IdfMode::Plain => (n as f32 / df_t).ln(),
        IdfMode::Smoothed => (1.0 + n as f32 / df_t).ln(),
        IdfMode::Standard => ((1.0 + n as f32) / (1.0 + df as f32)).ln() + 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    #[test]
    fn corpus_skips_blank_and_derived_columns() {
        let mut t = Table::new(vec!["Company".into(), "Notes".into(), DERIVED_COLUMN.into(), "CTC".into()]);
        t.push_row(vec!["Google".into(), "  ".into(), "old".into(), Value::Number(20.0)]);
        t.push_row(vec![Value::Null, Value::Null, Value::Null, Value::Null]);
        let corpus = build_corpus(&t);
        assert_eq!(corpus, vec!["Company: Google | CTC: 20".to_string(), String::new()]);
    }

    #[test]
    fn vocabulary_is_capped_by_frequency() {
        let corpus = ["alpha alpha beta", "alpha gamma", "beta delta"];
        let config = IndexConfig { max_features: 2, ..IndexConfig::default() };
        let vs = VectorSpace::fit(&corpus, &config);
        let mut terms: Vec<&String> = vs.dictionary.keys().collect();
        terms.sort();
        assert_eq!(terms, vec!["alpha", "beta"]);
        assert_eq!(vs.dictionary["alpha"], 0);
    }

    #[test]
    fn fitting_is_deterministic() {
        let corpus = ["Company: Google | Role: SWE", "Company: Infosys | Role: Analyst"];
        let a = VectorSpace::fit(&corpus, &IndexConfig::default());
        let b = VectorSpace::fit(&corpus, &IndexConfig::default());
        assert_eq!(a.dictionary, b.dictionary);
        assert_eq!(a.idf, b.idf);
        assert_eq!(a.similarities("google swe"), b.similarities("google swe"));
    }

    #[test]
    fn unknown_terms_transform_to_nothing() {
        let vs = VectorSpace::fit(&["Company: Google"], &IndexConfig::default());
        assert!(vs.transform("zebra quartz").is_empty());
        assert_eq!(vs.similarities("zebra quartz"), vec![0.0]);
    }

    #[test]
    fn ties_go_to_the_first_row() {
        let corpus = ["Company: Google", "Company: Google", "Company: Infosys"];
        let vs = VectorSpace::fit(&corpus, &IndexConfig::default());
        let (doc, score) = vs.best_match("Company: Google").unwrap();
        assert_eq!(doc, 0);
        assert!((score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn plain_idf_zeroes_terms_in_every_row() {
        let config = IndexConfig { idf: IdfMode::Plain, ..IndexConfig::default() };
        let vs = VectorSpace::fit(&["company google", "company infosys"], &config);
        assert_eq!(vs.idf[vs.dictionary["company"] as usize], 0.0);
        assert!(vs.transform("company").is_empty());
    }

    #[test]
    fn default_weighting_uses_raw_counts_and_standard_idf() {
        let corpus = ["mca mca", "tcs analyst analyst swe", "analyst swe"];
        let vs = VectorSpace::fit(&corpus, &IndexConfig::default());
        assert!((vs.idf[vs.dictionary["analyst"] as usize] - ((4.0f32 / 3.0).ln() + 1.0)).abs() < 1e-5);
        assert!((vs.idf[vs.dictionary["tcs"] as usize] - (2.0f32.ln() + 1.0)).abs() < 1e-5);

        // The repeated term outweighs the shorter row under raw counts
        let sims = vs.similarities("analyst");
        assert!((sims[1] - 0.771).abs() < 1e-3, "{sims:?}");
        assert!((sims[2] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);
        assert_eq!(vs.best_match("analyst").map(|(doc, _)| doc), Some(1));
    }

    #[test]
    fn sublinear_smoothed_weighting_is_opt_in() {
        let corpus = ["mca mca", "tcs analyst analyst swe", "analyst swe"];
        let config = IndexConfig { idf: IdfMode::Smoothed, sublinear_tf: true, ..IndexConfig::default() };
        let vs = VectorSpace::fit(&corpus, &config);
        assert_eq!(vs.best_match("analyst").map(|(doc, _)| doc), Some(2));
    }

    #[test]
    fn empty_index_has_no_match() {
        let vs = VectorSpace::fit::<&str>(&[], &IndexConfig::default());
        assert!(vs.best_match("anything").is_none());
    }
}
