//! Analysis kinds served by the tracker.
//!
//! Everything that differs between a BLAST search and a Pfam domain scan lives behind
//! [`AnalysisKind`]: the route, the submission body, the terminal predicate and the
//! shape of the result. The tracker itself is written once against this trait.

use crate::error::JobResult;
use crate::model::{TaskRecord, TaskState};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub trait AnalysisKind: Send + Sync + 'static {
    type Output: Clone + Send + Sync + Serialize + DeserializeOwned + 'static;

    /// Stable identifier used for logs and saved results ("blast", "pfamscan").
    fn id(&self) -> &'static str;

    /// Short display name, e.g. "BLAST".
    fn short_name(&self) -> &'static str;

    /// Noun used in status messages, e.g. "BLAST analysis".
    fn noun(&self) -> &'static str;

    /// Path under the base URL used for both submission and result retrieval.
    fn endpoint(&self) -> &'static str;

    fn submission_body(&self, payload: &str) -> Value;

    /// State filter sent with task-status queries.
    fn status_filter(&self) -> TaskState {
        TaskState::Completed
    }

    fn is_success(&self, task: &TaskRecord) -> bool {
        task.state == TaskState::Completed
    }

    /// Parse a 200 submission body (cache hit).
    fn parse_cached(&self, body: Value) -> JobResult<Self::Output>;

    /// Parse the body returned by the result-retrieval endpoint.
    fn parse_fetched(&self, body: Value) -> JobResult<Self::Output>;
}

/// Nucleotide/protein similarity search keyed by gene name.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blast;

impl AnalysisKind for Blast {
    type Output = Value;

    fn id(&self) -> &'static str {
        "blast"
    }

    fn short_name(&self) -> &'static str {
        "BLAST"
    }

    fn noun(&self) -> &'static str {
        "BLAST analysis"
    }

    fn endpoint(&self) -> &'static str {
        "/data/api/blast/"
    }

    fn submission_body(&self, payload: &str) -> Value {
        json!({ "gene": payload })
    }

    fn parse_cached(&self, body: Value) -> JobResult<Value> {
        Ok(body)
    }

    fn parse_fetched(&self, body: Value) -> JobResult<Value> {
        Ok(body)
    }
}

/// Protein domain scan keyed by peptide name.
#[derive(Debug, Clone, Copy, Default)]
pub struct PfamScan;

impl AnalysisKind for PfamScan {
    type Output = Vec<PfamHit>;

    fn id(&self) -> &'static str {
        "pfamscan"
    }

    fn short_name(&self) -> &'static str {
        "Pfam scan"
    }

    fn noun(&self) -> &'static str {
        "Pfam scan"
    }

    fn endpoint(&self) -> &'static str {
        "/data/api/pfamscan/"
    }

    fn submission_body(&self, payload: &str) -> Value {
        json!({ "peptide": payload })
    }

    fn parse_cached(&self, body: Value) -> JobResult<Vec<PfamHit>> {
        // A cached scan may come back as a single hit object.
        match body {
            Value::Array(_) => Ok(serde_json::from_value(body)?),
            other => Ok(vec![serde_json::from_value(other)?]),
        }
    }

    fn parse_fetched(&self, mut body: Value) -> JobResult<Vec<PfamHit>> {
        let hits = body.get_mut("result").map(Value::take).unwrap_or(Value::Null);
        if hits.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(hits)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Span {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeqSpan {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub name: String,
}

/// One Pfam domain match as returned by the scan service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PfamHit {
    #[serde(default)]
    pub seq: SeqSpan,
    #[serde(default)]
    pub hmm: Span,
    #[serde(default)]
    pub env: Span,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub acc: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub clan: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub bits: String,
    #[serde(default)]
    pub evalue: String,
    #[serde(default)]
    pub sig: i64,
    #[serde(default)]
    pub act_site: Option<String>,
    #[serde(default)]
    pub model_length: String,
    #[serde(default)]
    pub align: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlastHsp {
    #[serde(default)]
    pub bit_score: Option<f64>,
    #[serde(default)]
    pub evalue: f64,
    #[serde(default)]
    pub identity: u64,
    #[serde(default)]
    pub align_len: u64,
}

impl BlastHsp {
    pub fn identity_pct(&self) -> Option<f64> {
        (self.align_len > 0).then(|| self.identity as f64 / self.align_len as f64 * 100.0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlastDescription {
    #[serde(default)]
    pub accession: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sciname: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlastHit {
    #[serde(default)]
    pub description: Vec<BlastDescription>,
    #[serde(default)]
    pub hsps: Vec<BlastHsp>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlastSearch {
    #[serde(default)]
    pub query_len: u64,
    #[serde(default)]
    pub hits: Vec<BlastHit>,
}

/// Pull the `search` section out of a JSON2 BLAST report.
///
/// NCBI wraps the report either as an object or as a one-element array under
/// `BlastOutput2`; both forms are accepted.
pub fn blast_search(report: &Value) -> Option<BlastSearch> {
    let root = report.get("BlastOutput2")?;
    let root = match root {
        Value::Array(items) => items.first()?,
        other => other,
    };
    let search = root.pointer("/report/results/search")?;
    serde_json::from_value(search.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pfam_cached_single_object_is_wrapped() {
        let body = json!({"name": "Kinase", "acc": "PF00069.28", "evalue": "1e-30"});
        let hits = PfamScan.parse_cached(body).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Kinase");
    }

    #[test]
    fn pfam_fetched_reads_result_field() {
        let body = json!({
            "result": [
                {"name": "A", "acc": "PF1", "env": {"from": "3", "to": "40"}, "type": "Domain"},
                {"name": "B", "acc": "PF2"}
            ]
        });
        let hits = PfamScan.parse_fetched(body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].env.to, "40");
        assert_eq!(hits[0].kind, "Domain");
    }

    #[test]
    fn pfam_fetched_without_result_is_empty() {
        assert!(PfamScan.parse_fetched(json!({})).unwrap().is_empty());
    }

    #[test]
    fn pfam_rejects_malformed_hits() {
        assert!(PfamScan.parse_cached(json!("not a hit")).is_err());
    }

    #[test]
    fn submission_bodies_match_backend_fields() {
        assert_eq!(Blast.submission_body("geneA"), json!({"gene": "geneA"}));
        assert_eq!(PfamScan.submission_body("pep1"), json!({"peptide": "pep1"}));
    }

    #[test]
    fn blast_search_accepts_object_and_array_roots() {
        let search = json!({"query_len": 120, "hits": [
            {"description": [{"accession": "XP_1", "title": "kinase"}],
             "hsps": [{"evalue": 1e-20, "identity": 90, "align_len": 100, "bit_score": 210.5}]}
        ]});
        let obj = json!({"BlastOutput2": {"report": {"results": {"search": search.clone()}}}});
        let arr = json!({"BlastOutput2": [{"report": {"results": {"search": search}}}]});
        for report in [obj, arr] {
            let s = blast_search(&report).unwrap();
            assert_eq!(s.query_len, 120);
            assert_eq!(s.hits[0].hsps[0].identity_pct(), Some(90.0));
        }
        assert!(blast_search(&json!({"matches": []})).is_none());
    }
}
