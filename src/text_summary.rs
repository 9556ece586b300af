//! Text summary builder for CLI output.
//!
//! Turns a finished BLAST report or Pfam hit list into human-readable lines for text mode.

use crate::analysis::{blast_search, PfamHit};
use crate::storage::StoredResult;
use serde_json::Value;

/// Hits listed in a BLAST summary before the rest are elided.
pub const DEFAULT_TOP_HITS: usize = 10;

/// Pre-formatted lines for text output.
pub struct TextSummary {
    pub lines: Vec<String>,
}

pub fn blast_summary(report: &Value, top: usize) -> TextSummary {
    let mut lines = Vec::new();
    let Some(search) = blast_search(report) else {
        lines.push("BLAST report has no search section".to_string());
        return TextSummary { lines };
    };

    lines.push(format!("Query length: {}", search.query_len));
    lines.push(format!("Hits: {}", search.hits.len()));
    for (i, hit) in search.hits.iter().take(top).enumerate() {
        let desc = hit.description.first();
        let accession = desc.and_then(|d| d.accession.as_deref()).unwrap_or("-");
        let title = desc.and_then(|d| d.title.as_deref()).unwrap_or("");
        let Some(hsp) = hit.hsps.first() else {
            lines.push(format!("{:>3}. {accession} {title}", i + 1));
            continue;
        };
        let identity = hsp
            .identity_pct()
            .map(|p| format!("{p:.1}%"))
            .unwrap_or_else(|| "-".into());
        let bits = hsp
            .bit_score
            .map(|b| format!("{b:.1}"))
            .unwrap_or_else(|| "-".into());
        lines.push(format!(
            "{:>3}. {accession} identity {identity} evalue {:.2e} bits {bits}  {title}",
            i + 1,
            hsp.evalue
        ));
    }
    if search.hits.len() > top {
        lines.push(format!("... {} more", search.hits.len() - top));
    }
    TextSummary { lines }
}

pub fn pfam_summary(hits: &[PfamHit]) -> TextSummary {
    let mut lines = vec![format!("Domains: {}", hits.len())];
    for hit in hits {
        lines.push(format!(
            "{} {} env {}-{} evalue {} bits {}",
            hit.acc, hit.name, hit.env.from, hit.env.to, hit.evalue, hit.bits
        ));
    }
    TextSummary { lines }
}

/// One line per saved result, for `history`.
pub fn history_summary(results: &[StoredResult]) -> TextSummary {
    if results.is_empty() {
        return TextSummary {
            lines: vec!["No saved results".to_string()],
        };
    }
    let lines = results
        .iter()
        .map(|r| format!("{}  {:<9} {}", r.saved_at, r.kind, r.payload))
        .collect();
    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Span;
    use serde_json::json;

    fn report(hits: usize) -> Value {
        let hits: Vec<Value> = (0..hits)
            .map(|i| {
                json!({
                    "description": [{"accession": format!("XP_{i}"), "title": "protein kinase"}],
                    "hsps": [{"evalue": 2e-40, "identity": 45, "align_len": 50, "bit_score": 150.3}]
                })
            })
            .collect();
        json!({"BlastOutput2": [{"report": {"results": {"search": {"query_len": 300, "hits": hits}}}}]})
    }

    #[test]
    fn blast_lists_top_hits() {
        let summary = blast_summary(&report(3), 2);
        assert_eq!(summary.lines[0], "Query length: 300");
        assert_eq!(summary.lines[1], "Hits: 3");
        assert!(summary.lines[2].contains("XP_0"));
        assert!(summary.lines[2].contains("identity 90.0%"));
        assert!(summary.lines[2].contains("bits 150.3"));
        assert_eq!(summary.lines.last().unwrap(), "... 1 more");
    }

    #[test]
    fn blast_without_search_section() {
        let summary = blast_summary(&json!({"status": "ok"}), DEFAULT_TOP_HITS);
        assert_eq!(summary.lines.len(), 1);
    }

    #[test]
    fn pfam_one_line_per_domain() {
        let hits = vec![PfamHit {
            acc: "PF00069.28".into(),
            name: "Pkinase".into(),
            env: Span {
                from: "12".into(),
                to: "270".into(),
            },
            evalue: "3.1e-60".into(),
            bits: "201.4".into(),
            ..Default::default()
        }];
        let summary = pfam_summary(&hits);
        assert_eq!(summary.lines[0], "Domains: 1");
        assert_eq!(
            summary.lines[1],
            "PF00069.28 Pkinase env 12-270 evalue 3.1e-60 bits 201.4"
        );
    }

    #[test]
    fn empty_history() {
        assert_eq!(history_summary(&[]).lines, ["No saved results"]);
    }
}
