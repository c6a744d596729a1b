//! Result payloads and their renderings.
//!
//! Every command produces one report. The report serializes as a single JSON
//! document (`json`), one object per table row (`jsonl`), Markdown tables
//! (`md`), or a single status line (`summary`). Payloads go to stdout; logs
//! never do.

pub mod markdown;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tt_common::{OutputFormat, Result, SCHEMA_VERSION};
use tt_config::ConfigSnapshot;

use crate::classify::{ClassProfile, ClassificationSummary};
use crate::features::TransformReport;
use crate::merge::{round_to, OutputTable};
use crate::mixture::FittedModel;
use crate::select::ComparisonTable;
use crate::standardize::Standardizer;
use markdown::{fmt_num, table};

/// Fields shared by every result payload.
#[derive(Debug, Clone, Serialize)]
pub struct ReportHeader {
    pub schema_version: String,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub config: ConfigSnapshot,
}

impl ReportHeader {
    pub fn new(run_id: impl Into<String>, config: ConfigSnapshot) -> Self {
        ReportHeader {
            schema_version: SCHEMA_VERSION.to_string(),
            run_id: run_id.into(),
            generated_at: Utc::now(),
            config,
        }
    }
}

/// Output of `compare`.
#[derive(Debug, Clone, Serialize)]
pub struct CompareReport {
    #[serde(flatten)]
    pub header: ReportHeader,
    pub transform: TransformReport,
    pub standardizer: Standardizer,
    pub comparison: ComparisonTable,
}

/// Output of `classify`.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifyReport {
    #[serde(flatten)]
    pub header: ReportHeader,
    pub transform: TransformReport,
    pub standardizer: Standardizer,
    pub fit: FittedModel,
    pub summary: ClassificationSummary,
    pub profiles: Vec<ClassProfile>,
    pub table: OutputTable,
}

/// A payload that renders in every [`OutputFormat`].
pub trait Report: Serialize {
    /// One JSON value per line for `jsonl`.
    fn records(&self) -> Vec<serde_json::Value>;

    fn markdown(&self, precision: u32) -> String;

    fn summary_line(&self) -> String;
}

/// Render a report in the requested format. The result ends with a newline.
pub fn render<R: Report>(report: &R, format: OutputFormat, precision: u32) -> Result<String> {
    let mut out = match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
        OutputFormat::Jsonl => {
            let lines = report
                .records()
                .iter()
                .map(serde_json::to_string)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            lines.join("\n")
        }
        OutputFormat::Md => report.markdown(precision),
        OutputFormat::Summary => report.summary_line(),
    };
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

fn transform_markdown(report: &TransformReport) -> String {
    let mut out = format!(
        "{} of {} units retained, {} excluded.\n",
        report.retained,
        report.total,
        report.excluded.len()
    );
    if !report.excluded.is_empty() {
        out.push('\n');
        let rows: Vec<Vec<String>> = report
            .excluded
            .iter()
            .map(|e| {
                let reason = serde_json::to_value(&e.reason)
                    .ok()
                    .and_then(|v| v.get("reason").and_then(|r| r.as_str()).map(str::to_string))
                    .unwrap_or_default();
                vec![e.id.to_string(), reason, e.reason.to_string()]
            })
            .collect();
        out.push_str(&table(&["id", "reason", "detail"], &rows));
    }
    out
}

fn flags(degenerate: bool, regularized: bool, converged: bool) -> String {
    let mut f = Vec::new();
    if !converged {
        f.push("unconverged");
    }
    if degenerate {
        f.push("degenerate");
    }
    if regularized {
        f.push("regularized");
    }
    f.join(",")
}

impl Report for CompareReport {
    fn records(&self) -> Vec<serde_json::Value> {
        self.comparison
            .rows
            .iter()
            .map(|row| serde_json::json!(row))
            .collect()
    }

    fn markdown(&self, precision: u32) -> String {
        let headers = [
            "k",
            "structure",
            "log_likelihood",
            "parameters",
            "aic",
            "bic",
            "sabic",
            "entropy",
            "prob_min",
            "n_min",
            "flags",
        ];
        let rows: Vec<Vec<String>> = self
            .comparison
            .rows
            .iter()
            .map(|r| {
                vec![
                    r.k.to_string(),
                    r.structure.to_string(),
                    fmt_num(r.log_likelihood, precision),
                    r.n_parameters.to_string(),
                    fmt_num(r.aic, precision),
                    fmt_num(r.bic, precision),
                    fmt_num(r.sabic, precision),
                    fmt_num(r.entropy, precision),
                    fmt_num(r.prob_min, precision),
                    fmt_num(r.n_min, precision),
                    flags(r.degenerate, r.regularized, r.converged),
                ]
            })
            .collect();

        let mut out = String::from("# Model comparison\n\n");
        out.push_str(&transform_markdown(&self.transform));
        out.push_str(&format!(
            "\nSorted by {} ({} observations, config {}).\n\n",
            self.comparison.sorted_by,
            self.comparison.n_observations,
            self.header.config.short_id()
        ));
        out.push_str(&table(&headers, &rows));
        out
    }

    fn summary_line(&self) -> String {
        let best = self
            .comparison
            .rows
            .first()
            .map(|r| {
                format!(
                    "lowest {} {} k={} ({})",
                    self.comparison.sorted_by,
                    r.structure,
                    r.k,
                    fmt_num(r.criterion(self.comparison.sorted_by), 2)
                )
            })
            .unwrap_or_else(|| "no candidates".to_string());
        format!(
            "[{}] compare: {} candidates on {} units; {}",
            self.header.run_id,
            self.comparison.len(),
            self.comparison.n_observations,
            best
        )
    }
}

impl Report for ClassifyReport {
    fn records(&self) -> Vec<serde_json::Value> {
        self.table
            .records()
            .into_iter()
            .map(serde_json::Value::Object)
            .collect()
    }

    fn markdown(&self, precision: u32) -> String {
        let fit = &self.fit;
        let mut out = format!(
            "# Classification: {} with {} classes\n\n",
            fit.structure, fit.k
        );
        out.push_str(&transform_markdown(&self.transform));
        out.push_str(&format!(
            "\nLog-likelihood {} after {} iterations ({}), best of {} restarts.\n",
            fmt_num(fit.log_likelihood, precision),
            fit.iterations,
            if fit.converged { "converged" } else { "not converged" },
            fit.restart_log_likelihoods.len()
        ));
        out.push_str(&format!(
            "{} of {} units have a largest posterior below {}.\n",
            self.summary.low_confidence, self.summary.n_units, self.summary.low_confidence_threshold
        ));

        out.push_str("\n## Class profiles\n\n");
        let mut headers = vec![
            "class".to_string(),
            "size".to_string(),
            "proportion".to_string(),
            "mean_posterior".to_string(),
        ];
        headers.extend(self.standardizer.feature_names.iter().map(|f| format!("raw_{}", f)));
        let rows: Vec<Vec<String>> = self
            .profiles
            .iter()
            .map(|p| {
                let mut row = vec![
                    p.label.to_string(),
                    p.size.to_string(),
                    fmt_num(p.proportion, precision),
                    fmt_num(p.mean_posterior, precision),
                ];
                row.extend(p.mean_raw.iter().map(|v| fmt_num(*v, precision)));
                row
            })
            .collect();
        out.push_str(&table(&headers, &rows));

        out.push_str("\n## Units\n\n");
        let rows: Vec<Vec<String>> = self
            .table
            .rows
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect();
        out.push_str(&table(&self.table.columns, &rows));
        out
    }

    fn summary_line(&self) -> String {
        let sizes = self
            .summary
            .class_sizes
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "[{}] classify: {} k={} on {} units; sizes {}; ll {}; {} low-confidence{}",
            self.header.run_id,
            self.summary.structure,
            self.summary.k,
            self.summary.n_units,
            sizes,
            round_to(self.fit.log_likelihood, 2),
            self.summary.low_confidence,
            if self.fit.converged { "" } else { "; NOT CONVERGED" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogContext;
    use crate::pipeline::Pipeline;
    use crate::synthetic::synthetic_units;
    use tt_common::CovarianceStructure;
    use tt_config::{load_config, PresetName};

    fn reports() -> (CompareReport, ClassifyReport) {
        let mut loaded = load_config(None, Some(PresetName::Quick)).unwrap();
        loaded.config.fit.max_classes = 2;
        loaded.config.fit.restarts = 2;
        loaded.revalidate().unwrap();
        let pipeline = Pipeline::new(loaded.config.clone(), LogContext::new("run-output"));
        let units = synthetic_units(24, 5, 1).unwrap();
        let data = pipeline.prepare(&units).unwrap();
        let comparison = pipeline.compare(&data).unwrap();
        let classified = pipeline.classify(&data, 2, CovarianceStructure::Eei, None).unwrap();

        let compare = CompareReport {
            header: ReportHeader::new("run-output", loaded.snapshot.clone()),
            transform: data.report.clone(),
            standardizer: data.standardizer.clone(),
            comparison,
        };
        let classify = ClassifyReport {
            header: ReportHeader::new("run-output", loaded.snapshot),
            transform: data.report,
            standardizer: data.standardizer,
            fit: classified.model,
            summary: classified.result.summary,
            profiles: classified.result.profiles,
            table: classified.table,
        };
        (compare, classify)
    }

    #[test]
    fn json_is_one_document() {
        let (compare, classify) = reports();
        let doc: serde_json::Value =
            serde_json::from_str(&render(&compare, OutputFormat::Json, 4).unwrap()).unwrap();
        assert_eq!(doc["schema_version"], SCHEMA_VERSION);
        assert_eq!(doc["run_id"], "run-output");
        assert_eq!(doc["comparison"]["rows"].as_array().unwrap().len(), 4);
        assert_eq!(doc["transform"]["retained"], 24);

        let doc: serde_json::Value =
            serde_json::from_str(&render(&classify, OutputFormat::Json, 4).unwrap()).unwrap();
        assert_eq!(doc["fit"]["k"], 2);
        assert_eq!(doc["profiles"].as_array().unwrap().len(), 2);
        assert_eq!(doc["table"]["rows"].as_array().unwrap().len(), 24);
    }

    #[test]
    fn jsonl_has_one_line_per_row() {
        let (compare, classify) = reports();
        let out = render(&compare, OutputFormat::Jsonl, 4).unwrap();
        assert_eq!(out.lines().count(), 4);
        let out = render(&classify, OutputFormat::Jsonl, 4).unwrap();
        assert_eq!(out.lines().count(), 24);
        for line in out.lines() {
            let v: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(v.get("id").is_some());
            assert!(v.get("class").is_some());
        }
    }

    #[test]
    fn markdown_and_summary() {
        let (compare, classify) = reports();
        let md = render(&compare, OutputFormat::Md, 3).unwrap();
        assert!(md.starts_with("# Model comparison"));
        assert!(md.contains("1 excluded"));
        assert!(md.contains("| k | structure |"));

        let md = render(&classify, OutputFormat::Md, 3).unwrap();
        assert!(md.contains("## Class profiles"));
        assert!(md.contains("## Units"));

        let line = render(&compare, OutputFormat::Summary, 3).unwrap();
        assert_eq!(line.lines().count(), 1);
        assert!(line.starts_with("[run-output] compare: 4 candidates on 24 units"));
        let line = render(&classify, OutputFormat::Summary, 3).unwrap();
        assert!(line.contains("EEI k=2 on 24 units"));
    }
}
