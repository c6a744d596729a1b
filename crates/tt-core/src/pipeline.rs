//! End-to-end batch pipeline: units → features → standardized matrix →
//! candidate sweep or single fit → classification → output table.

use tt_common::{CovarianceStructure, Error, Result, Unit};
use tt_config::TypologyConfig;
use tt_math::Matrix;

use crate::classify::{ClassificationAssigner, ClassificationResult};
use crate::features::{transform_units, FeatureMatrix, TransformReport};
use crate::log_event;
use crate::logging::{event_names, LogContext, Stage};
use crate::merge::{ColumnSchema, OutputTable, ResultMerger};
use crate::mixture::{EstimatorOptions, FittedModel, MixtureModelEstimator};
use crate::select::{candidate_grid, ComparisonTable, ModelSelector};
use crate::standardize::Standardizer;

/// Model-ready data derived from one batch of units.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub features: FeatureMatrix,
    pub report: TransformReport,
    pub standardizer: Standardizer,
    /// N×D z-scores, row-aligned with `features`.
    pub standardized: Matrix,
}

/// Output of fitting and classifying one candidate.
#[derive(Debug, Clone)]
pub struct Classification {
    pub model: FittedModel,
    pub result: ClassificationResult,
    pub table: OutputTable,
}

/// Runs the pipeline under one configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: TypologyConfig,
    ctx: LogContext,
}

impl Pipeline {
    pub fn new(config: TypologyConfig, ctx: LogContext) -> Self {
        Pipeline { config, ctx }
    }

    pub fn config(&self) -> &TypologyConfig {
        &self.config
    }

    fn estimator_options(&self) -> EstimatorOptions {
        EstimatorOptions::from(&self.config.fit)
    }

    /// Derive and standardize features.
    ///
    /// Fails when no unit survives the transform or a feature is constant.
    pub fn prepare(&self, units: &[Unit]) -> Result<PreparedData> {
        let (features, report) = transform_units(units, &self.config.features)?;
        log_event!(
            self.ctx,
            INFO,
            event_names::TRANSFORM_FINISHED,
            Stage::Transform,
            format!("{} of {} units retained", report.retained, report.total),
            retained = report.retained,
            excluded = report.excluded.len()
        );
        if features.is_empty() {
            return Err(Error::EmptyInput(format!(
                "all {} units were excluded during feature derivation",
                report.total
            )));
        }

        let (standardizer, standardized) =
            Standardizer::fit_transform(&features.values, &features.feature_names)?;
        log_event!(
            self.ctx,
            DEBUG,
            event_names::STANDARDIZE_FINISHED,
            Stage::Standardize,
            "features standardized",
            rows = standardized.rows(),
            features = standardized.cols()
        );

        Ok(PreparedData {
            features,
            report,
            standardizer,
            standardized,
        })
    }

    /// Fit every configured candidate and tabulate.
    pub fn compare(&self, data: &PreparedData) -> Result<ComparisonTable> {
        let fit = &self.config.fit;
        let _span = self.ctx.span(Stage::Select).entered();
        let candidates = candidate_grid(fit.min_classes..=fit.max_classes, &fit.structures);
        let table = ModelSelector::new(self.estimator_options()).compare(&data.standardized, &candidates)?;
        log_event!(
            self.ctx,
            INFO,
            event_names::SELECT_FINISHED,
            Stage::Select,
            format!("{} candidates compared", table.len()),
            candidates = table.len(),
            unconverged = table.rows.iter().filter(|r| !r.converged).count()
        );
        Ok(table)
    }

    /// Fit one candidate, classify, and merge.
    ///
    /// `columns` overrides the default output schema.
    pub fn classify(
        &self,
        data: &PreparedData,
        k: usize,
        structure: CovarianceStructure,
        columns: Option<&[String]>,
    ) -> Result<Classification> {
        let names = &data.features.feature_names;
        let schema = match columns {
            Some(cols) => ColumnSchema::from_names(cols, k, names)?,
            None => ColumnSchema::default_for(k, names),
        };

        let model = {
            let _span = self.ctx.span(Stage::Fit).entered();
            MixtureModelEstimator::new(self.estimator_options()).fit(&data.standardized, k, structure)?
        };
        if !model.converged {
            log_event!(
                self.ctx,
                WARN,
                event_names::FIT_CANDIDATE_DONE,
                Stage::Fit,
                format!("{} k={} did not converge in {} iterations", structure, k, model.iterations)
            );
        }

        let result = ClassificationAssigner::new(self.config.output.low_confidence).assign(
            &model,
            &data.features,
            &data.standardized,
        )?;
        log_event!(
            self.ctx,
            INFO,
            event_names::CLASSIFY_FINISHED,
            Stage::Classify,
            format!("{} units classified into {} classes", result.units.len(), k),
            low_confidence = result.summary.low_confidence
        );

        let table = ResultMerger::new(self.config.output.precision).merge(
            &result,
            &data.features,
            &data.standardized,
            &schema,
        )?;

        Ok(Classification {
            model,
            result,
            table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::synthetic_units;
    use tt_config::{get_preset, PresetName};

    fn pipeline() -> Pipeline {
        let mut config = get_preset(PresetName::Quick);
        config.fit.max_classes = 3;
        config.fit.restarts = 3;
        Pipeline::new(config, LogContext::new("run-test"))
    }

    #[test]
    fn prepare_excludes_invalid_units() {
        let units = synthetic_units(40, 1, 3).unwrap();
        let data = pipeline().prepare(&units).unwrap();
        assert_eq!(data.report.total, 43);
        assert_eq!(data.report.retained, 40);
        assert_eq!(data.report.excluded.len(), 3);
        assert_eq!(data.standardized.shape(), (40, 5));
    }

    #[test]
    fn prepare_fails_when_nothing_survives() {
        let units = vec![Unit::new("x", "X")];
        assert!(matches!(pipeline().prepare(&units), Err(Error::EmptyInput(_))));
    }

    #[test]
    fn compare_covers_the_grid() {
        let units = synthetic_units(40, 2, 0).unwrap();
        let p = pipeline();
        let data = p.prepare(&units).unwrap();
        let table = p.compare(&data).unwrap();
        assert_eq!(table.len(), 3 * 2);
        for w in table.rows.windows(2) {
            assert!(w[0].bic <= w[1].bic);
        }
    }

    #[test]
    fn classify_produces_one_row_per_unit() {
        let units = synthetic_units(30, 3, 2).unwrap();
        let p = pipeline();
        let data = p.prepare(&units).unwrap();
        let out = p.classify(&data, 2, CovarianceStructure::Vvi, None).unwrap();
        assert_eq!(out.table.rows.len(), 30);
        assert_eq!(out.table.columns.len(), 3 + 2 + 5 + 5);
        assert_eq!(out.result.profiles.len(), 2);
    }

    #[test]
    fn classify_rejects_unknown_column() {
        let units = synthetic_units(20, 4, 0).unwrap();
        let p = pipeline();
        let data = p.prepare(&units).unwrap();
        let cols = vec!["id".to_string(), "tract_area".to_string()];
        assert!(matches!(
            p.classify(&data, 2, CovarianceStructure::Eei, Some(&cols)),
            Err(Error::UnknownColumn(_))
        ));
    }
}
