//! Run pipeline: query, render and stage every letter, convert, merge, then
//! flag the requests as processed

use crate::config::LetterConfig;
use crate::db::{LetterSource, LetterStore, QuerySet};
use crate::error::Result;
use crate::letters::{DocumentWriter, LetterRenderer};
use crate::paths::StagingLayout;
use crate::pdf::{BatchMerger, PdfConverter};
use crate::status::RunLog;
use letter_types::{KindSummary, LetterKind, RunContext, RunSummary};

/// What a run covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub kinds: Vec<LetterKind>,
    pub merge: bool,
    pub mark_processed: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            kinds: vec![LetterKind::GardenWaste, LetterKind::Recycling],
            merge: true,
            mark_processed: true,
        }
    }
}

pub struct LetterPipeline<S: LetterSource> {
    source: S,
    options: PipelineOptions,
    context: RunContext,
    layout: StagingLayout,
    renderer: LetterRenderer,
    converter: PdfConverter,
    merger: BatchMerger,
}

impl<S: LetterSource> LetterPipeline<S> {
    pub fn new(
        source: S,
        config: &LetterConfig,
        options: PipelineOptions,
        context: RunContext,
    ) -> Self {
        let layout = StagingLayout::new(&config.paths.output_root);
        Self {
            source,
            options,
            renderer: LetterRenderer::new(context),
            converter: PdfConverter::new(config.renderer.clone(), layout.clone()),
            merger: BatchMerger::new(layout.clone()),
            layout,
            context,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run every stage in order. The first error stops the run; requests are
    /// only flagged once every letter has been converted (and merged).
    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let mut writer = DocumentWriter::new(self.layout.clone());

        for &kind in &self.options.kinds {
            let requests = self.source.fetch_requests(kind).await?;
            let mut kind_summary = KindSummary {
                requests: requests.len(),
                ..KindSummary::default()
            };

            for request in requests {
                let document = self.renderer.render(&self.source, request).await?;
                kind_summary.staged_files += writer.write(&document)?.len();
            }

            log::info!(
                "Staged {} files for {} {} requests",
                kind_summary.staged_files,
                kind_summary.requests,
                kind
            );
            summary.kinds.push((kind, kind_summary));
        }

        for (kind, kind_summary) in summary.kinds.iter_mut() {
            kind_summary.pdfs = self.converter.convert_all(*kind).await?.len();
        }

        if self.options.merge {
            for (kind, kind_summary) in summary.kinds.iter_mut() {
                if let Some(batch) = self.merger.merge_kind(*kind, &self.context)? {
                    self.merger.cleanup(&batch)?;
                    kind_summary.merged = Some(batch.output);
                }
            }
        }

        if self.options.mark_processed {
            self.source.mark_processed(&self.options.kinds).await?;
            summary.marked_processed = true;
        } else {
            log::info!("Skipping processed-flag updates");
        }

        log::info!("Run finished with {} requests", summary.total_requests());
        Ok(summary)
    }
}

/// Connect, load the run's queries and run the pipeline over the store
pub async fn run_letters(
    config: &LetterConfig,
    options: PipelineOptions,
    context: RunContext,
) -> Result<RunSummary> {
    let store = LetterStore::connect(&config.database).await?;

    let queries = match QuerySet::load(
        &config.paths.queries_dir,
        &options.kinds,
        options.mark_processed,
    ) {
        Ok(queries) => queries,
        Err(e) => {
            store.close().await;
            return Err(e);
        }
    };

    let pipeline = LetterPipeline::new(store.with_queries(queries), config, options, context);
    let result = pipeline.run().await;
    pipeline.source().close().await;
    result
}

/// [`run_letters`] plus the run log: one success line with the counts, or
/// exactly one failure line with the error text
pub async fn run_and_record(
    config: &LetterConfig,
    options: PipelineOptions,
    context: RunContext,
) -> Result<RunSummary> {
    let run_log = RunLog::new(&config.paths.log_file);

    match run_letters(config, options, context).await {
        Ok(summary) => {
            run_log.success(&context, &summary.describe())?;
            Ok(summary)
        }
        Err(e) => {
            if let Err(log_err) = run_log.failure(&context, &e) {
                log::error!(
                    "Failed to write run log {}: {}",
                    run_log.path().display(),
                    log_err
                );
            }
            Err(e)
        }
    }
}
