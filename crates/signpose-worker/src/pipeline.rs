//! The render pipeline: aggregate → smooth → remap → render → encode.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use signpose_media::{
    FfmpegSink, FrameSink, MediaResult, RenderedFrame, SkeletonRemapper, SkeletonRenderer,
    SkeletonSchema, TemporalSmoother, VideoEncoder,
};
use signpose_models::{ClipLocation, FilterConfig, OutputSpec, PoseInstance, RunId};
use signpose_storage::KeypointStore;
use tracing::{debug, info, Instrument};

use crate::aggregator::KeypointAggregator;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::{RunLogger, Stage};
use crate::workspace::RunWorkspace;

/// Result of a render written to a file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderOutcome {
    pub run_id: RunId,
    pub output_path: PathBuf,
    pub frames: usize,
    pub skipped_frames: usize,
}

/// Result of a render written to a caller-provided sink.
#[derive(Debug)]
pub struct SinkOutcome<S> {
    pub run_id: RunId,
    pub frames: usize,
    pub skipped_frames: usize,
    pub sink: S,
}

/// How source keypoints are brought into the schema's convention.
#[derive(Debug, Clone, Copy)]
enum Convention {
    /// Source already matches the schema
    Direct,
    /// Detection convention; synthesize the neck and permute
    Remap(SkeletonRemapper),
}

impl Convention {
    /// Pick the conversion from the source and schema keypoint counts.
    fn select(
        source_keypoints: usize,
        schema: &SkeletonSchema,
        threshold: f32,
    ) -> PipelineResult<Self> {
        if schema.num_keypoints == source_keypoints + 1 {
            Ok(Convention::Remap(SkeletonRemapper::new(threshold)))
        } else if schema.num_keypoints == source_keypoints {
            Ok(Convention::Direct)
        } else {
            Err(PipelineError::configuration(format!(
                "schema '{}' expects {} keypoints; source frames have {}",
                schema.name, schema.num_keypoints, source_keypoints
            )))
        }
    }

    fn apply(&self, pose: &PoseInstance) -> MediaResult<PoseInstance> {
        match self {
            Convention::Direct => Ok(pose.clone()),
            Convention::Remap(remapper) => remapper.remap_instance(pose),
        }
    }
}

/// Renders skeleton videos from keyed keypoint clips.
pub struct RenderPipeline {
    config: PipelineConfig,
    store: Arc<dyn KeypointStore>,
}

impl RenderPipeline {
    pub fn new(config: PipelineConfig, store: Arc<dyn KeypointStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Render `clips` into a video file at `output_path`.
    ///
    /// The file appears only once encoding has finished; on error nothing is
    /// written there.
    pub async fn render(
        &self,
        clips: &[ClipLocation],
        filter: &FilterConfig,
        schema: &SkeletonSchema,
        output: &OutputSpec,
        output_path: impl AsRef<Path>,
    ) -> PipelineResult<RenderOutcome> {
        let output_path = output_path.as_ref();
        let run_id = RunId::new();
        let workspace = RunWorkspace::create(&self.config.work_dir, &run_id).await?;
        let sink = FfmpegSink::new(output_path, workspace.scratch_dir());

        let outcome = self
            .run(run_id, clips, filter, schema, output, sink)
            .await?;

        Ok(RenderOutcome {
            run_id: outcome.run_id,
            output_path: output_path.to_path_buf(),
            frames: outcome.frames,
            skipped_frames: outcome.skipped_frames,
        })
    }

    /// Render `clips` into a caller-provided sink.
    pub async fn render_to_sink<S: FrameSink>(
        &self,
        clips: &[ClipLocation],
        filter: &FilterConfig,
        schema: &SkeletonSchema,
        output: &OutputSpec,
        sink: S,
    ) -> PipelineResult<SinkOutcome<S>> {
        self.run(RunId::new(), clips, filter, schema, output, sink)
            .await
    }

    async fn run<S: FrameSink>(
        &self,
        run_id: RunId,
        clips: &[ClipLocation],
        filter: &FilterConfig,
        schema: &SkeletonSchema,
        output: &OutputSpec,
        sink: S,
    ) -> PipelineResult<SinkOutcome<S>> {
        let logger = RunLogger::new(&run_id);
        let result = self
            .run_stages(&logger, clips, filter, schema, output, sink)
            .instrument(logger.span())
            .await;

        match result {
            Ok((frames, skipped_frames, sink)) => {
                logger.finished(frames, skipped_frames);
                Ok(SinkOutcome {
                    run_id,
                    frames,
                    skipped_frames,
                    sink,
                })
            }
            Err(e) => {
                logger.failed(&e);
                Err(e)
            }
        }
    }

    async fn run_stages<S: FrameSink>(
        &self,
        logger: &RunLogger,
        clips: &[ClipLocation],
        filter: &FilterConfig,
        schema: &SkeletonSchema,
        output: &OutputSpec,
        sink: S,
    ) -> PipelineResult<(usize, usize, S)> {
        let stage = logger.stage(Stage::Validate);
        info!(
            clips = clips.len(),
            filter = %filter.kind(),
            schema = %schema.name,
            "Rendering {}x{}@{} {}",
            output.width,
            output.height,
            output.fps,
            output.container
        );

        // Everything configurable is checked before storage is touched.
        if clips.is_empty() {
            return Err(PipelineError::configuration("no clips to render"));
        }
        output.validate()?;
        schema.validate()?;
        let mut smoother = TemporalSmoother::new(filter)?;
        let renderer =
            SkeletonRenderer::new(self.config.render.clone(), output.width, output.height)?;
        stage.done(0);

        let stage = logger.stage(Stage::Aggregate);

        let aggregation = KeypointAggregator::new(self.store.clone(), self.config.frame_policy)
            .with_max_parallel_reads(self.config.max_parallel_reads)
            .aggregate(clips)
            .await?;
        let stats = aggregation.stats;
        let Some(source_keypoints) = aggregation.num_keypoints() else {
            return Err(PipelineError::source_data(
                clips.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(","),
                "clips contain no readable frames",
            ));
        };
        let convention =
            Convention::select(source_keypoints, schema, self.config.remap_threshold)?;
        debug!(keypoints = source_keypoints, skipped = stats.skipped, "Aggregated clips");
        stage.done(stats.frames);

        let stage = logger.stage(Stage::Smooth);
        let poses = smoother.smooth(aggregation.poses)?;
        debug!(filter = smoother.filter_name(), "Smoothed trajectories");
        stage.done(poses.len());

        let stage = logger.stage(Stage::Render);
        let mut encoder = VideoEncoder::open(output.clone(), poses.len(), sink).await?;
        for pose in &poses {
            let frame = match render_frame(&convention, &renderer, schema, pose) {
                Ok(frame) => frame,
                Err(e) => {
                    encoder.abort().await;
                    return Err(e.into());
                }
            };
            encoder.write(&frame).await?;
        }
        let sink = encoder.finish().await?;
        stage.done(poses.len());

        Ok((stats.frames, stats.skipped, sink))
    }
}

fn render_frame(
    convention: &Convention,
    renderer: &SkeletonRenderer,
    schema: &SkeletonSchema,
    pose: &PoseInstance,
) -> MediaResult<RenderedFrame> {
    let display = convention.apply(pose)?;
    renderer.render(&display, schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(k: usize) -> SkeletonSchema {
        SkeletonSchema::new("test", k, Vec::new(), Vec::new(), vec![None; k], None).unwrap()
    }

    #[test]
    fn test_convention_selection() {
        assert!(matches!(
            Convention::select(133, &schema(134), 0.3).unwrap(),
            Convention::Remap(_)
        ));
        assert!(matches!(
            Convention::select(3, &schema(3), 0.3).unwrap(),
            Convention::Direct
        ));
        assert!(Convention::select(17, &schema(134), 0.3)
            .unwrap_err()
            .is_configuration());
    }
}
