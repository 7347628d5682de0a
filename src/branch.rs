use crate::pipeline::{Pipeline, PipelineTask};

/// Fraction of recent complete runs that must pass for a branch to be healthy.
/// The comparison is strict: exactly half passing is not healthy.
pub const HEALTHY_RATIO: f64 = 0.5;

const REF_PREFIX: &str = "refs/heads/";

/// Recent pipeline history of a target branch, most recent run first.
#[derive(Debug)]
pub struct Branch {
    name: String,
    pipelines: Vec<Box<dyn Pipeline>>,
}

impl Branch {
    pub fn new(name: impl Into<String>, pipelines: Vec<Box<dyn Pipeline>>) -> Self {
        Self {
            name: name.into(),
            pipelines,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Branch name without the `refs/heads/` prefix.
    pub fn truncated_name(&self) -> &str {
        self.name.strip_prefix(REF_PREFIX).unwrap_or(&self.name)
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    pub fn most_recent_complete_pipeline(&self) -> Option<&dyn Pipeline> {
        self.pipelines
            .iter()
            .find(|p| p.is_complete())
            .map(|p| &**p)
    }

    /// Nearest-rank percentile of the durations of every task named like `task`
    /// that ran on this branch. `None` when no such task ran.
    pub fn percentile_time_for_pipeline_task(
        &self,
        percentile: f64,
        task: &PipelineTask,
    ) -> Option<i64> {
        let durations: Vec<i64> = self
            .pipelines
            .iter()
            .flat_map(|p| p.tasks())
            .filter(|t| t.name() == task.name())
            .filter_map(PipelineTask::duration)
            .collect();

        nearest_rank(durations, percentile)
    }

    /// Considers at most the `window` most recent complete runs. A branch without
    /// any complete run is not healthy.
    pub fn is_healthy(&self, window: usize) -> bool {
        let considered: Vec<&dyn Pipeline> = self
            .pipelines
            .iter()
            .map(|p| &**p)
            .filter(|p| p.is_complete())
            .take(window)
            .collect();

        if considered.is_empty() {
            return false;
        }

        let passing = considered.iter().filter(|p| !p.is_failure()).count();
        #[allow(clippy::cast_precision_loss)]
        let ratio = passing as f64 / considered.len() as f64;
        ratio > HEALTHY_RATIO
    }
}

/// Value at index `ceil(p / 100 * n) - 1` of the ascending values, clamped to the
/// first element for tiny percentiles.
pub(crate) fn nearest_rank(mut values: Vec<i64>, percentile: f64) -> Option<i64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let rank = ((percentile / 100.0) * values.len() as f64).ceil() as usize;
    let index = rank.max(1).min(values.len()) - 1;

    Some(values[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::task_lasting;
    use crate::testing::FakePipeline;

    fn history(runs: Vec<FakePipeline>) -> Branch {
        Branch::new(
            "refs/heads/master",
            runs.into_iter()
                .map(|p| Box::new(p) as Box<dyn Pipeline>)
                .collect(),
        )
    }

    mod nearest_rank {
        use super::*;

        #[test]
        fn returns_none_for_empty_dataset() {
            assert_eq!(nearest_rank(vec![], 50.0), None);
        }

        #[test]
        fn median_of_four_values_is_second_value() {
            // ceil(0.5 * 4) - 1 = 1
            assert_eq!(nearest_rank(vec![100, 200, 300, 400], 50.0), Some(200));
        }

        #[test]
        fn first_percentile_is_smallest_value() {
            assert_eq!(nearest_rank(vec![400, 100, 300, 200], 1.0), Some(100));
        }

        #[test]
        fn hundredth_percentile_is_largest_value() {
            assert_eq!(nearest_rank(vec![400, 100, 300, 200], 100.0), Some(400));
        }

        #[test]
        fn sorts_before_selecting() {
            // ceil(0.75 * 4) - 1 = 2
            assert_eq!(nearest_rank(vec![300, 400, 100, 200], 75.0), Some(300));
        }

        #[test]
        fn single_value_is_every_percentile() {
            assert_eq!(nearest_rank(vec![42], 1.0), Some(42));
            assert_eq!(nearest_rank(vec![42], 99.0), Some(42));
        }
    }

    mod percentile_time_for_pipeline_task {
        use super::*;

        #[test]
        fn collects_same_named_tasks_across_runs() {
            let branch = history(vec![
                FakePipeline::passed(1).with_tasks(vec![task_lasting("test", 300), task_lasting("lint", 5)]),
                FakePipeline::passed(2).with_tasks(vec![task_lasting("test", 100)]),
                FakePipeline::failed(3).with_tasks(vec![task_lasting("test", 200), task_lasting("test", 400)]),
            ]);
            let probe = task_lasting("test", 0);
            assert_eq!(branch.percentile_time_for_pipeline_task(50.0, &probe), Some(200));
            assert_eq!(branch.percentile_time_for_pipeline_task(1.0, &probe), Some(100));
        }

        #[test]
        fn returns_none_when_task_never_ran_on_branch() {
            let branch = history(vec![FakePipeline::passed(1).with_tasks(vec![task_lasting("lint", 5)])]);
            assert_eq!(
                branch.percentile_time_for_pipeline_task(1.0, &task_lasting("test", 0)),
                None
            );
        }
    }

    mod is_healthy {
        use super::*;

        #[test]
        fn healthy_when_more_than_half_of_window_passed() {
            let branch = history(vec![
                FakePipeline::passed(1),
                FakePipeline::failed(2),
                FakePipeline::passed(3),
                FakePipeline::failed(4),
                FakePipeline::failed(5),
            ]);
            assert!(branch.is_healthy(3));
        }

        #[test]
        fn exactly_half_is_not_healthy() {
            let branch = history(vec![FakePipeline::passed(1), FakePipeline::failed(2)]);
            assert!(!branch.is_healthy(2));
        }

        #[test]
        fn ignores_incomplete_runs() {
            let branch = history(vec![
                FakePipeline::running(1),
                FakePipeline::failed(2),
                FakePipeline::failed(3),
                FakePipeline::passed(4),
            ]);
            assert!(!branch.is_healthy(2));
            assert!(!branch.is_healthy(3));
        }

        #[test]
        fn shorter_history_than_window_uses_what_exists() {
            let branch = history(vec![FakePipeline::passed(1)]);
            assert!(branch.is_healthy(3));
        }

        #[test]
        fn no_complete_runs_is_not_healthy() {
            assert!(!history(vec![FakePipeline::running(1)]).is_healthy(3));
            assert!(!history(vec![]).is_healthy(3));
        }
    }

    #[test]
    fn most_recent_complete_pipeline_skips_running_ones() {
        let branch = history(vec![FakePipeline::running(1), FakePipeline::failed(2), FakePipeline::passed(3)]);
        assert_eq!(branch.most_recent_complete_pipeline().map(|p| p.id()), Some(2));
        assert!(history(vec![FakePipeline::running(1)]).most_recent_complete_pipeline().is_none());
    }

    #[test]
    fn truncated_name_strips_ref_prefix() {
        assert_eq!(history(vec![]).truncated_name(), "master");
        assert_eq!(Branch::new("release/1.0", vec![]).truncated_name(), "release/1.0");
    }
}
