//! Per-frame labels and the post-hoc trial labels derived from them.

use serde::{Deserialize, Serialize};

use physgen_archive::{Archive, Dataset};
use physgen_types::{PhysgenResult, Vector3};

use crate::layout::{check_contiguous_frames, frame_names, FRAMES};

pub const TRIAL_END: &str = "trial_end";
pub const TRIAL_TIMEOUT: &str = "trial_timeout";
pub const TRIAL_COMPLETE: &str = "trial_complete";
pub const RETRIED_EXCHANGES: &str = "retried_exchanges";
pub const TARGET_HAS_MOVED: &str = "target_has_moved";
pub const TARGET_DELTA_POSITION: &str = "target_delta_position";

/// A scenario-specific label value.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelValue {
    Bool(bool),
    F32(f32),
    I32(i32),
    Vec3(Vector3),
}

impl LabelValue {
    fn to_dataset(&self) -> Dataset {
        match self {
            LabelValue::Bool(v) => Dataset::scalar_bool(*v),
            LabelValue::F32(v) => Dataset::scalar_f32(*v),
            LabelValue::I32(v) => Dataset::scalar_i32(*v),
            LabelValue::Vec3(v) => Dataset::f32s(v.to_array().to_vec()),
        }
    }
}

/// Labels of one frame, written under `frames/NNNN/labels/`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameLabels {
    pub trial_end: bool,
    pub trial_timeout: bool,
    pub trial_complete: bool,
    /// Exchanges discarded before this frame was accepted.
    pub retried_exchanges: u32,
    pub extra: Vec<(String, LabelValue)>,
}

impl FrameLabels {
    pub fn with(mut self, key: impl Into<String>, value: LabelValue) -> Self {
        self.extra.push((key.into(), value));
        self
    }

    pub(crate) fn entries(&self) -> Vec<(String, Dataset)> {
        let mut out = vec![
            (TRIAL_END.to_string(), Dataset::scalar_bool(self.trial_end)),
            (TRIAL_TIMEOUT.to_string(), Dataset::scalar_bool(self.trial_timeout)),
            (TRIAL_COMPLETE.to_string(), Dataset::scalar_bool(self.trial_complete)),
            (
                RETRIED_EXCHANGES.to_string(),
                Dataset::scalar_i32(self.retried_exchanges as i32),
            ),
        ];
        out.extend(self.extra.iter().map(|(k, v)| (k.clone(), v.to_dataset())));
        out
    }
}

/// Trial-level labels computed from a finished archive.
///
/// A field is `None` when some frame lacks the label it is derived from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialLabels {
    pub num_frames: usize,
    pub is_trial_valid: Option<bool>,
    pub is_trial_timeout: Option<bool>,
    pub is_trial_complete: Option<bool>,
    pub does_target_move: Option<bool>,
    pub first_target_move_frame: Option<usize>,
    /// Last `target_delta_position`, per axis, rounded to 3 decimals.
    pub final_target_displacement: Option<Vector3>,
}

fn bool_series(archive: &Archive, frames: &[String], key: &str) -> Option<Vec<bool>> {
    frames
        .iter()
        .map(|f| {
            archive
                .get(&format!("{FRAMES}/{f}/labels/{key}"))
                .and_then(|d| d.as_bool())
                .and_then(|v| v.first().copied())
        })
        .collect()
}

fn round3(v: f32) -> f32 {
    (v * 1000.0).round() / 1000.0
}

impl TrialLabels {
    pub fn from_archive(archive: &Archive) -> PhysgenResult<Self> {
        let num_frames = check_contiguous_frames(archive)?;
        let frames = frame_names(archive);

        let trial_end = bool_series(archive, &frames, TRIAL_END);
        let moved = bool_series(archive, &frames, TARGET_HAS_MOVED);

        let final_target_displacement = if frames.is_empty() {
            None
        } else {
            frames
                .iter()
                .map(|f| archive.get(&format!("{FRAMES}/{f}/labels/{TARGET_DELTA_POSITION}")))
                .collect::<Option<Vec<_>>>()
                .and_then(|series| series.last().copied())
                .and_then(|d| d.as_f32())
                .filter(|v| v.len() == 3)
                .map(|v| Vector3::new(round3(v[0]), round3(v[1]), round3(v[2])))
        };

        Ok(Self {
            num_frames,
            is_trial_valid: trial_end.as_ref().map(|s| s.iter().any(|b| *b)),
            is_trial_timeout: bool_series(archive, &frames, TRIAL_TIMEOUT)
                .map(|s| s.iter().any(|b| *b)),
            is_trial_complete: bool_series(archive, &frames, TRIAL_COMPLETE)
                .map(|s| s.iter().any(|b| *b)),
            does_target_move: moved.as_ref().map(|s| s.iter().any(|b| *b)),
            first_target_move_frame: moved.as_ref().and_then(|s| s.iter().position(|b| *b)),
            final_target_displacement,
        })
    }
}
