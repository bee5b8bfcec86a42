//! Streaming writer for one trial archive.

use std::path::{Path, PathBuf};

use physgen_archive::ArchiveWriter;
use physgen_protocol::{RecordKind, ResponseBatch};
use physgen_types::{ObjectId, PhysgenError, PhysgenResult};

use crate::frame::{sleep_hint, FrameData};
use crate::labels::FrameLabels;
use crate::layout::frame_path;
use crate::static_data::StaticSection;

/// Writes a trial in order: static section, then frames 0, 1, 2, ...
pub struct TrialWriter {
    archive: ArchiveWriter,
    object_ids: Option<Vec<ObjectId>>,
    next_frame: u32,
    labelled: Option<u32>,
}

impl TrialWriter {
    pub fn create(path: &Path) -> PhysgenResult<Self> {
        Ok(Self {
            archive: ArchiveWriter::create(path)?,
            object_ids: None,
            next_frame: 0,
            labelled: None,
        })
    }

    pub fn path(&self) -> &Path {
        self.archive.path()
    }

    /// Writes the static section. Only once per trial.
    pub fn write_static(&mut self, section: &StaticSection) -> PhysgenResult<()> {
        if self.object_ids.is_some() {
            return Err(PhysgenError::Writer(
                "static section already written".into(),
            ));
        }
        section.write_to(&mut self.archive)?;
        self.object_ids = Some(section.object_ids());
        Ok(())
    }

    /// Writes frame `frame` and returns the sleep hint.
    pub fn write_frame(&mut self, frame: u32, batch: &ResponseBatch) -> PhysgenResult<bool> {
        let Some(object_ids) = &self.object_ids else {
            return Err(PhysgenError::Writer(
                "frame written before the static section".into(),
            ));
        };
        if frame != self.next_frame {
            return Err(PhysgenError::Writer(format!(
                "expected frame {}, got {frame}",
                self.next_frame
            )));
        }

        let data = FrameData::extract(object_ids, batch);
        if !data.missing.is_empty() {
            tracing::warn!(
                frame,
                missing = ?data.missing,
                "Response lacks entries for some trial objects"
            );
        }
        data.write_to(
            &mut self.archive,
            frame,
            batch.contains(RecordKind::Rigidbodies),
        )?;
        self.next_frame += 1;
        Ok(sleep_hint(batch))
    }

    /// Writes the labels of the most recently written frame.
    pub fn write_labels(&mut self, frame: u32, labels: &FrameLabels) -> PhysgenResult<()> {
        if self.next_frame == 0 || frame != self.next_frame - 1 {
            return Err(PhysgenError::Writer(format!(
                "labels for frame {frame} must follow that frame"
            )));
        }
        if self.labelled == Some(frame) {
            return Err(PhysgenError::Writer(format!(
                "frame {frame} already has labels"
            )));
        }
        for (key, dataset) in labels.entries() {
            self.archive
                .write(&frame_path(frame, &format!("labels/{key}")), &dataset)?;
        }
        self.labelled = Some(frame);
        Ok(())
    }

    /// Number of objects in the static section (0 before it is written).
    pub fn object_count(&self) -> usize {
        self.object_ids.as_ref().map_or(0, Vec::len)
    }

    pub fn frames_written(&self) -> u32 {
        self.next_frame
    }

    /// Flushes and closes the archive.
    pub fn finish(self) -> PhysgenResult<PathBuf> {
        self.archive.finish()
    }
}
