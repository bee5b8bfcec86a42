//! Archive paths for the trial layout.

use physgen_archive::Archive;
use physgen_types::{zero_padding, PhysgenError, PhysgenResult};

pub const STATIC: &str = "static";
pub const FRAMES: &str = "frames";

/// `frames/NNNN`
pub fn frame_group(frame: u32) -> String {
    format!("{FRAMES}/{}", zero_padding(frame))
}

/// `frames/NNNN/<rel>`
pub fn frame_path(frame: u32, rel: &str) -> String {
    format!("{}/{rel}", frame_group(frame))
}

/// `static/<rel>`
pub fn static_path(rel: &str) -> String {
    format!("{STATIC}/{rel}")
}

/// Frame group names in lexicographic order.
pub fn frame_names(archive: &Archive) -> Vec<String> {
    archive.children(FRAMES)
}

/// Checks that frame names form `0000, 0001, ...` with no gaps and returns
/// the frame count.
pub fn check_contiguous_frames(archive: &Archive) -> PhysgenResult<usize> {
    let names = frame_names(archive);
    for (i, name) in names.iter().enumerate() {
        let expected = zero_padding(i as u32);
        if *name != expected {
            return Err(PhysgenError::Archive(format!(
                "frame {i} is named '{name}', expected '{expected}'"
            )));
        }
    }
    Ok(names.len())
}
