//! Snapshot animation pipeline
//!
//! Turns the numbered snapshot files of a run into a looping animation:
//!
//! ```text
//! 0000_snapshot.dot ─ dot -Tpng -O ─▶ 0000_snapshot.dot.png ─ convert (label "1/N") ─┐
//! 0001_snapshot.dot ─ dot -Tpng -O ─▶ 0001_snapshot.dot.png ─ convert (label "2/N") ─┤
//! ...                                                                                ▼
//!                                                  convert -delay D ... snapshot.gif
//! ```
//!
//! The external tools are Graphviz `dot` and ImageMagick `convert`. Snapshot
//! files are never removed, whatever happens here.

use crate::error::{PipelineError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// File name of the assembled animation
pub const ANIMATION_FILE_NAME: &str = "snapshot.gif";

/// External tools and their parameters
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Delay per frame in hundredths of a second
    pub frame_delay: u32,

    /// Image format `dot` renders to
    pub format: String,

    /// Graphviz renderer
    pub dot_program: String,

    /// ImageMagick converter
    pub convert_program: String,

    /// Label font size
    pub point_size: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_delay: 20,
            format: "png".to_string(),
            dot_program: "dot".to_string(),
            convert_program: "convert".to_string(),
            point_size: 30,
        }
    }
}

impl PipelineConfig {
    /// Default tools with the given frame delay
    pub fn with_frame_delay(frame_delay: u32) -> Self {
        Self {
            frame_delay,
            ..Self::default()
        }
    }
}

/// Path `dot -O` writes for `source`
pub fn rendered_path(source: &Path, format: &str) -> PathBuf {
    let mut name = source.as_os_str().to_owned();
    name.push(".");
    name.push(format);
    PathBuf::from(name)
}

/// Arguments that render every snapshot in one `dot` invocation
pub fn render_args(snapshot_files: &[PathBuf], format: &str) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![format!("-T{}", format).into(), "-O".into()];
    args.extend(snapshot_files.iter().map(|p| p.as_os_str().to_owned()));
    args
}

/// Arguments that stamp `index/total` in the top left corner of a frame
pub fn label_args(
    frame: &Path,
    target: &Path,
    index: usize,
    total: usize,
    point_size: u32,
) -> Vec<OsString> {
    vec![
        "-gravity".into(),
        "northwest".into(),
        "-pointsize".into(),
        point_size.to_string().into(),
        "-splice".into(),
        "40x40".into(),
        "-annotate".into(),
        "+20+20".into(),
        format!("{}/{}", index, total).into(),
        frame.as_os_str().to_owned(),
        target.as_os_str().to_owned(),
    ]
}

/// Arguments that assemble the frames into a looping animation
pub fn assemble_args(frames: &[PathBuf], frame_delay: u32, animation: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-loop".into(), "0".into()];
    for frame in frames {
        args.push("-delay".into());
        args.push(frame_delay.to_string().into());
        args.push(frame.as_os_str().to_owned());
    }
    args.push(animation.as_os_str().to_owned());
    args
}

/// Render, label and assemble the snapshot files
///
/// Returns the animation path, or `None` when there was nothing to animate.
pub fn render_animation(
    snapshot_files: &[PathBuf],
    output_dir: &Path,
    config: &PipelineConfig,
) -> Result<Option<PathBuf>> {
    if snapshot_files.is_empty() {
        info!("No snapshots, nothing to animate");
        return Ok(None);
    }

    info!(count = snapshot_files.len(), "Rendering snapshots");
    run_tool(
        &config.dot_program,
        render_args(snapshot_files, &config.format),
    )?;

    let frames: Vec<PathBuf> = snapshot_files
        .iter()
        .map(|p| rendered_path(p, &config.format))
        .collect();

    let total = frames.len();
    for (index, frame) in frames.iter().enumerate() {
        label_frame(frame, index + 1, total, output_dir, config)?;
    }

    let animation = output_dir.join(ANIMATION_FILE_NAME);
    run_tool(
        &config.convert_program,
        assemble_args(&frames, config.frame_delay, &animation),
    )?;

    info!(path = %animation.display(), frames = total, "Animation written");
    Ok(Some(animation))
}

/// Label one frame in place, going through a temporary file
fn label_frame(
    frame: &Path,
    index: usize,
    total: usize,
    output_dir: &Path,
    config: &PipelineConfig,
) -> std::result::Result<(), PipelineError> {
    let suffix = format!(".{}", config.format);
    let labeled = tempfile::Builder::new()
        .prefix(".frame-")
        .suffix(&suffix)
        .tempfile_in(output_dir)
        .map_err(|source| PipelineError::Io {
            path: output_dir.to_path_buf(),
            source,
        })?;

    run_tool(
        &config.convert_program,
        label_args(frame, labeled.path(), index, total, config.point_size),
    )?;

    labeled.persist(frame).map_err(|e| PipelineError::Io {
        path: frame.to_path_buf(),
        source: e.error,
    })?;
    debug!(frame = %frame.display(), index, total, "Frame labeled");
    Ok(())
}

fn run_tool(program: &str, args: Vec<OsString>) -> std::result::Result<(), PipelineError> {
    debug!(program, args = args.len(), "Running post-processing tool");
    let output = Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| PipelineError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if output.status.success() {
        return Ok(());
    }

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    Err(PipelineError::Failed {
        program: program.to_string(),
        status: output.status.to_string(),
        output: combined.trim().to_string(),
    })
}
