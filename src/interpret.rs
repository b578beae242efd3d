use std::io;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use image::{DynamicImage, GrayImage};
use log::{debug, info};
use logging_timer::time;
use rayon::prelude::*;
use thiserror::Error;

use crate::{
    classify::ClassifyOptions,
    debug::{draw_scored_marks_mut, ImageDebugWriter},
    image_utils::binarize,
    marks::{score_marks, ScoredMarks},
    report::write_report,
    statistics::{AnswerKeyTable, ScoreError, Statistics},
    types::CoordinateMap,
};

pub const DEFAULT_IMAGE_EXTENSIONS: [&str; 2] = ["jpg", "png"];

#[derive(Debug, Clone)]
pub struct TallyOptions {
    pub coordinate_map: CoordinateMap,
    pub answer_keys: AnswerKeyTable,
    pub classify: ClassifyOptions,
    pub binarize_timeout: Option<Duration>,
    pub output_dir: PathBuf,
    pub debug: bool,
}

/// Everything produced for one scanned form.
#[derive(Debug, Clone)]
pub struct TalliedForm {
    pub image_path: PathBuf,
    pub scored_marks: ScoredMarks,
    pub statistics: Statistics,
    pub annotated_path: PathBuf,
    pub report_path: PathBuf,
}

pub type TallyFormResult = Result<TalliedForm, TallyFormError>;

#[derive(Debug, Error)]
pub enum TallyFormError {
    #[error("unable to open image {path}: {source}")]
    ImageOpen {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("binarizing {path} did not finish within {timeout:?}")]
    BinarizeTimeout { path: PathBuf, timeout: Duration },

    #[error("binarizing {0} stopped unexpectedly")]
    BinarizeFailed(PathBuf),

    #[error("unable to score {path}: {source}")]
    Score {
        path: PathBuf,
        #[source]
        source: ScoreError,
    },

    #[error("unable to save annotated image {path}: {source}")]
    SaveAnnotated {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("unable to write report {path}: {source}")]
    WriteReport {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum FindImagesError {
    #[error("directory of images {0} does not exist")]
    NotFound(PathBuf),

    #[error("unable to read directory of images {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no images with extensions {extensions:?} in the source directory {path}")]
    NoImages {
        path: PathBuf,
        extensions: Vec<String>,
    },

    #[error("unable to create output directory {path}: {source}")]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("output directory {0} is the directory of images; annotated copies would replace the scans")]
    OutputIsInput(PathBuf),
}

/// Lists the files directly inside `dir` whose extension matches one of
/// `extensions`, ignoring case, sorted by path.
#[time]
pub fn find_images(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, FindImagesError> {
    if !dir.is_dir() {
        return Err(FindImagesError::NotFound(dir.to_path_buf()));
    }

    let read_error = |source| FindImagesError::Read {
        path: dir.to_path_buf(),
        source,
    };

    let mut images = vec![];
    for entry in std::fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        let matches = path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| {
                    extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext))
                });
        if matches {
            images.push(path);
        }
    }

    if images.is_empty() {
        return Err(FindImagesError::NoImages {
            path: dir.to_path_buf(),
            extensions: extensions.to_vec(),
        });
    }

    images.sort();
    debug!("found {} images in {}", images.len(), dir.display());
    Ok(images)
}

/// Creates `output_dir`, refusing to use the directory the scans come from.
pub fn prepare_output_dir(output_dir: &Path, image_dir: &Path) -> Result<(), FindImagesError> {
    std::fs::create_dir_all(output_dir).map_err(|source| FindImagesError::CreateOutputDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let same_dir = match (output_dir.canonicalize(), image_dir.canonicalize()) {
        (Ok(output_dir), Ok(image_dir)) => output_dir == image_dir,
        _ => false,
    };
    if same_dir {
        return Err(FindImagesError::OutputIsInput(output_dir.to_path_buf()));
    }

    Ok(())
}

#[time]
pub fn load_form_image(image_path: &Path) -> Result<DynamicImage, TallyFormError> {
    image::open(image_path).map_err(|source| TallyFormError::ImageOpen {
        path: image_path.to_path_buf(),
        source,
    })
}

/// Runs `work` on a separate thread, giving up after `timeout`. The thread is
/// left to finish on its own when the timeout is hit. `Disconnected` means
/// `work` panicked.
pub fn run_with_timeout<T, F>(work: F, timeout: Duration) -> Result<T, mpsc::RecvTimeoutError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        // the receiver is gone if we already timed out
        let _ = sender.send(work());
    });
    receiver.recv_timeout(timeout)
}

/// Binarizes `img` on a separate thread, giving up after `timeout`.
pub fn binarize_with_timeout(
    img: Arc<DynamicImage>,
    timeout: Duration,
) -> Result<GrayImage, mpsc::RecvTimeoutError> {
    run_with_timeout(move || binarize(&img), timeout)
}

/// Paths of the annotated copy and the report for `image_path`.
pub fn output_paths(output_dir: &Path, image_path: &Path) -> (PathBuf, PathBuf) {
    let file_name = image_path.file_name().unwrap_or_default();
    let annotated_path = output_dir.join(file_name);
    let mut report_name = file_name.to_os_string();
    report_name.push(".txt");
    (annotated_path, output_dir.join(report_name))
}

/// Scores one scanned form and writes its annotated copy and report.
#[time]
pub fn tally_form(image_path: &Path, options: &TallyOptions) -> TallyFormResult {
    let img = Arc::new(load_form_image(image_path)?);

    let raster = match options.binarize_timeout {
        Some(timeout) => match binarize_with_timeout(Arc::clone(&img), timeout) {
            Ok(raster) => raster,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                return Err(TallyFormError::BinarizeTimeout {
                    path: image_path.to_path_buf(),
                    timeout,
                })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(TallyFormError::BinarizeFailed(image_path.to_path_buf()))
            }
        },
        None => binarize(&img),
    };

    let debug = if options.debug {
        ImageDebugWriter::new(options.output_dir.clone(), image_path.to_path_buf())
    } else {
        ImageDebugWriter::disabled()
    };
    debug.write_gray("binarized", &raster);

    let scored_marks = score_marks(
        &raster,
        &options.coordinate_map,
        &options.answer_keys,
        &options.classify,
    )
    .map_err(|source| TallyFormError::Score {
        path: image_path.to_path_buf(),
        source,
    })?;
    drop(raster);

    let statistics = Statistics::from_scored_marks(&options.answer_keys, &scored_marks);
    let (annotated_path, report_path) = output_paths(&options.output_dir, image_path);

    let mut annotated = img.to_rgb8();
    draw_scored_marks_mut(&mut annotated, &scored_marks, options.classify.radius);
    annotated
        .save(&annotated_path)
        .map_err(|source| TallyFormError::SaveAnnotated {
            path: annotated_path.clone(),
            source,
        })?;

    write_report(&report_path, &statistics).map_err(|source| TallyFormError::WriteReport {
        path: report_path.clone(),
        source,
    })?;

    info!(
        "{}: {} shaded of {} bubbles",
        image_path.display(),
        statistics.total(),
        scored_marks.len()
    );

    Ok(TalliedForm {
        image_path: image_path.to_path_buf(),
        scored_marks,
        statistics,
        annotated_path,
        report_path,
    })
}

/// Tallies every form independently and in parallel. Results are returned in
/// the order of `image_paths`.
#[time]
pub fn tally_forms(image_paths: &[PathBuf], options: &TallyOptions) -> Vec<TallyFormResult> {
    image_paths
        .par_iter()
        .map(|image_path| tally_form(image_path, options))
        .collect()
}
