extern crate log;
extern crate pretty_env_logger;

use std::env;
use std::path::{Path, PathBuf};
use std::process::exit;
use std::time::Duration;

use clap::{arg, command, value_parser, ArgAction, ArgMatches, Command};
use log::{error, info, LevelFilter};

use bubble_tally::classify::BoundsPolicy;
use bubble_tally::coordinates::load_coordinate_map;
use bubble_tally::form::{load_form_definition, FormDefinition};
use bubble_tally::interpret::{
    find_images, prepare_output_dir, tally_forms, TallyOptions, DEFAULT_IMAGE_EXTENSIONS,
};
use bubble_tally::report::format_report;

fn main() {
    let matches = cli().get_matches();
    init_logger(matches.get_flag("verbose"));

    let options = match tally_options(&matches) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Error: {}", message);
            exit(1);
        }
    };

    let image_dir = matches
        .get_one::<PathBuf>("image_dir")
        .expect("image directory is required");
    let extensions = matches
        .get_many::<String>("ext")
        .expect("extensions have a default")
        .cloned()
        .collect::<Vec<_>>();

    let image_paths = match find_images(image_dir, &extensions) {
        Ok(image_paths) => image_paths,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(1);
        }
    };

    if let Err(e) = prepare_output_dir(&options.output_dir, image_dir) {
        eprintln!("Error: {}", e);
        exit(1);
    }

    info!(
        "tallying {} forms into {}",
        image_paths.len(),
        options.output_dir.display()
    );

    let mut failures = 0;
    for result in tally_forms(&image_paths, &options) {
        match result {
            Ok(tallied) => {
                println!("{}:", tallied.image_path.display());
                for line in format_report(&tallied.statistics).lines() {
                    println!("  {}", line);
                }
            }
            Err(e) => {
                error!("{}", e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        eprintln!("Error: {} of {} forms failed", failures, image_paths.len());
        exit(1);
    }
}

fn init_logger(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    match env::var("LOG") {
        Ok(filters) => {
            builder.parse_filters(&filters);
        }
        Err(_) => {
            builder.filter_level(if verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            });
        }
    }
    builder.init();
}

/// Builds everything a run needs before the first image is touched, so a
/// missing coordinates file or a malformed form definition stops the run.
fn tally_options(matches: &ArgMatches) -> Result<TallyOptions, String> {
    let delimiter = parse_delimiter(
        matches
            .get_one::<String>("delimiter")
            .expect("delimiter has a default"),
    )?;

    let form = match matches.get_one::<PathBuf>("form") {
        Some(path) => load_form_definition(path).map_err(|e| e.to_string())?,
        None => FormDefinition::default(),
    };
    if let Some(title) = &form.title {
        info!("form: {}", title);
    }

    let bounds_policy = if matches.get_flag("strict_bounds") {
        BoundsPolicy::Fail
    } else {
        BoundsPolicy::Clip
    };
    let classify = form
        .classify_options(matches.get_one::<u32>("radius").copied(), bounds_policy)
        .map_err(|e| e.to_string())?;
    let answer_keys = form.answer_keys().map_err(|e| e.to_string())?;

    let coords_path = matches
        .get_one::<PathBuf>("coords")
        .expect("coordinates path is required");
    let coordinate_map =
        load_coordinate_map(Path::new(coords_path), delimiter).map_err(|e| e.to_string())?;
    answer_keys
        .validate(&coordinate_map)
        .map_err(|e| format!("{}: {}", coords_path.display(), e))?;

    Ok(TallyOptions {
        coordinate_map,
        answer_keys,
        classify,
        binarize_timeout: matches
            .get_one::<u64>("timeout")
            .map(|seconds| Duration::from_secs(*seconds)),
        output_dir: matches
            .get_one::<PathBuf>("output")
            .expect("output directory has a default")
            .clone(),
        debug: matches.get_flag("debug"),
    })
}

/// Accepts a single character, or `\t` spelled out.
fn parse_delimiter(value: &str) -> Result<char, String> {
    if value == "\\t" {
        return Ok('\t');
    }

    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(delimiter), None) => Ok(delimiter),
        _ => Err(format!(
            "delimiter must be a single character, got {:?}",
            value
        )),
    }
}

#[allow(clippy::cognitive_complexity)]
fn cli() -> Command {
    command!()
        .arg(
            arg!(-c --coords <PATH> "Path to the bubble coordinates file")
                .value_parser(value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            arg!(--delimiter <CHAR> "Separator between coordinates in the coordinates file")
                .default_value(" "),
        )
        .arg(
            arg!(-r --radius <PIXELS> "Half the side of the square scored around each bubble [default: 8]")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            arg!(--ext <EXT> "Image file extensions to process")
                .action(ArgAction::Append)
                .value_delimiter(',')
                .default_values(DEFAULT_IMAGE_EXTENSIONS),
        )
        .arg(
            arg!(-o --output <DIR> "Directory for annotated images and reports")
                .value_parser(value_parser!(PathBuf))
                .default_value("output"),
        )
        .arg(
            arg!(-f --form <PATH> "Path to a form definition JSON file")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--strict_bounds "Fail forms whose bubbles reach past the image edge")
                .long("strict-bounds"),
        )
        .arg(
            arg!(--timeout <SECONDS> "Give up binarizing an image after this many seconds")
                .value_parser(value_parser!(u64)),
        )
        .arg(arg!(-d --debug "Write intermediate images next to the outputs"))
        .arg(arg!(-v --verbose "Log at debug level when LOG is not set"))
        .arg(
            arg!(image_dir: <IMAGE_DIR> "Directory of scanned forms")
                .value_parser(value_parser!(PathBuf))
                .required(true),
        )
}
