use clap::{Parser, Subcommand};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::path::{Path, PathBuf};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use labelmark::{
    Align, Config, FontBook, LabelParams, Scalar, label_params,
    process::{ImageInfo, apply, parse_hex_color, parse_process},
    watermark,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stamp a text label into a box on the image
    Label {
        input: PathBuf,
        output: PathBuf,

        #[arg(short, long)]
        text: String,

        /// Font descriptor such as "sans 24"; defaults to the config
        #[arg(short, long)]
        font: Option<String>,

        /// Box width: pixels, or a fraction such as "50%" or "0.5r"
        #[arg(long, default_value = "100%")]
        width: Scalar,

        /// Box height: pixels, or a fraction such as "10%" or "0.1r"
        #[arg(long, default_value = "10%")]
        height: Scalar,

        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        x: Scalar,

        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        y: Scalar,

        /// left, centre or right
        #[arg(long, default_value = "left", value_parser = parse_align)]
        align: Align,

        #[arg(long)]
        opacity: Option<f32>,

        /// Text colour as RRGGBB
        #[arg(long)]
        color: Option<String>,
    },

    /// Tile a rotated text watermark across the image
    Watermark {
        input: PathBuf,
        output: PathBuf,

        #[arg(short, long)]
        text: String,

        /// Font size in points
        #[arg(short, long)]
        size: Option<i32>,

        /// Clockwise rotation in degrees
        #[arg(short, long, allow_hyphen_values = true)]
        rotate: Option<f64>,

        #[arg(long)]
        opacity: Option<f32>,

        #[arg(long)]
        margin: Option<i32>,

        /// Text colour as RRGGBB
        #[arg(long)]
        color: Option<String>,

        /// Stamp once in the top-left corner instead of tiling
        #[arg(long)]
        no_replicate: bool,
    },

    /// Run an OSS-style process string, e.g. "image/resize,w_800/watermark,text_SGk,t_50"
    Process {
        input: PathBuf,
        process: String,
        /// Where to write the result; not needed for "image/info"
        output: Option<PathBuf>,
    },
}

fn parse_align(s: &str) -> Result<Align, String> {
    match s.to_lowercase().as_str() {
        "left" => Ok(Align::Left),
        "centre" | "center" => Ok(Align::Centre),
        "right" => Ok(Align::Right),
        other => Err(format!("unknown alignment {other:?}")),
    }
}

fn parse_color(s: &str) -> Result<[f64; 3], Box<dyn std::error::Error>> {
    let [r, g, b] = parse_hex_color(s.trim_start_matches('#'))?;
    Ok([f64::from(r), f64::from(g), f64::from(b)])
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::load(&cli.config)?;
    let fonts = FontBook::from_config(&config.fonts);
    info!("Font book has {} font files", fonts.len());

    match cli.command {
        Commands::Label {
            input,
            output,
            text,
            font,
            width,
            height,
            x,
            y,
            align,
            opacity,
            color,
        } => {
            let image = open(&input)?;
            let params = LabelParams {
                text,
                font: font.unwrap_or(config.label.font.clone()),
                width,
                height,
                offset_x: x,
                offset_y: y,
                align,
                opacity: opacity.unwrap_or(config.label.opacity),
                color: match color {
                    Some(c) => parse_color(&c)?,
                    None => config.label.color,
                },
            };
            let labelled = label_params(&fonts, &image, &params)?;
            save(&labelled, &output, None)?;
        }
        Commands::Watermark {
            input,
            output,
            text,
            size,
            rotate,
            opacity,
            margin,
            color,
            no_replicate,
        } => {
            let image = open(&input)?;
            let mut options = config.watermark.options(text);
            if let Some(size) = size {
                options.font = format!("{} {}", config.watermark.family, size);
            }
            if let Some(rotate) = rotate {
                options.rotate = rotate;
            }
            if let Some(opacity) = opacity {
                options.opacity = opacity;
            }
            if let Some(margin) = margin {
                options.margin = margin;
            }
            if let Some(color) = color {
                options.background = parse_color(&color)?;
            }
            options.no_replicate = no_replicate;

            let marked = watermark(&fonts, &image, &options)?;
            save(&marked, &output, None)?;
        }
        Commands::Process {
            input,
            process,
            output,
        } => {
            let parsed = parse_process(&process, &config.watermark)?;
            let reader = ImageReader::open(&input)?.with_guessed_format()?;
            let input_format = reader.format();
            let image = reader.decode()?;

            if parsed.info {
                let size = std::fs::metadata(&input)?.len();
                let info = ImageInfo::new(size, input_format, &image);
                println!("{}", serde_json::to_string(&info)?);
                return Ok(());
            }

            let output = output.ok_or("an output path is required unless the process is info")?;
            let processed = apply(&fonts, &image, &parsed.operations)?;
            save(&processed, &output, parsed.format.or(input_format))?;
        }
    }

    Ok(())
}

fn open(path: &Path) -> Result<DynamicImage, Box<dyn std::error::Error>> {
    let image = image::open(path)?;
    info!(
        "Loaded {:?} ({}x{}, {:?})",
        path,
        image.width(),
        image.height(),
        image.color()
    );
    Ok(image)
}

/// Write `image` as `format`, or as the format the extension names.
/// JPEG has no alpha channel, so RGBA results are flattened to RGB first.
fn save(
    image: &DynamicImage,
    path: &Path,
    format: Option<ImageFormat>,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = match format {
        Some(format) => format,
        None => ImageFormat::from_path(path)?,
    };
    if format == ImageFormat::Jpeg && image.color().has_alpha() {
        DynamicImage::ImageRgb8(image.to_rgb8()).save_with_format(path, format)?;
    } else {
        image.save_with_format(path, format)?;
    }
    info!("Wrote {:?} as {:?}", path, format);
    Ok(())
}
