use chromakit::{config, output, server, tools};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chromakit")]
#[command(about = "Chroma-key background removal and everyday image tools")]
#[command(long_about = "\
Chroma-key background removal and everyday image tools

Turns a solid-color background (green screen by default) into transparency
with a soft alpha edge, and bundles the small tools that usually go with it:
PNG compression through pngquant, metadata inspection, resizing and format
conversion.

Each tool is available as a subcommand, and 'chromakit serve' exposes all of
them to a tool host as a JSON-RPC server on stdin/stdout.

Defaults for omitted options come from chromakit.toml in the working
directory (or --config). Run 'chromakit gen-config' to generate a documented
config file.

Set RUST_LOG to override the log filter, e.g. RUST_LOG=chromakit=debug.")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print the tool result as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replace a chroma-key background with transparency (writes PNG)
    Chromakey {
        input: PathBuf,
        output: PathBuf,
        /// Background color as #RRGGBB
        #[arg(long)]
        key_color: Option<String>,
        /// Radius of the fully transparent zone in RGB distance
        #[arg(long)]
        tolerance: Option<f64>,
    },
    /// Compress a PNG with pngquant (in place unless --output is given)
    Compress {
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Quality 1-100
        #[arg(long)]
        quality: Option<u32>,
    },
    /// Show format, size and transparency of an image
    Metadata { image: PathBuf },
    /// Resize by width, height or scale factor
    Resize {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        #[arg(long)]
        scale: Option<f64>,
        /// Stretch instead of keeping the aspect ratio when only one side is given
        #[arg(long)]
        stretch: bool,
        /// nearest, bilinear, bicubic or lanczos
        #[arg(long)]
        resample: Option<String>,
    },
    /// Convert to the format named by the output extension
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// JPEG quality 1-100
        #[arg(long)]
        quality: Option<u32>,
    },
    /// Serve the tools as JSON-RPC over stdin/stdout
    Serve,
    /// Print a stock chromakit.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let tools_config = config::load_config(&cli.config)?;
    init_thread_pool(&tools_config.processing);
    let service = tools::ToolService::new(tools_config);

    match cli.command {
        Command::Chromakey {
            input,
            output,
            key_color,
            tolerance,
        } => {
            let result = service.chromakey_to_transparent(tools::ChromaKeyArgs {
                input_path: input.clone(),
                output_path: output,
                key_color,
                tolerance,
            })?;
            emit(cli.json, &result, || {
                output::print_chromakey_output(&input, &result)
            })?;
        }
        Command::Compress {
            input,
            output,
            quality,
        } => {
            let result = service.compress_png(tools::CompressArgs {
                input_path: input.clone(),
                output_path: output,
                quality,
            })?;
            emit(cli.json, &result, || {
                output::print_compress_output(&input, &result)
            })?;
        }
        Command::Metadata { image } => {
            let result = service.get_image_metadata(tools::MetadataArgs { image_path: image })?;
            emit(cli.json, &result, || output::print_metadata_output(&result))?;
        }
        Command::Resize {
            input,
            output,
            width,
            height,
            scale,
            stretch,
            resample,
        } => {
            let result = service.resize_image(tools::ResizeArgs {
                input_path: input.clone(),
                output_path: output,
                width,
                height,
                scale,
                maintain_aspect: Some(!stretch),
                resample,
            })?;
            emit(cli.json, &result, || {
                output::print_resize_output(&input, &result)
            })?;
        }
        Command::Convert {
            input,
            output,
            quality,
        } => {
            let result = service.convert_format(tools::ConvertArgs {
                input_path: input.clone(),
                output_path: output,
                quality,
            })?;
            emit(cli.json, &result, || {
                output::print_convert_output(&input, &result)
            })?;
        }
        Command::Serve => {
            let stdin = std::io::stdin();
            server::Server::new(service).run(stdin.lock(), std::io::stdout().lock())?;
        }
        Command::GenConfig => unreachable!("handled before config load"),
    }

    Ok(())
}

/// Print a result as pretty JSON or through its text formatter.
fn emit<T: Serialize>(
    json: bool,
    result: &T,
    print_text: impl FnOnce(),
) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print_text();
    }
    Ok(())
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
