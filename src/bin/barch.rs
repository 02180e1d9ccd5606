use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

use barch::catalog::{Catalog, CatalogConfig, EntryStatus};
use barch::codec::RowIndex;
use barch::file::read_all;
use barch::format::Container;
use barch::jobs::{Job, JobKind};
use barch::utils::log::{init_logger, level_from_verbosity};
use barch::Result;

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert 8-bit grayscale BMP images to and from BARCH", long_about = None)]
struct Args {
    /// More log output (repeat for more).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compress an 8-bit grayscale BMP into a BARCH file.
    #[command(alias = "e")]
    Encode {
        input: PathBuf,

        /// Output path [default: <input>.packed.barch]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decompress a BARCH file into an 8-bit grayscale BMP.
    #[command(alias = "d")]
    Decode {
        input: PathBuf,

        /// Output path [default: <input>.unpacked.bmp]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the BMP, PNG and BARCH files of a directory.
    #[command(alias = "ls")]
    List {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Convert every BMP and BARCH file of a directory in the background.
    Process {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Print the header of a BARCH file.
    Inspect { input: PathBuf },
}

fn convert(kind: JobKind, input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let job = match output {
        Some(output) => Job::new(kind, input, output),
        None => Job::with_default_output(kind, input),
    };
    let out = job.run()?;
    println!("{}", out.display());
    Ok(())
}

fn list(dir: PathBuf) -> Result<()> {
    let catalog = Catalog::open(dir, CatalogConfig::default())?;
    for entry in catalog.entries() {
        println!("{:>10}  {:<6} {}", entry.pretty_size(), entry.ext, entry.name);
    }
    Ok(())
}

fn process(dir: PathBuf) -> Result<bool> {
    let mut catalog = Catalog::open(dir, CatalogConfig::default())?;
    let rows: Vec<usize> = catalog
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, e)| JobKind::for_extension(&e.ext).is_some())
        .map(|(row, _)| row)
        .collect();
    for row in &rows {
        catalog.process(*row)?;
    }
    info!("started {} jobs", catalog.in_flight());
    catalog.wait_all();

    let mut ok = true;
    for row in rows {
        let entry = &catalog.entries()[row];
        match &entry.status {
            EntryStatus::Failed(msg) => {
                ok = false;
                println!("{:<8} {}: {}", entry.status.text(), entry.name, msg);
            }
            status => println!("{:<8} {}", status.text(), entry.name),
        }
    }
    if catalog.has_error() {
        error!("{}", catalog.error_text());
    }
    Ok(ok)
}

fn inspect(input: PathBuf) -> Result<()> {
    let bytes = read_all(&input)?;
    let c = Container::parse(&bytes)?;
    let h = c.header;
    println!("version:    {}", h.version);
    println!("dimensions: {}x{}", h.width, h.height);
    println!("row index:  {} bytes", h.row_index_len);
    println!("bitstream:  {} bytes", h.bitstream_len);
    let index = RowIndex::from_bytes(c.row_index, h.height)?;
    println!("empty rows: {}", index.empty_row_count());
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logger(level_from_verbosity(args.verbose, args.quiet));

    let result = match args.command {
        Commands::Encode { input, output } => convert(JobKind::Encode, input, output).map(|_| true),
        Commands::Decode { input, output } => convert(JobKind::Decode, input, output).map(|_| true),
        Commands::List { dir } => list(dir).map(|_| true),
        Commands::Process { dir } => process(dir),
        Commands::Inspect { input } => inspect(input).map(|_| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
