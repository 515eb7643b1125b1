use std::{path::PathBuf, time::Duration};

use structopt::StructOpt;
use thiserror::Error;

use tsoap_codegen as codegen;
use tsoap_wsdl as wsdl;

#[derive(Debug, Error)]
enum Error {
    #[error("Error generating code")]
    CodegenError(#[from] codegen::error::Error),

    #[error("Error")]
    IoError(#[from] std::io::Error),

    #[error("No operation could be generated ({0} failed)")]
    NothingGenerated(usize),
}

#[derive(StructOpt)]
struct Args {
    /// WSDL file path or URL
    input: String,

    #[structopt(short, long, default_value = "./generated", parse(from_os_str))]
    output: PathBuf,

    /// Timeout for fetching imported documents, in seconds
    #[structopt(long, default_value = "30")]
    timeout: u64,

    /// Module the generated files import their JSX runtime from
    #[structopt(long, default_value = codegen::DEFAULT_RUNTIME_MODULE)]
    runtime: String,

    /// Only generate the named operation (repeatable)
    #[structopt(short = "p", long = "operation")]
    operations: Vec<String>,

    #[structopt(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = format!("tsoap={0},tsoap_wsdl={0},tsoap_codegen={0}", level);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}

#[paw::main]
fn main(args: Args) -> Result<(), Error> {
    init_logging(args.verbose);

    let loader_options = wsdl::loader::LoaderOptions {
        timeout: Duration::from_secs(args.timeout),
    };

    let options = codegen::GeneratorOptions {
        runtime_module: args.runtime,
        operations: args.operations,
    };

    let generation = codegen::from_url(&args.input, &loader_options, &options)?;

    for failure in &generation.failures {
        log::warn!("{} was not generated: {}", failure.operation, failure.error);
    }

    if generation.files.is_empty() {
        return Err(Error::NothingGenerated(generation.failures.len()));
    }

    generation.write_to(&args.output)?;

    log::info!(
        "Generated {} of {} operations into {}",
        generation.files.len(),
        generation.files.len() + generation.failures.len(),
        args.output.display()
    );

    Ok(())
}
