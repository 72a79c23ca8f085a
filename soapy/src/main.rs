use std::{fs::File, io::BufReader, path::PathBuf, time::Duration};

use structopt::StructOpt;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use soapy_util as util;
use soapy_wsdl as wsdl;

mod json;

#[derive(Debug, Error)]
enum Error {
    #[error("Error locating services")]
    LocateError(#[from] wsdl::error::Error),

    #[error("Error converting document")]
    ConvertError(#[from] util::error::Error),

    #[error("Error building HTTP client")]
    ClientError(#[from] reqwest::Error),

    #[error("Error reading JSON input")]
    JsonError(#[from] serde_json::Error),

    #[error("JSON input must be an object keyed by the root tag")]
    NotAnObject,

    #[error("Error")]
    IoError(#[from] std::io::Error),
}

#[derive(StructOpt)]
struct Args {
    /// Increase logging verbosity (repeatable)
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Print the address location of every service port in a WSDL document
    Locate {
        /// Give up on the WSDL request after this many seconds
        #[structopt(long)]
        timeout: Option<u64>,

        wsdl_url: String,
    },

    /// Convert an XML document to JSON
    Decode {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
    },

    /// Convert a JSON document to XML
    Encode {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "soapy=info,soapy_wsdl=debug,soapy_util=info",
        2 => "soapy=debug,soapy_wsdl=trace,soapy_util=debug",
        _ => "trace",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn locate(wsdl_url: &str, timeout: Option<u64>) -> Result<(), Error> {
    let mut builder = wsdl::client_builder();
    if let Some(seconds) = timeout {
        builder = builder.timeout(Duration::from_secs(seconds));
    }

    let client = builder.build()?;

    let locations = wsdl::ServiceLocator::with_transport(client).get_service_locations(wsdl_url)?;

    for (service, port, location) in locations.entries() {
        println!("{}\t{}\t{}", service, port, location);
    }

    Ok(())
}

fn decode(input: PathBuf) -> Result<(), Error> {
    debug!(input = %input.display(), "decoding XML");

    let element = util::Element::from_reader(BufReader::new(File::open(input)?))?;
    let value = util::element_to_value(&element)?;

    println!("{}", serde_json::to_string_pretty(&json::to_json(&value))?);
    Ok(())
}

fn encode(input: PathBuf) -> Result<(), Error> {
    debug!(input = %input.display(), "encoding JSON");

    let document: serde_json::Value = serde_json::from_reader(BufReader::new(File::open(input)?))?;

    let document = match json::from_json(&document) {
        util::Value::Object(document) => document,
        _ => return Err(Error::NotAnObject),
    };

    println!("{}", util::document_to_element(&document).to_xml()?);
    Ok(())
}

#[paw::main]
fn main(args: Args) -> Result<(), Error> {
    init_logging(args.verbose);

    match args.command {
        Command::Locate { timeout, wsdl_url } => locate(&wsdl_url, timeout),
        Command::Decode { input } => decode(input),
        Command::Encode { input } => encode(input),
    }
}
