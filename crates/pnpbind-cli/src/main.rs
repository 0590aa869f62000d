use argh::FromArgs;
use std::path::PathBuf;
use std::process::ExitCode;

use pnpbind_cli::{Call, CliError};

#[derive(FromArgs, Debug)]
/// Estimate a camera pose from a solvePnP call described in JSON.
struct Args {
    /// path to the call description
    #[argh(option, short = 'i')]
    input: PathBuf,

    /// number of outputs to request
    #[argh(option, short = 'n', default = "2")]
    nargout: usize,

    /// pretty-print the outputs
    #[argh(switch, short = 'p')]
    pretty: bool,
}

fn run(args: &Args) -> Result<String, CliError> {
    let call = Call::from_file(&args.input)?;
    log::info!(
        "Running call with {} arguments from {}",
        call.args.len(),
        args.input.display()
    );

    let outputs = call.run(args.nargout)?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&outputs)?
    } else {
        serde_json::to_string(&outputs)?
    };
    Ok(json)
}

fn main() -> ExitCode {
    env_logger::init();
    let args: Args = argh::from_env();

    match run(&args) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {e}", e.identifier());
            ExitCode::FAILURE
        }
    }
}
