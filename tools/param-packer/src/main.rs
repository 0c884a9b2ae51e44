use payload_abi::{EntryParams, ExitStatus, ParamsError};
use std::{env, fs, io, process::ExitCode};

const USAGE: &str =
    "usage: param-packer <out-file> [--status N] [--marker TEXT] [--abort-without-console]";

#[derive(Debug, thiserror::Error)]
enum PackError {
    #[error("missing output file")]
    MissingOutput,
    #[error("{0} needs a value")]
    MissingValue(&'static str),
    #[error("invalid exit status {0:?}")]
    InvalidStatus(String),
    #[error("unknown argument {0:?}")]
    UnknownArgument(String),
    #[error(transparent)]
    Encode(#[from] ParamsError),
    #[error("cannot write parameter block: {0}")]
    Io(#[from] io::Error),
}

impl PackError {
    const fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::MissingOutput | Self::MissingValue(_) | Self::UnknownArgument(_)
        )
    }
}

struct Args {
    out: String,
    status: Option<i32>,
    marker: Option<String>,
    abort_without_console: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, PackError> {
    let out = args.next().ok_or(PackError::MissingOutput)?;
    let mut parsed = Args {
        out,
        status: None,
        marker: None,
        abort_without_console: false,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--status" => {
                let value = args.next().ok_or(PackError::MissingValue("--status"))?;
                let code = value
                    .parse()
                    .map_err(|_| PackError::InvalidStatus(value))?;
                parsed.status = Some(code);
            }
            "--marker" => {
                parsed.marker = Some(args.next().ok_or(PackError::MissingValue("--marker"))?);
            }
            "--abort-without-console" => parsed.abort_without_console = true,
            _ => return Err(PackError::UnknownArgument(arg)),
        }
    }

    Ok(parsed)
}

fn pack(args: &Args) -> Result<Vec<u8>, PackError> {
    let params = EntryParams {
        exit_status: args.status.map(ExitStatus::new),
        marker: args.marker.as_deref(),
        abort_without_console: args.abort_without_console,
    };

    let mut block = vec![0u8; params.encoded_len()];
    let len = params.encode_into(&mut block)?;
    block.truncate(len);
    Ok(block)
}

fn run() -> Result<(), PackError> {
    // args: <out-file> [options]
    let args = parse_args(env::args().skip(1))?;
    let block = pack(&args)?;
    fs::write(&args.out, &block)?;
    eprintln!("packed {} bytes into {}", block.len(), args.out);
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            if e.is_usage() {
                eprintln!("{USAGE}");
            }
            ExitCode::FAILURE
        }
    }
}
