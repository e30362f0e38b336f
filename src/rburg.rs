use std::ffi::OsString;
use std::io::Write;
use std::process;

use argh::FromArgs;
use log::debug;

#[derive(FromArgs)]
/// Generate a bottom-up tree matcher from a BURG specification
struct Args {
    /// dump the normalised rules instead of generating code
    #[argh(switch)]
    norm: bool,

    /// print version and exit
    #[argh(switch)]
    version: bool,

    /// specification file
    #[argh(positional)]
    spec: Option<OsString>,
}

fn main() {
    env_logger::init();
    let args: Args = argh::from_env();

    if args.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return;
    }

    let Some(path) = args.spec else {
        eprintln!("rburg: no specification file given (try --help)");
        process::exit(1);
    };

    let src = match std::fs::read_to_string(&path) {
        Ok(src) => src,
        Err(e) => {
            eprintln!("rburg: cannot read {}: {e}", path.to_string_lossy());
            process::exit(1);
        }
    };
    debug!("read {} bytes from {}", src.len(), path.to_string_lossy());

    let result = if args.norm {
        rustburg::normalised(&src).map(|rules| {
            rules
                .iter()
                .map(|r| format!("{r}\n"))
                .collect::<String>()
        })
    } else {
        rustburg::compile(&src)
    };

    match result {
        Ok(text) => {
            // partial output on a failed write is the caller's to discard
            if let Err(e) = std::io::stdout().write_all(text.as_bytes()) {
                eprintln!("rburg: {e}");
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("rburg: {e}");
            process::exit(1);
        }
    }
}
