use color_eyre::eyre::{Result, WrapErr, bail};
use kvsrv::network::{DEFAULT_LISTEN_ADDR, ListenAddr};
use kvsrv::{HttpConfig, KvServer, KvServerTrait};

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// What the command line asked for
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Serve(ListenAddr),
    Help,
}

/// Accepts `--addr ADDR`, `-addr ADDR` and the `=` joined forms
fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Command> {
    let mut addr: ListenAddr = DEFAULT_LISTEN_ADDR.parse()?;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let value = match arg.as_str() {
            "-h" | "--help" | "-help" => return Ok(Command::Help),
            "--addr" | "-addr" => match args.next() {
                Some(value) => value,
                None => bail!("flag needs an argument: {arg}"),
            },
            other => match other
                .strip_prefix("--addr=")
                .or_else(|| other.strip_prefix("-addr="))
            {
                Some(value) => value.to_string(),
                None => bail!("unknown argument: {other}"),
            },
        };
        addr = value
            .parse()
            .wrap_err_with(|| format!("invalid value {value:?} for flag -addr"))?;
    }

    Ok(Command::Serve(addr))
}

fn print_usage(program: &str) {
    eprintln!("Usage: {program} [--addr ADDR]");
    eprintln!("  --addr ADDR  http service address (default \"{DEFAULT_LISTEN_ADDR}\")");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {program}                       # Listen on all interfaces, port 8080");
    eprintln!("  {program} --addr 127.0.0.1:9000 # Listen on loopback only");
    eprintln!("  {program} -addr :3000           # Listen on all interfaces, port 3000");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kvsrv=info")),
        )
        .init();

    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "kvsrv".to_string());

    let addr = match parse_args(args) {
        Ok(Command::Serve(addr)) => addr,
        Ok(Command::Help) => {
            print_usage(&program);
            return Ok(());
        }
        Err(e) => {
            eprintln!("{e:#}");
            print_usage(&program);
            std::process::exit(2);
        }
    };

    let config = HttpConfig::from(addr);
    info!(address = %config.bind_addr, max_connections = config.max_connections, "Starting key-value server");

    let server = KvServer::new(config);
    if let Err(e) = server.run().await {
        error!(error = %e, "Server failed");
        return Err(e).wrap_err("Failed to run key-value server");
    }

    Ok(())
}
