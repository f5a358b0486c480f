use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use rpk_cli::{load_configs, read_input, write_output, Session};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn file_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("input")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("File to read"),
        )
        .arg(
            Arg::new("output")
                .value_parser(value_parser!(PathBuf))
                .help("File to write"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Scramble pattern config (TOML)"),
        )
        .arg(
            Arg::new("pipeline")
                .long("pipeline")
                .value_parser(value_parser!(PathBuf))
                .help("Pipeline config (TOML)"),
        )
}

fn cli() -> Command {
    Command::new("rpk")
        .version(rpk_component::VERSION)
        .about("Unpack, modify and repack scrambled flash dumps")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(file_args(
            Command::new("descramble").about("Decode a scrambled dump into its logical data"),
        ))
        .subcommand(file_args(
            Command::new("scramble").about("Encode logical data into a scrambled dump"),
        ))
        .subcommand(
            file_args(
                Command::new("roundtrip")
                    .about("Unpack and repack a dump, checking the result is byte-identical"),
            )
            .arg(
                Arg::new("allow-changes")
                    .long("allow-changes")
                    .action(ArgAction::SetTrue)
                    .help("Exit successfully even if the repacked dump differs"),
            ),
        )
}

fn session(args: &ArgMatches) -> Result<Session> {
    let config = args.get_one::<PathBuf>("config").map(PathBuf::as_path);
    let pipeline = args.get_one::<PathBuf>("pipeline").map(PathBuf::as_path);
    let config = config.ok_or_else(|| anyhow::anyhow!("--config is required"))?;
    let (scramble, pipeline) = load_configs(config, pipeline)?;
    Session::new(&scramble, pipeline)
}

fn input(args: &ArgMatches) -> Result<Vec<u8>> {
    let path = args
        .get_one::<PathBuf>("input")
        .ok_or_else(|| anyhow::anyhow!("input file is required"))?;
    read_input(path)
}

fn emit(args: &ArgMatches, data: &[u8]) -> Result<()> {
    match args.get_one::<PathBuf>("output") {
        Some(path) => {
            write_output(path, data)?;
            tracing::info!("Wrote {} bytes to {}", data.len(), path.display());
        }
        None => println!("{} bytes (no output file given)", data.len()),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RPK_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("descramble", args)) => {
            let logical = session(args)?.descramble(input(args)?).await?;
            emit(args, &logical)?;
        }
        Some(("scramble", args)) => {
            let packed = session(args)?.scramble(input(args)?).await?;
            emit(args, &packed)?;
        }
        Some(("roundtrip", args)) => {
            let trip = session(args)?.roundtrip(input(args)?).await?;
            emit(args, &trip.output)?;

            println!("before: {}", trip.before);
            println!("after:  {}", trip.after);
            if trip.is_identical() {
                println!("Round trip: IDENTICAL");
            } else {
                println!("Round trip: CHANGED");
                if !args.get_flag("allow-changes") {
                    std::process::exit(1);
                }
            }
        }
        _ => {}
    }
    Ok(())
}
