//! picocontainer - micro frontend host
//!
//! Loads one application over HTTP into a detached container and prints the
//! rendered container.

use picocontainer::renderer::Node;
use picocontainer::{AppOptions, AppParams, ContainerConfig, ContainerEngine, NAME, VERSION};
use std::env;
use std::process::ExitCode;

const USAGE: &str = "usage: picocontainer [--no-sandbox] [--no-scoped-css] [--tag <name>] <app-name> <url>";

struct CliArgs {
    config: ContainerConfig,
    name: String,
    url: String,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs, String> {
    let mut options = AppOptions::default();
    let mut config = ContainerConfig::new();
    let mut positional = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--no-sandbox" => options.use_sandbox = false,
            "--no-scoped-css" => options.scoped_css = false,
            "--tag" => {
                let tag = args.next().ok_or("--tag needs a value")?;
                config = config.with_tag_name(tag);
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            flag if flag.starts_with("--") => return Err(format!("unknown flag {flag}\n{USAGE}")),
            _ => positional.push(arg),
        }
    }

    let [name, url]: [String; 2] = positional.try_into().map_err(|_| USAGE.to_string())?;
    Ok(CliArgs {
        config: config.with_defaults(options),
        name,
        url,
    })
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = match parse_args(env::args().skip(1)) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, run(cli))
}

async fn run(cli: CliArgs) -> ExitCode {
    log::info!("{NAME} v{VERSION}");
    picocontainer::start(&cli.config);

    let engine = match ContainerEngine::new(cli.config.clone()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("failed to create engine: {e}");
            return ExitCode::FAILURE;
        }
    };

    let container = Node::element(cli.config.tag_name())
        .with_attribute("name", &cli.name)
        .into_ref();
    let app = engine
        .start_app(AppParams::new(cli.name.as_str(), cli.url.as_str()).with_container(container.clone()))
        .await;

    let status = app.borrow().status();
    println!("{}", container.borrow().to_html());
    println!("{}: {status}", cli.name);
    if status == picocontainer::AppStatus::Mounted {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
