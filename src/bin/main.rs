use anyhow::{Context, Error};
use rollcall::{
    endpoints, logging, Driver, DriverOutcome, Overrides, Poller, Settings,
};
use std::path::PathBuf;
use structopt::StructOpt;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::from_args();

    let settings = Settings::load(args.config.as_deref(), args.overrides())
        .context("Unable to load the configuration")?;
    logging::init(settings.log_file.as_deref())?;

    log::debug!("Starting application with {:#?}", settings);

    // one session for everything, its cookie jar carries the login
    let session = settings.session()?;

    match args.cmd {
        Some(Command::Lookup { rollcall_id }) => {
            endpoints::login(&session, &settings.username, &settings.password)
                .await
                .context("Login failed")?;

            match Poller::new(&session).lookup(rollcall_id).await? {
                Some(code) => log::info!("Number code: {}", code),
                None => {
                    log::warn!("Roll-call {} has no number code", rollcall_id)
                },
            }
        },
        None => {
            let driver = Driver::from_settings(&settings);
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::error!("Unable to listen for Ctrl-C: {}", e);
                    futures::future::pending::<()>().await;
                }
                log::info!("Shutting down");
            };

            let outcome = driver
                .run(
                    &session,
                    &settings.username,
                    &settings.password,
                    shutdown,
                    |_| {},
                )
                .await
                .context("Login failed")?;

            log::debug!("Finished with {:?}", outcome);
            if let DriverOutcome::Completed(codes) = outcome {
                let found = codes.values().filter(|c| c.is_some()).count();
                log::info!("Resolved {} of {} roll-calls", found, codes.len());
            }
        },
    }

    Ok(())
}

#[derive(Debug, StructOpt)]
struct Args {
    #[structopt(
        short = "c",
        long = "config",
        parse(from_os_str),
        help = "The config file (defaults to config.yaml, config.toml, etc. in the current directory)"
    )]
    config: Option<PathBuf>,
    #[structopt(short = "u", long = "username", help = "Your username")]
    username: Option<String>,
    #[structopt(short = "p", long = "password", help = "Your password")]
    password: Option<String>,
    #[structopt(
        long = "continuous",
        help = "Keep polling after the first batch of codes"
    )]
    continuous: bool,
    #[structopt(subcommand)]
    cmd: Option<Command>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            username: self.username.clone(),
            password: self.password.clone(),
            continuous: if self.continuous { Some(true) } else { None },
        }
    }
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Look up the number code for a single roll-call.
    Lookup {
        #[structopt(help = "The roll-call's ID")]
        rollcall_id: u64,
    },
}
