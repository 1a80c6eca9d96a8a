mod cli;
mod client;
mod codec;
mod command;
mod error;
mod interpreter;
#[cfg(test)]
mod mock;
mod shell;
mod tags;

use cli::Cli;
use interpreter::Interpreter;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut interpreter = Interpreter::new(cli.connector());
    let mut stdout = std::io::stdout();
    let (address, command) = cli.address_and_command();

    let result = async {
        if let Some(address) = address {
            interpreter
                .run(&format!("IPAddress {address}"), &mut stdout)
                .await?;
        }
        if command.is_empty() {
            shell::run(&mut interpreter).await
        } else {
            interpreter.run(&command.join(" "), &mut stdout).await?;
            Ok::<_, anyhow::Error>(())
        }
    }
    .await;

    interpreter.shutdown().await;
    result
}
