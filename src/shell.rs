use anyhow::Context;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use crate::client::Connector;
use crate::interpreter::{Flow, Interpreter};

const PROMPT: &str = "mbtcp> ";

/// Interactive console: one command per line until `quit`, Ctrl-C or Ctrl-D.
pub async fn run<C: Connector>(interpreter: &mut Interpreter<C>) -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new().context("Failed to initialize readline")?;
    let mut stdout = std::io::stdout();

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                remember(&mut rl, line);
                if interpreter.run(line, &mut stdout).await? == Flow::Quit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                debug!("console closed");
                break;
            }
            Err(e) => return Err(e).context("Failed to read command"),
        }
    }
    Ok(())
}

fn remember(rl: &mut DefaultEditor, line: &str) {
    if let Err(e) = rl.add_history_entry(line) {
        debug!(error = %e, "could not add line to history");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustyline::history::History;

    #[test]
    fn test_remember_adds_history_entry() {
        let mut rl = DefaultEditor::new().unwrap();
        remember(&mut rl, "read 100I4");
        remember(&mut rl, "showtiming on");
        assert_eq!(rl.history().len(), 2);
    }
}
