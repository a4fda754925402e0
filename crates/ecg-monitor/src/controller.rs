//! Keyboard commands and the UI state they toggle

use crate::display::DisplayMode;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Commands accepted by the run loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Bypass or re-enable the smoother
    ToggleFilter,
    /// Switch between waveform and numeric view
    ToggleDisplayMode,
    /// End the session
    Quit,
}

/// Map a key to its command
pub fn parse_key(key: char) -> Option<Command> {
    match key.to_ascii_lowercase() {
        'f' => Some(Command::ToggleFilter),
        'd' => Some(Command::ToggleDisplayMode),
        'q' => Some(Command::Quit),
        _ => None,
    }
}

/// Display and filter toggles, changed only through [`Controller::handle`]
#[derive(Debug, Clone, PartialEq)]
pub struct Controller {
    filter_enabled: bool,
    display_mode: DisplayMode,
}

impl Controller {
    pub fn new(display_mode: DisplayMode) -> Self {
        Self {
            filter_enabled: true,
            display_mode,
        }
    }

    pub fn handle(&mut self, command: Command) {
        match command {
            Command::ToggleFilter => self.filter_enabled = !self.filter_enabled,
            Command::ToggleDisplayMode => self.display_mode = self.display_mode.toggled(),
            Command::Quit => {}
        }
        debug!(
            ?command,
            filter_enabled = self.filter_enabled,
            display_mode = ?self.display_mode,
            "command handled"
        );
    }

    pub fn filter_enabled(&self) -> bool {
        self.filter_enabled
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }
}

/// Forward key presses from `input` as commands until either side closes.
///
/// Terminals deliver input line by line, so every recognised character of
/// each line becomes a command.
pub fn spawn_key_reader<R>(input: R, commands: mpsc::Sender<Command>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(input).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            for command in line.chars().filter_map(parse_key) {
                if commands.send(command).await.is_err() {
                    return;
                }
            }
        }
        debug!("key input closed");
    })
}
