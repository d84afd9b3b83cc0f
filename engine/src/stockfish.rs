use crate::uci::{parse_uci_message, UciError, UciMessage};
use crate::{Analysis, EngineCommand, EngineEvent};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::sync::mpsc;

/// A running UCI engine process.
pub struct StockfishEngine {
    process: Child,
    stdin: ChildStdin,
    event_rx: mpsc::Receiver<EngineEvent>,
}

/// Configuration for spawning an engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Executable to run. Common Stockfish locations are searched when unset.
    pub path: Option<PathBuf>,
    /// Value for the engine's `Contempt` option.
    pub contempt: Option<i32>,
    /// `Threads` option, clamped to 1..=16.
    pub threads: Option<u32>,
    /// `Hash` option in megabytes, clamped to 1..=2048.
    pub hash_mb: Option<u32>,
    /// How long to wait for `uciok`/`readyok` during startup.
    pub handshake_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: None,
            contempt: None,
            threads: None,
            hash_mb: None,
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

impl StockfishEngine {
    /// Spawn an engine process and complete the UCI handshake.
    #[tracing::instrument(level = "info")]
    pub async fn spawn_with_config(config: EngineConfig) -> Result<Self, UciError> {
        let path = match config.path.clone() {
            Some(path) => path,
            None => find_stockfish_path().ok_or(UciError::NotFound)?,
        };
        tracing::info!("Spawning engine at {:?}", path);

        let mut process = tokio::process::Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!("Failed to spawn engine: {}", e);
                UciError::Io(e)
            })?;

        let stdin = process.stdin.take().ok_or(UciError::NoStdin)?;
        let stdout = process.stdout.take().ok_or(UciError::NoStdout)?;

        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(64);

        tracing::debug!("Spawning output reader task");
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        tracing::warn!("Engine stdout EOF - engine closed");
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        tracing::trace!("UCI << {}", trimmed);

                        let event = match parse_uci_message(trimmed) {
                            Ok(UciMessage::UciOk) => EngineEvent::UciOk,
                            Ok(UciMessage::ReadyOk) => EngineEvent::ReadyOk,
                            Ok(UciMessage::BestMove { mv, .. }) => EngineEvent::BestMove(mv),
                            Ok(UciMessage::Info(info)) => EngineEvent::Info(info),
                            Ok(msg) => {
                                tracing::trace!("Ignoring UCI message: {:?}", msg);
                                continue;
                            }
                            Err(_) => {
                                tracing::trace!("Failed to parse UCI message: {}", trimmed);
                                continue;
                            }
                        };

                        if event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Error reading from engine stdout: {}", e);
                        break;
                    }
                }
            }
            tracing::debug!("Output reader task exiting");
        });

        let mut engine = Self {
            process,
            stdin,
            event_rx,
        };

        engine.write_line("uci").await?;
        engine
            .wait_for(config.handshake_timeout, "uciok", |e| {
                matches!(e, EngineEvent::UciOk)
            })
            .await?;

        if let Some(contempt) = config.contempt {
            engine.set_option("Contempt", Some(contempt.to_string())).await?;
        }
        if let Some(threads) = config.threads {
            engine
                .set_option("Threads", Some(threads.clamp(1, 16).to_string()))
                .await?;
        }
        if let Some(hash_mb) = config.hash_mb {
            engine
                .set_option("Hash", Some(hash_mb.clamp(1, 2048).to_string()))
                .await?;
        }

        engine.send_command(EngineCommand::IsReady).await?;
        engine
            .wait_for(config.handshake_timeout, "readyok", |e| {
                matches!(e, EngineEvent::ReadyOk)
            })
            .await?;

        tracing::info!("Engine spawned and initialized successfully");
        Ok(engine)
    }

    async fn set_option(&mut self, name: &str, value: Option<String>) -> Result<(), UciError> {
        self.send_command(EngineCommand::SetOption {
            name: name.to_string(),
            value,
        })
        .await
    }

    async fn write_line(&mut self, line: &str) -> Result<(), UciError> {
        tracing::trace!("UCI >> {}", line);
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Send a command to the engine
    pub async fn send_command(&mut self, cmd: EngineCommand) -> Result<(), UciError> {
        let line = match cmd {
            EngineCommand::SetPosition { fen } => format!("position fen {}", fen),
            EngineCommand::SetOption { name, value } => match value {
                Some(val) => format!("setoption name {} value {}", name, val),
                None => format!("setoption name {}", name),
            },
            EngineCommand::IsReady => "isready".to_string(),
            EngineCommand::Go { depth } => format!("go depth {}", depth),
            EngineCommand::Quit => "quit".to_string(),
        };
        self.write_line(&line).await
    }

    /// Receive an event from the engine. `None` once the engine has exited.
    pub async fn recv_event(&mut self) -> Option<EngineEvent> {
        self.event_rx.recv().await
    }

    async fn wait_for(
        &mut self,
        timeout: Duration,
        what: &'static str,
        done: impl Fn(&EngineEvent) -> bool,
    ) -> Result<(), UciError> {
        let wait = async {
            while let Some(event) = self.event_rx.recv().await {
                if done(&event) {
                    return Ok(());
                }
            }
            Err(UciError::Closed)
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| UciError::Timeout(what))?
    }

    /// Search `fen` to a fixed depth and return the final exact score.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn analyse(&mut self, fen: &str, depth: u8) -> Result<Analysis, UciError> {
        self.send_command(EngineCommand::SetPosition {
            fen: fen.to_string(),
        })
        .await?;
        self.send_command(EngineCommand::Go { depth }).await?;

        let mut analysis = Analysis {
            score: None,
            depth: None,
        };

        loop {
            match self.recv_event().await {
                Some(EngineEvent::Info(info)) => {
                    // Secondary lines of a multipv search do not describe the best move.
                    if info.multipv.is_some_and(|n| n > 1) {
                        continue;
                    }
                    if let (Some(score), false) = (info.score, info.bound) {
                        analysis.score = Some(score);
                        analysis.depth = info.depth.or(analysis.depth);
                    }
                }
                Some(EngineEvent::BestMove(mv)) => {
                    tracing::debug!(
                        best_move = ?mv.map(chess::format_uci_move),
                        score = ?analysis.score,
                        depth = ?analysis.depth,
                        "Search finished"
                    );
                    return Ok(analysis);
                }
                Some(_) => continue,
                None => return Err(UciError::Closed),
            }
        }
    }

    /// Shutdown the engine
    pub async fn shutdown(mut self) {
        let _ = self.send_command(EngineCommand::Quit).await;
        let _ = tokio::time::timeout(Duration::from_secs(1), self.process.wait()).await;
        let _ = self.process.kill().await;
    }
}

/// Find Stockfish executable in common locations
pub fn find_stockfish_path() -> Option<PathBuf> {
    let paths = [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
    ];

    if let Some(found) = paths.iter().map(Path::new).find(|p| p.exists()) {
        return Some(found.to_path_buf());
    }

    // Fall back to PATH lookup.
    std::process::Command::new("stockfish")
        .arg("quit")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .ok()
        .map(|_| PathBuf::from("stockfish"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_missing_binary_fails() {
        let config = EngineConfig {
            path: Some(PathBuf::from("/nonexistent/definitely-not-an-engine")),
            ..Default::default()
        };
        let result = StockfishEngine::spawn_with_config(config).await;
        assert!(matches!(result, Err(UciError::Io(_))));
    }

    #[tokio::test]
    async fn test_engine_that_exits_is_reported_closed() {
        // `true` exits immediately without speaking UCI.
        let config = EngineConfig {
            path: Some(PathBuf::from("true")),
            handshake_timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let result = StockfishEngine::spawn_with_config(config).await;
        assert!(result.is_err());
    }
}
