//! Static evaluation of repertoire positions.
//!
//! The engine is consulted through [`PositionEvaluator`], a single
//! request/response call, so everything else in the crate stays pure.
//! Terminal positions (mate, stalemate) are decided locally and never reach
//! the engine.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use chess::PieceColor;
use engine::{EngineConfig, Score, StockfishEngine, UciError};

use crate::evaluation::Evaluation;
use crate::notation::DraftNode;

/// One evaluation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalRequest {
    pub fen: String,
    pub depth: u8,
    pub contempt: Option<i32>,
}

/// What the engine (or the terminal check) says about a position. Scores
/// are from White's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreDescriptor {
    Stalemate,
    Checkmated { winner: PieceColor },
    Centipawns(i32),
    /// Moves to mate, negative when Black mates.
    Mate(i32),
}

impl From<ScoreDescriptor> for Evaluation {
    fn from(score: ScoreDescriptor) -> Self {
        match score {
            ScoreDescriptor::Stalemate => Evaluation::Stalemate,
            ScoreDescriptor::Checkmated {
                winner: PieceColor::White,
            } => Evaluation::MateForWhite(0),
            ScoreDescriptor::Checkmated {
                winner: PieceColor::Black,
            } => Evaluation::MateForBlack(0),
            ScoreDescriptor::Centipawns(cp) => Evaluation::from_centipawns(cp),
            ScoreDescriptor::Mate(n) if n >= 0 => Evaluation::MateForWhite(n.unsigned_abs()),
            ScoreDescriptor::Mate(n) => Evaluation::MateForBlack(n.unsigned_abs()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("Engine error: {0}")]
    Engine(#[from] UciError),
    #[error("Engine did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Engine finished without a score for {0}")]
    NoScore(String),
    #[error("Invalid position {0}")]
    InvalidPosition(String),
}

/// Anything that can score a position.
pub trait PositionEvaluator: Send {
    fn evaluate(
        &mut self,
        request: &EvalRequest,
    ) -> impl Future<Output = Result<ScoreDescriptor, EvalError>> + Send;
}

/// Mate or stalemate when the side to move has no legal move.
pub fn terminal_score(fen: &str) -> Result<Option<ScoreDescriptor>, EvalError> {
    let board = chess::parse_fen(fen).map_err(|_| EvalError::InvalidPosition(fen.to_string()))?;
    if !chess::legal_moves(&board).is_empty() {
        return Ok(None);
    }
    if board.checkers().is_empty() {
        Ok(Some(ScoreDescriptor::Stalemate))
    } else {
        let loser = PieceColor::from(board.side_to_move());
        Ok(Some(ScoreDescriptor::Checkmated {
            winner: loser.opposite(),
        }))
    }
}

/// Settings for [`UciEvaluator`].
#[derive(Debug, Clone)]
pub struct UciEvaluatorConfig {
    pub engine_path: Option<PathBuf>,
    /// Caller-side limit for a single search.
    pub timeout: Duration,
    /// How many times a failed request is retried on a fresh engine.
    pub retries: u32,
    /// Engine `Threads` option; engine default when unset.
    pub threads: Option<u32>,
    /// Engine `Hash` size in megabytes; engine default when unset.
    pub hash_mb: Option<u32>,
}

impl Default for UciEvaluatorConfig {
    fn default() -> Self {
        Self {
            engine_path: None,
            timeout: Duration::from_secs(60),
            retries: 1,
            threads: None,
            hash_mb: None,
        }
    }
}

/// [`PositionEvaluator`] backed by a UCI engine process.
///
/// The process is spawned on first use and reused for later requests. A
/// failed or timed-out request kills it; the next attempt starts a new one.
pub struct UciEvaluator {
    config: UciEvaluatorConfig,
    engine: Option<StockfishEngine>,
    contempt: Option<i32>,
}

impl UciEvaluator {
    pub fn new(config: UciEvaluatorConfig) -> Self {
        Self {
            config,
            engine: None,
            contempt: None,
        }
    }

    async fn engine(&mut self, contempt: Option<i32>) -> Result<&mut StockfishEngine, EvalError> {
        if self.engine.is_some() && self.contempt != contempt {
            tracing::debug!(?contempt, "Contempt changed, restarting engine");
            self.shutdown().await;
        }
        let engine = match self.engine.take() {
            Some(engine) => engine,
            None => {
                StockfishEngine::spawn_with_config(EngineConfig {
                    path: self.config.engine_path.clone(),
                    contempt,
                    threads: self.config.threads,
                    hash_mb: self.config.hash_mb,
                    ..Default::default()
                })
                .await?
            }
        };
        self.contempt = contempt;
        Ok(self.engine.insert(engine))
    }

    async fn try_once(&mut self, request: &EvalRequest) -> Result<ScoreDescriptor, EvalError> {
        let timeout = self.config.timeout;
        let engine = self.engine(request.contempt).await?;
        let analysis = tokio::time::timeout(timeout, engine.analyse(&request.fen, request.depth))
            .await
            .map_err(|_| EvalError::Timeout(timeout))??;
        if analysis.depth.is_some_and(|d| d < request.depth) {
            tracing::warn!(
                fen = %request.fen,
                reached = ?analysis.depth,
                requested = request.depth,
                "Score from a shallower search than requested"
            );
        }

        let side = chess::fen::side_to_move(&request.fen)
            .map_err(|_| EvalError::InvalidPosition(request.fen.clone()))?;
        match analysis.score.map(|s| s.white_relative(side)) {
            Some(Score::Centipawns(cp)) => Ok(ScoreDescriptor::Centipawns(cp)),
            Some(Score::Mate(n)) => Ok(ScoreDescriptor::Mate(n)),
            None => Err(EvalError::NoScore(request.fen.clone())),
        }
    }

    pub async fn shutdown(&mut self) {
        if let Some(engine) = self.engine.take() {
            engine.shutdown().await;
        }
    }
}

impl PositionEvaluator for UciEvaluator {
    async fn evaluate(&mut self, request: &EvalRequest) -> Result<ScoreDescriptor, EvalError> {
        if let Some(score) = terminal_score(&request.fen)? {
            return Ok(score);
        }

        let mut attempt = 0;
        loop {
            match self.try_once(request).await {
                Ok(score) => return Ok(score),
                Err(e) if attempt < self.config.retries => {
                    attempt += 1;
                    tracing::warn!(attempt, "Evaluation failed, restarting engine: {}", e);
                    self.shutdown().await;
                }
                Err(e) => {
                    self.shutdown().await;
                    return Err(e);
                }
            }
        }
    }
}

/// Options for [`evaluate_nodes`].
#[derive(Debug, Clone, Copy)]
pub struct EvalOptions {
    pub depth: u8,
    pub contempt: Option<i32>,
    /// Re-evaluate nodes that already carry an evaluation from the notes.
    pub override_existing: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            depth: 18,
            contempt: None,
            override_existing: false,
        }
    }
}

/// Fill in the evaluation of every live node, in order.
///
/// The first failure aborts the run. Positions reached by transposition are
/// sent to the evaluator only once.
pub async fn evaluate_nodes<E: PositionEvaluator>(
    nodes: &mut [DraftNode],
    evaluator: &mut E,
    options: EvalOptions,
) -> Result<(), EvalError> {
    let total = nodes.len();
    let mut cache: HashMap<String, Evaluation> = HashMap::new();

    for (index, node) in nodes.iter_mut().enumerate() {
        if node.evaluation.is_some() && !options.override_existing {
            tracing::debug!(uid = node.uid, "Keeping evaluation from notes");
            continue;
        }
        let fen = node.variation.fen();
        let evaluation = match cache.get(&fen) {
            Some(evaluation) => *evaluation,
            None => {
                let request = EvalRequest {
                    fen: fen.clone(),
                    depth: options.depth,
                    contempt: options.contempt,
                };
                let evaluation = Evaluation::from(evaluator.evaluate(&request).await?);
                cache.insert(fen, evaluation);
                evaluation
            }
        };
        node.evaluation = Some(evaluation);
        tracing::info!(
            "[{}/{}] {} {}",
            index + 1,
            total,
            if node.line.is_empty() { "(start)" } else { &node.line },
            evaluation
        );
    }
    Ok(())
}
