//! Spaced, difficulty-adaptive drilling of a repertoire.
//!
//! Every pre-leaf position of the uploaded repertoire becomes an
//! [`Exercise`] with a [`PositionTraining`] record. The
//! [`TrainingScheduler`] draws the next exercise by weight and updates the
//! player's and the position's ratings after each attempt.

pub mod exercise;
pub mod position;
pub mod profile;
pub mod rating;
pub mod scheduler;
pub mod select;
pub mod store;

pub use exercise::{generate_exercise, generate_exercises, Exercise, ExerciseMove};
pub use position::PositionTraining;
pub use profile::{ProfileUpdate, TrainingProfile};
pub use scheduler::{TrainingScheduler, TryResult};
pub use select::weighted_choice;
pub use store::{PersistenceError, TrainingStore, UploadSummary};

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("No exercises available")]
    NoExercisesAvailable,
    #[error("No training record for exercise {0}")]
    UnknownTraining(String),
    #[error("Exercise {0} not found")]
    UnknownExercise(String),
    #[error("Exercise {0} has no moves")]
    EmptyExercise(String),
    #[error("Exercise {id} does not replay: {source}")]
    InvalidExercise {
        id: String,
        #[source]
        source: chess::VariationError,
    },
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
