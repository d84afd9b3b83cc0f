//! Picks what to train next and records attempts.

use rand::Rng;
use tokio::sync::Mutex;

use crate::exercise::Exercise;
use crate::position::PositionTraining;
use crate::profile::{ProfileUpdate, TrainingProfile};
use crate::rating::rate;
use crate::select::weighted_choice;
use crate::store::TrainingStore;
use crate::TrainingError;

/// State after an attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct TryResult {
    pub training: PositionTraining,
    pub profile: TrainingProfile,
}

/// Owns the store and the process-wide profile.
///
/// Every mutation holds the profile lock from read to write, so concurrent
/// attempts are applied one after another.
pub struct TrainingScheduler {
    store: TrainingStore,
    profile: Mutex<TrainingProfile>,
}

impl TrainingScheduler {
    /// Load (or create) the profile and take over the store.
    pub fn open(store: TrainingStore) -> Result<Self, TrainingError> {
        let profile = store.load_or_create_profile()?;
        Ok(Self {
            store,
            profile: Mutex::new(profile),
        })
    }

    pub fn store(&self) -> &TrainingStore {
        &self.store
    }

    pub async fn profile(&self) -> TrainingProfile {
        self.profile.lock().await.clone()
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<TrainingProfile, TrainingError> {
        let mut profile = self.profile.lock().await;
        let mut updated = profile.clone();
        update.apply(&mut updated);
        self.store.save_profile(&updated)?;
        *profile = updated;
        Ok(profile.clone())
    }

    /// Scheduling weight of one training under the current profile.
    pub async fn compute_weight(&self, training: &PositionTraining, now: u64) -> f64 {
        training.training_weight(&*self.profile.lock().await, now)
    }

    /// Record one attempt at the exercise `id`.
    ///
    /// Both ratings move using the gap measured before the attempt, and the
    /// counters are bumped with them. Nothing is kept if either write
    /// fails.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn add_try(&self, id: &str, success: bool, now: u64) -> Result<TryResult, TrainingError> {
        let mut profile = self.profile.lock().await;
        let before = self
            .store
            .trainings()
            .load(id)?
            .ok_or_else(|| TrainingError::UnknownTraining(id.to_string()))?;

        let (player_elo, position_elo) = rate(
            profile.elo,
            before.elo,
            success,
            profile.elo_spreading,
            profile.elo_volatility,
        );

        let mut training = before.clone();
        training.elo = position_elo;
        training.tries += 1;
        if success {
            training.successes += 1;
        } else {
            training.failures += 1;
        }
        training.last_try = Some(now);

        let mut updated = profile.clone();
        updated.elo = player_elo;

        self.store.trainings().save(&training)?;
        if let Err(e) = self.store.save_profile(&updated) {
            if let Err(rollback) = self.store.trainings().save(&before) {
                tracing::error!("Failed to roll back training {}: {}", id, rollback);
            }
            return Err(e.into());
        }
        *profile = updated;

        tracing::debug!(
            player_elo = profile.elo,
            position_elo = training.elo,
            tries = training.tries,
            "Attempt recorded"
        );
        Ok(TryResult {
            training,
            profile: profile.clone(),
        })
    }

    /// Draw the next exercise, favoring failed, stale and early lines.
    pub async fn select_next<R: Rng>(
        &self,
        now: u64,
        rng: &mut R,
    ) -> Result<(Exercise, PositionTraining), TrainingError> {
        let trainings = self.store.trainings().load_all()?;
        let chosen = {
            let profile = self.profile.lock().await;
            let weighted = trainings
                .into_iter()
                .map(|t| (t.training_weight(&profile, now), t));
            weighted_choice(weighted, rng)?
        };
        let exercise = self
            .store
            .exercises()
            .load(&chosen.id)?
            .ok_or_else(|| TrainingError::UnknownExercise(chosen.id.clone()))?;
        tracing::debug!(id = %chosen.id, title = %exercise.title, "Selected exercise");
        Ok((exercise, chosen))
    }

    /// Store a hand-written exercise. It gets no training record and is
    /// never scheduled.
    pub fn add_exercise(&self, exercise: &Exercise) -> Result<(), TrainingError> {
        if exercise.moves.is_empty() {
            return Err(TrainingError::EmptyExercise(exercise.id.clone()));
        }
        exercise
            .replay()
            .map_err(|source| TrainingError::InvalidExercise {
                id: exercise.id.clone(),
                source,
            })?;
        self.store.exercises().save(exercise)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::ExerciseMove;
    use chess::PieceColor;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use repertoire::NodeRecord;
    use std::sync::Arc;
    use tempfile::TempDir;

    const DAY: u64 = 86_400;

    fn scheduler(notes: &str) -> (TempDir, TrainingScheduler) {
        let dir = TempDir::new().unwrap();
        let store = TrainingStore::new(dir.path().to_path_buf());
        if !notes.is_empty() {
            let records = repertoire::build_repertoire(notes)
                .unwrap()
                .iter()
                .map(|d| NodeRecord {
                    ev: "0.00".to_string(),
                    ..NodeRecord::from(d)
                })
                .collect();
            store.upload(records, 6, 0).unwrap();
        }
        (dir, TrainingScheduler::open(store).unwrap())
    }

    fn first_id(scheduler: &TrainingScheduler) -> String {
        scheduler.store().trainings().load_all().unwrap()[0].id.clone()
    }

    #[tokio::test]
    async fn test_add_try_even_win() {
        let (_dir, scheduler) = scheduler("1. e4 e5 2. Nf3");
        let id = first_id(&scheduler);

        let result = scheduler.add_try(&id, true, DAY).await.unwrap();
        assert!((result.profile.elo - 1016.0).abs() < 1e-9);
        assert!((result.training.elo - 984.0).abs() < 1e-9);
        assert_eq!(result.training.tries, 1);
        assert_eq!(result.training.successes, 1);
        assert_eq!(result.training.failures, 0);
        assert_eq!(result.training.last_try, Some(DAY));

        // Persisted, and picked up by a fresh scheduler.
        let reopened = TrainingScheduler::open(TrainingStore::new(scheduler.store().dir().to_path_buf())).unwrap();
        assert!((reopened.profile().await.elo - 1016.0).abs() < 1e-9);
        let stored = reopened.store().trainings().load(&id).unwrap().unwrap();
        assert_eq!(stored, result.training);
    }

    #[tokio::test]
    async fn test_add_try_failure_counts() {
        let (_dir, scheduler) = scheduler("1. e4 e5 2. Nf3");
        let id = first_id(&scheduler);
        scheduler.add_try(&id, false, 10).await.unwrap();
        let result = scheduler.add_try(&id, false, 20).await.unwrap();
        assert_eq!(result.training.tries, 2);
        assert_eq!(result.training.failures, 2);
        assert!(result.profile.elo < 1000.0);
        assert!(result.training.elo > 1000.0);
    }

    #[tokio::test]
    async fn test_add_try_unknown_id() {
        let (_dir, scheduler) = scheduler("1. e4 e5");
        let result = scheduler.add_try("nope", true, 0).await;
        assert!(matches!(result, Err(TrainingError::UnknownTraining(_))));
        assert_eq!(scheduler.profile().await, TrainingProfile::default());
    }

    #[tokio::test]
    async fn test_concurrent_tries_are_serialized() {
        let (_dir, scheduler) = scheduler("1. e4 e5 2. Nf3");
        let id = first_id(&scheduler);
        let scheduler = Arc::new(scheduler);

        let mut handles = Vec::new();
        for i in 0..8u64 {
            let scheduler = Arc::clone(&scheduler);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                scheduler.add_try(&id, i % 2 == 0, i).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let training = scheduler.store().trainings().load(&id).unwrap().unwrap();
        assert_eq!(training.tries, 8);
        assert_eq!(training.successes, 4);
        // Every update is zero-sum, so the ratings still add up.
        let profile = scheduler.profile().await;
        assert!((profile.elo + training.elo - 2000.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_select_without_exercises() {
        let (_dir, scheduler) = scheduler("");
        let mut rng = StdRng::seed_from_u64(1);
        let result = scheduler.select_next(0, &mut rng).await;
        assert!(matches!(result, Err(TrainingError::NoExercisesAvailable)));
    }

    #[tokio::test]
    async fn test_select_prefers_heavier_training() {
        let (_dir, scheduler) = scheduler("1. e4 e5 2. Nf3\n1. d4 d5 2. c4");
        scheduler
            .update_profile(&ProfileUpdate {
                inactivity_coef: Some(0.0),
                ease_coef: Some(0.0),
                ..Default::default()
            })
            .await
            .unwrap();
        let id = first_id(&scheduler);
        // Many successes push the failure ratio of this one towards 0.
        for t in 0..40 {
            scheduler.add_try(&id, true, t).await.unwrap();
        }

        let mut rng = StdRng::seed_from_u64(5);
        let picks = 400;
        let mut same = 0;
        for _ in 0..picks {
            let (exercise, training) = scheduler.select_next(100, &mut rng).await.unwrap();
            assert_eq!(exercise.id, training.id);
            if training.id == id {
                same += 1;
            }
        }
        // Weights are about 0.01 against 1.0.
        assert!(same < 40, "picked the trained line {} times", same);
    }

    #[tokio::test]
    async fn test_compute_weight_uses_profile() {
        let (_dir, scheduler) = scheduler("1. e4 e5 2. Nf3");
        let training = scheduler.store().trainings().load_all().unwrap().remove(0);
        scheduler
            .update_profile(&ProfileUpdate {
                ease_coef: Some(0.0),
                ..Default::default()
            })
            .await
            .unwrap();
        // Never tried and created at 0: both ratios are 1.
        assert!((scheduler.compute_weight(&training, DAY).await - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_add_exercise() {
        let (_dir, scheduler) = scheduler("");
        let mut exercise = Exercise {
            id: "custom".to_string(),
            title: "Scholar's mate".to_string(),
            description: String::new(),
            starting_position: chess::START_FEN.to_string(),
            cover_position: chess::START_FEN.to_string(),
            moves: vec![],
            first_move: PieceColor::White,
            created_at: 0,
        };
        assert!(matches!(
            scheduler.add_exercise(&exercise),
            Err(TrainingError::EmptyExercise(_))
        ));

        exercise.moves.push(ExerciseMove {
            ask: true,
            uci: "e2e4".to_string(),
        });
        exercise.moves.push(ExerciseMove {
            ask: false,
            uci: "e2e4".to_string(),
        });
        assert!(matches!(
            scheduler.add_exercise(&exercise),
            Err(TrainingError::InvalidExercise { .. })
        ));

        exercise.moves.pop();
        scheduler.add_exercise(&exercise).unwrap();
        assert!(scheduler.store().exercises().load("custom").unwrap().is_some());
        // Authored exercises are not scheduled.
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            scheduler.select_next(0, &mut rng).await,
            Err(TrainingError::NoExercisesAvailable)
        ));
    }
}
