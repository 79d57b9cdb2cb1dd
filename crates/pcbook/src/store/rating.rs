//! Running score aggregates per laptop.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::StoreError;

/// Cumulative rating of one laptop.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rating {
    /// Number of scores received
    pub count: u32,
    /// Sum of scores received
    pub sum: f64,
}

impl Rating {
    /// Mean score, or `None` before the first score.
    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count))
    }
}

/// Storage for laptop ratings.
pub trait RatingStore: Send + Sync {
    /// Fold `score` into the laptop's rating and return the updated value.
    fn add(&self, laptop_id: &str, score: f64) -> Result<Rating, StoreError>;
}

/// Process-lifetime rating store.
#[derive(Debug, Default)]
pub struct InMemoryRatingStore {
    ratings: RwLock<HashMap<String, Rating>>,
}

impl InMemoryRatingStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RatingStore for InMemoryRatingStore {
    fn add(&self, laptop_id: &str, score: f64) -> Result<Rating, StoreError> {
        let mut ratings = self.ratings.write();
        let rating = ratings.entry(laptop_id.to_string()).or_default();
        rating.count = rating
            .count
            .checked_add(1)
            .ok_or_else(|| StoreError::RatingLimit(laptop_id.to_string()))?;
        rating.sum += score;
        Ok(*rating)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_average_is_undefined_before_first_score() {
        assert_eq!(Rating::default().average(), None);
    }

    #[test]
    fn test_running_average() {
        let store = InMemoryRatingStore::new();
        let scores = [8.0, 10.0, 3.0, 5.0];

        let mut sum = 0.0;
        for (k, score) in scores.iter().enumerate() {
            sum += score;
            let rating = store.add("laptop", *score).unwrap();
            assert_eq!(rating.count as usize, k + 1);
            assert_eq!(rating.average(), Some(sum / (k + 1) as f64));
        }
    }

    #[test]
    fn test_laptops_are_rated_independently() {
        let store = InMemoryRatingStore::new();
        store.add("a", 10.0).unwrap();
        let b = store.add("b", 2.0).unwrap();

        assert_eq!(b.count, 1);
        assert_eq!(b.average(), Some(2.0));
    }

    #[test]
    fn test_full_counter_rejects_score_and_keeps_rating() {
        let store = InMemoryRatingStore::new();
        let full = Rating {
            count: u32::MAX,
            sum: 5.0 * f64::from(u32::MAX),
        };
        store.ratings.write().insert("laptop".to_string(), full);

        let err = store.add("laptop", 10.0).unwrap_err();
        assert!(matches!(err, StoreError::RatingLimit(id) if id == "laptop"));
        assert_eq!(store.ratings.read()["laptop"], full);
    }

    #[test]
    fn test_concurrent_adds_are_not_lost() {
        let store = Arc::new(InMemoryRatingStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.add("laptop", 1.0).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let rating = store.add("laptop", 1.0).unwrap();
        assert_eq!(rating.count, 801);
        assert_eq!(rating.sum, 801.0);
    }
}
