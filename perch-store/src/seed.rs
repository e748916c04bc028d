use std::collections::HashSet;

use serde::Serialize;
use tracing::info;

use perch_core::DeskRepository;
use perch_domain::{Desk, ReservationError};

// The fixed floor plan: two rows of six desks.
const FLOOR_PLAN: [(&str, &str, i32, i32); 12] = [
    ("desk-1", "Desk 1", 10, 7),
    ("desk-2", "Desk 2", 25, 7),
    ("desk-3", "Desk 3", 40, 7),
    ("desk-4", "Desk 4", 55, 7),
    ("desk-5", "Desk 5", 70, 7),
    ("desk-6", "Desk 6", 85, 7),
    ("desk-7", "Desk 7", 10, 28),
    ("desk-8", "Desk 8", 25, 28),
    ("desk-9", "Desk 9", 40, 28),
    ("desk-10", "Desk 10", 55, 28),
    ("desk-11", "Desk 11", 70, 28),
    ("desk-12", "Desk 12", 85, 28),
];

#[derive(Debug, Serialize)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
    pub total: usize,
}

/// Create any floor-plan desks that do not exist yet. Idempotent: desks
/// already present are left untouched and counted as skipped.
pub async fn seed_floor_plan(desks: &dyn DeskRepository) -> Result<SeedReport, ReservationError> {
    let existing: HashSet<String> = desks
        .list_desks()
        .await?
        .into_iter()
        .map(|d| d.id)
        .collect();

    let mut created = 0;
    let mut skipped = 0;
    for (id, name, x, y) in FLOOR_PLAN {
        if existing.contains(id) {
            skipped += 1;
            continue;
        }
        desks.insert_desk(&Desk::new(id, name, x, y)).await?;
        created += 1;
    }

    info!(created, skipped, "floor plan seeded");
    Ok(SeedReport {
        created,
        skipped,
        total: existing.len() + created,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_core::MemoryStore;

    #[tokio::test]
    async fn seeding_twice_creates_nothing_new() {
        let store = MemoryStore::new();

        let first = seed_floor_plan(&store).await.unwrap();
        assert_eq!(first.created, 12);
        assert_eq!(first.skipped, 0);
        assert_eq!(first.total, 12);

        let second = seed_floor_plan(&store).await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.skipped, 12);
        assert_eq!(second.total, 12);
    }
}
