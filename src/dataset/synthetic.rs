//! Randomized equipment datasets with the loader's schema.

use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{Category, Covariate, CovariateVector, DataOrigin, Dataset, EquipmentRecord, RecordId};

/// Default number of records generated when the input file is unusable.
pub const DEFAULT_SYNTHETIC_SIZE: usize = 120;
/// Default number of records generated by the regenerate command.
pub const DEFAULT_REGENERATE_SIZE: usize = 150;

/// Generate `n` random records; names and categories are always present.
pub fn synthesize<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Dataset {
    synthesize_with_origin(n, rng, DataOrigin::Synthetic { seed: None })
}

/// Generate a reproducible dataset from a fixed seed.
pub fn synthesize_seeded(n: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    synthesize_with_origin(n, &mut rng, DataOrigin::Synthetic { seed: Some(seed) })
}

fn synthesize_with_origin<R: Rng + ?Sized>(n: usize, rng: &mut R, origin: DataOrigin) -> Dataset {
    let records = (0..n).map(|row| random_record(row, rng)).collect();
    Dataset::new(records, origin)
}

fn random_record<R: Rng + ?Sized>(row: usize, rng: &mut R) -> EquipmentRecord {
    let mut covariates = CovariateVector::new([0.0; Covariate::COUNT]);
    covariates.set(Covariate::Load, rng.random_range(3000.0..6000.0));
    covariates.set(Covariate::Capacity, rng.random_range(4000.0..7000.0));
    covariates.set(Covariate::Utilization, rng.random_range(0.5..0.9));
    covariates.set(Covariate::Temperature, rng.random_range(-20.0..35.0));
    covariates.set(Covariate::WindSpeed, rng.random_range(0.0..15.0));
    covariates.set(Covariate::Holiday, f64::from(rng.random_range(0u8..2)));
    covariates.set(Covariate::Age, f64::from(rng.random_range(1u32..50)));
    let id = RecordId::from_row_number(row);
    EquipmentRecord {
        name: Some(format!("Item-{id}")),
        category: Some(Category::from_capacity(covariates.get(Covariate::Capacity))),
        id,
        duration: f64::from(rng.random_range(10u32..200)),
        event: rng.random_bool(0.5),
        covariates,
        extras: Vec::new(),
    }
}
