//! File version migration.

use crate::ProjectError;
use crate::schema::PlantFile;

pub const LATEST_VERSION: u32 = 2;

pub fn migrate_to_latest(mut plant: PlantFile) -> Result<PlantFile, ProjectError> {
    while plant.version < LATEST_VERSION {
        plant = migrate_one_version(plant)?;
    }
    Ok(plant)
}

fn migrate_one_version(plant: PlantFile) -> Result<PlantFile, ProjectError> {
    match plant.version {
        0 => migrate_v0_to_v1(plant),
        1 => migrate_v1_to_v2(plant),
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

fn migrate_v0_to_v1(mut plant: PlantFile) -> Result<PlantFile, ProjectError> {
    plant.version = 1;
    Ok(plant)
}

// Version 1 predates the enhancement block; a zero boost means "none".
fn migrate_v1_to_v2(mut plant: PlantFile) -> Result<PlantFile, ProjectError> {
    let enh = &mut plant.engine.enhancements;
    if enh.thermal_boost == 0.0 {
        enh.thermal_boost = 1.0;
    }
    plant.version = 2;
    Ok(plant)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_latest_is_noop() {
        let plant = PlantFile::new("test");
        let migrated = migrate_to_latest(plant.clone()).unwrap();
        assert_eq!(migrated, plant);
    }

    #[test]
    fn v1_zero_boost_becomes_neutral() {
        let mut plant = PlantFile::new("old");
        plant.version = 1;
        plant.engine.enhancements.thermal_boost = 0.0;
        let migrated = migrate_to_latest(plant).unwrap();
        assert_eq!(migrated.version, LATEST_VERSION);
        assert_eq!(migrated.engine.enhancements.thermal_boost, 1.0);
    }

    #[test]
    fn v0_walks_every_step() {
        let mut plant = PlantFile::new("ancient");
        plant.version = 0;
        let migrated = migrate_to_latest(plant).unwrap();
        assert_eq!(migrated.version, LATEST_VERSION);
    }
}
