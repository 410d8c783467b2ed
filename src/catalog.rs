//! Curriculum seeding.
//!
//! A curriculum file lists groups and their units in order. Seeding upserts both by natural
//! key, so re-running it renames or reorders without touching attached content.

use crate::content::{Group, Unit};
use crate::error::StorageError;
use crate::store::CatalogWriter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Curriculum {
    #[serde(default)]
    pub groups: Vec<CurriculumGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurriculumGroup {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub units: Vec<CurriculumUnit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurriculumUnit {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub objectives: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub groups: usize,
    pub units: usize,
}

impl Curriculum {
    /// Parse JSON or TOML, chosen by file extension (JSON when unknown).
    pub fn parse(text: &str, format_hint: Option<&str>) -> Result<Self, StorageError> {
        let curriculum: Curriculum = match format_hint {
            Some("toml") => toml::from_str(text)
                .map_err(|e| StorageError::InvalidData(format!("curriculum TOML: {}", e)))?,
            _ => serde_json::from_str(text)?,
        };
        curriculum.check()?;
        Ok(curriculum)
    }

    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let text = std::fs::read_to_string(path)?;
        let extension = path.extension().and_then(|e| e.to_str());
        Self::parse(&text, extension)
    }

    /// Slugs must be non-empty and unique within their scope.
    fn check(&self) -> Result<(), StorageError> {
        let mut group_slugs = HashSet::new();
        for group in &self.groups {
            if group.slug.trim().is_empty() {
                return Err(StorageError::InvalidData("group with empty slug".into()));
            }
            if !group_slugs.insert(group.slug.as_str()) {
                return Err(StorageError::InvalidData(format!(
                    "duplicate group slug {:?}",
                    group.slug
                )));
            }
            let mut unit_slugs = HashSet::new();
            for unit in &group.units {
                if unit.slug.trim().is_empty() || !unit_slugs.insert(unit.slug.as_str()) {
                    return Err(StorageError::InvalidData(format!(
                        "empty or duplicate unit slug {:?} in group {:?}",
                        unit.slug, group.slug
                    )));
                }
            }
        }
        Ok(())
    }

    /// Catalog entities with order indexes taken from list position.
    pub fn entities(&self) -> Vec<(Group, Vec<Unit>)> {
        self.groups
            .iter()
            .enumerate()
            .map(|(group_index, group)| {
                let units = group
                    .units
                    .iter()
                    .enumerate()
                    .map(|(unit_index, unit)| Unit {
                        group_slug: group.slug.clone(),
                        slug: unit.slug.clone(),
                        name: unit.name.clone(),
                        order_index: unit_index as i64,
                        objectives: unit.objectives.clone(),
                    })
                    .collect();
                (
                    Group {
                        slug: group.slug.clone(),
                        name: group.name.clone(),
                        order_index: group_index as i64,
                    },
                    units,
                )
            })
            .collect()
    }
}

pub async fn seed<W: CatalogWriter + ?Sized>(
    writer: &W,
    curriculum: &Curriculum,
) -> Result<SeedSummary, StorageError> {
    let mut summary = SeedSummary::default();
    for (group, units) in curriculum.entities() {
        writer.upsert_group(&group).await?;
        summary.groups += 1;
        for unit in &units {
            writer.upsert_unit(unit).await?;
            summary.units += 1;
        }
        info!(group = %group.slug, units = units.len(), "seeded group");
    }
    Ok(summary)
}
