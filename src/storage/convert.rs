//! Conversion between the entity model and the record model.
//!
//! Entity → record is infallible: every node becomes a record whose
//! `position` is its index in the source collection, and the recipe search
//! string is rebuilt from scratch. Records come out *detached*: every
//! back-reference is `None`, and the store sets them in its relink pass.
//!
//! Record → entity sorts each child group by `position` before mapping it.
//! A record missing a required field is left out of the result and reported
//! as a [`SkippedRecord`], so callers see exactly what was dropped.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::models::{
    AboutSection, Folder, FolderKind, Identified, Image, Ingredient, IngredientSection, NodeKind,
    Recipe, Siblings, Step, StepSection,
};

use super::records::{
    AboutSectionRecord, BlobRecord, FolderRecord, ImageRecord, IngredientRecord,
    IngredientSectionRecord, RecipeRecord, StepRecord, StepSectionRecord, sort_by_position,
};

/// Converts a timestamp to its stored form (nanoseconds since the epoch).
///
/// Times past the year 2262 do not fit and saturate.
#[must_use]
pub fn to_db_timestamp(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// Converts a stored timestamp back to a `DateTime`.
#[must_use]
pub fn from_db_timestamp(nanos: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(nanos)
}

fn position(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}

// ============================================================================
// Entity → record
// ============================================================================

/// Converts a folder subtree into detached records.
#[must_use]
pub fn folder_to_record(folder: &Folder) -> FolderRecord {
    folder_to_record_at(folder, 0)
}

fn folder_to_record_at(folder: &Folder, index: usize) -> FolderRecord {
    FolderRecord {
        id: Some(folder.id),
        parent_id: None,
        position: position(index),
        name: Some(folder.name.clone()),
        kind: Some(folder.kind.as_str().to_string()),
        created_at: Some(to_db_timestamp(folder.created_at)),
        edited_at: Some(to_db_timestamp(folder.edited_at)),
        image: folder.image.as_ref().map(|image| image_to_record(image, 0)),
        folders: folder
            .folders
            .iter()
            .enumerate()
            .map(|(i, child)| folder_to_record_at(child, i))
            .collect(),
        recipes: folder
            .recipes
            .iter()
            .enumerate()
            .map(|(i, recipe)| recipe_to_record_at(recipe, i))
            .collect(),
    }
}

/// Converts a recipe subtree into detached records, rebuilding its search string.
#[must_use]
pub fn recipe_to_record(recipe: &Recipe) -> RecipeRecord {
    recipe_to_record_at(recipe, 0)
}

fn recipe_to_record_at(recipe: &Recipe, index: usize) -> RecipeRecord {
    RecipeRecord {
        id: Some(recipe.id),
        folder_id: None,
        position: position(index),
        name: Some(recipe.name.clone()),
        search_text: recipe.search_string(),
        created_at: Some(to_db_timestamp(recipe.created_at)),
        edited_at: Some(to_db_timestamp(recipe.edited_at)),
        images: images_to_records(&recipe.images),
        about_sections: recipe
            .about_sections
            .iter()
            .enumerate()
            .map(|(i, about)| AboutSectionRecord {
                id: Some(about.id),
                recipe_id: None,
                position: position(i),
                name: Some(about.name.clone()),
                description: Some(about.description.clone()),
            })
            .collect(),
        ingredient_sections: recipe
            .ingredient_sections
            .iter()
            .enumerate()
            .map(|(i, section)| IngredientSectionRecord {
                id: Some(section.id),
                recipe_id: None,
                position: position(i),
                name: Some(section.name.clone()),
                ingredients: section
                    .ingredients
                    .iter()
                    .enumerate()
                    .map(|(j, ingredient)| IngredientRecord {
                        id: Some(ingredient.id),
                        section_id: None,
                        position: position(j),
                        name: Some(ingredient.name.clone()),
                        amount: Some(ingredient.amount),
                        unit: Some(ingredient.unit.clone()),
                    })
                    .collect(),
            })
            .collect(),
        step_sections: recipe
            .step_sections
            .iter()
            .enumerate()
            .map(|(i, section)| StepSectionRecord {
                id: Some(section.id),
                recipe_id: None,
                position: position(i),
                name: Some(section.name.clone()),
                steps: section
                    .steps
                    .iter()
                    .enumerate()
                    .map(|(j, step)| StepRecord {
                        id: Some(step.id),
                        section_id: None,
                        position: position(j),
                        description: Some(step.description.clone()),
                        images: images_to_records(&step.images),
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn images_to_records(images: &Siblings<Image>) -> Vec<ImageRecord> {
    images
        .iter()
        .enumerate()
        .map(|(i, image)| image_to_record(image, i))
        .collect()
}

fn image_to_record(image: &Image, index: usize) -> ImageRecord {
    ImageRecord {
        id: Some(image.id),
        owner: None,
        position: position(index),
        data: image
            .data
            .clone()
            .map_or(BlobRecord::Deferred, BlobRecord::Loaded),
    }
}

// ============================================================================
// Record → entity
// ============================================================================

/// A record left out of a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Kind of the skipped record.
    pub kind: NodeKind,
    /// Identity, when it could be read.
    pub id: Option<String>,
    /// Why the record was skipped.
    pub reason: String,
}

impl fmt::Display for SkippedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "skipped {} '{id}': {}", self.kind, self.reason),
            None => write!(f, "skipped {}: {}", self.kind, self.reason),
        }
    }
}

/// A conversion result together with the records it had to leave out.
#[derive(Debug, Clone, PartialEq)]
pub struct Converted<T> {
    /// The converted value.
    pub value: T,
    /// Records that were dropped.
    pub skipped: Vec<SkippedRecord>,
}

impl<T> Converted<T> {
    /// Returns `true` if nothing was skipped.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Maps the value, keeping the diagnostics.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Converted<U> {
        Converted {
            value: f(self.value),
            skipped: self.skipped,
        }
    }
}

/// Rebuilds a folder subtree from records.
///
/// Returns `None` as the value when the root record itself is unusable.
#[must_use]
pub fn folder_from_record(record: FolderRecord) -> Converted<Option<Folder>> {
    let mut reader = RecordReader::default();
    let value = reader.folder(record);
    reader.finish(value)
}

/// Rebuilds a recipe subtree from records.
///
/// Returns `None` as the value when the root record itself is unusable.
#[must_use]
pub fn recipe_from_record(record: RecipeRecord) -> Converted<Option<Recipe>> {
    let mut reader = RecordReader::default();
    let value = reader.recipe(record);
    reader.finish(value)
}

#[derive(Default)]
struct RecordReader {
    skipped: Vec<SkippedRecord>,
}

impl RecordReader {
    fn finish<T>(self, value: T) -> Converted<T> {
        Converted {
            value,
            skipped: self.skipped,
        }
    }

    fn skip(&mut self, kind: NodeKind, id: Option<String>, reason: &str) {
        self.skipped.push(SkippedRecord {
            kind,
            id,
            reason: reason.to_string(),
        });
    }

    fn siblings<T: Identified>(&mut self, kind: NodeKind, items: Vec<T>) -> Siblings<T> {
        let mut siblings = Siblings::new();
        for item in items {
            let id = item.id();
            if siblings.push(item).is_err() {
                self.skip(kind, Some(id.to_string()), "duplicate sibling identity");
            }
        }
        siblings
    }

    fn folder(&mut self, mut record: FolderRecord) -> Option<Folder> {
        let Some(id) = record.id else {
            self.skip(NodeKind::Folder, None, "missing identity");
            return None;
        };
        let (Some(name), Some(kind), Some(created_at), Some(edited_at)) = (
            record.name.take(),
            record.kind.take(),
            record.created_at,
            record.edited_at,
        ) else {
            self.skip(NodeKind::Folder, Some(id.to_string()), "missing required field");
            return None;
        };
        let Some(kind) = FolderKind::parse(&kind) else {
            self.skip(NodeKind::Folder, Some(id.to_string()), "unknown folder kind");
            return None;
        };

        let image = record.image.take().and_then(|image| self.image(image));

        sort_by_position(&mut record.folders);
        let folders: Vec<Folder> = record
            .folders
            .into_iter()
            .filter_map(|child| self.folder(child))
            .collect();
        let folders = self.siblings(NodeKind::Folder, folders);

        sort_by_position(&mut record.recipes);
        let recipes: Vec<Recipe> = record
            .recipes
            .into_iter()
            .filter_map(|recipe| self.recipe(recipe))
            .collect();
        let recipes = self.siblings(NodeKind::Recipe, recipes);

        Some(Folder {
            id,
            parent_id: record.parent_id,
            name,
            image,
            folders,
            recipes,
            kind,
            created_at: from_db_timestamp(created_at),
            edited_at: from_db_timestamp(edited_at),
        })
    }

    fn recipe(&mut self, mut record: RecipeRecord) -> Option<Recipe> {
        let Some(id) = record.id else {
            self.skip(NodeKind::Recipe, None, "missing identity");
            return None;
        };
        let (Some(name), Some(created_at), Some(edited_at)) =
            (record.name.take(), record.created_at, record.edited_at)
        else {
            self.skip(NodeKind::Recipe, Some(id.to_string()), "missing required field");
            return None;
        };

        let images = self.images(record.images);

        sort_by_position(&mut record.about_sections);
        let about: Vec<AboutSection> = record
            .about_sections
            .into_iter()
            .filter_map(|about| self.about(about))
            .collect();
        let about_sections = self.siblings(NodeKind::AboutSection, about);

        sort_by_position(&mut record.ingredient_sections);
        let ingredients: Vec<IngredientSection> = record
            .ingredient_sections
            .into_iter()
            .filter_map(|section| self.ingredient_section(section))
            .collect();
        let ingredient_sections = self.siblings(NodeKind::IngredientSection, ingredients);

        sort_by_position(&mut record.step_sections);
        let steps: Vec<StepSection> = record
            .step_sections
            .into_iter()
            .filter_map(|section| self.step_section(section))
            .collect();
        let step_sections = self.siblings(NodeKind::StepSection, steps);

        Some(Recipe {
            id,
            parent_id: record.folder_id,
            name,
            images,
            about_sections,
            ingredient_sections,
            step_sections,
            created_at: from_db_timestamp(created_at),
            edited_at: from_db_timestamp(edited_at),
        })
    }

    fn about(&mut self, record: AboutSectionRecord) -> Option<AboutSection> {
        let Some(id) = record.id else {
            self.skip(NodeKind::AboutSection, None, "missing identity");
            return None;
        };
        let Some(name) = record.name else {
            self.skip(NodeKind::AboutSection, Some(id.to_string()), "missing name");
            return None;
        };
        Some(AboutSection {
            id,
            name,
            description: record.description.unwrap_or_default(),
        })
    }

    fn ingredient_section(
        &mut self,
        mut record: IngredientSectionRecord,
    ) -> Option<IngredientSection> {
        let Some(id) = record.id else {
            self.skip(NodeKind::IngredientSection, None, "missing identity");
            return None;
        };
        let Some(name) = record.name.take() else {
            self.skip(NodeKind::IngredientSection, Some(id.to_string()), "missing name");
            return None;
        };

        sort_by_position(&mut record.ingredients);
        let ingredients: Vec<Ingredient> = record
            .ingredients
            .into_iter()
            .filter_map(|ingredient| self.ingredient(ingredient))
            .collect();

        Some(IngredientSection {
            id,
            name,
            ingredients: self.siblings(NodeKind::Ingredient, ingredients),
        })
    }

    fn ingredient(&mut self, record: IngredientRecord) -> Option<Ingredient> {
        let Some(id) = record.id else {
            self.skip(NodeKind::Ingredient, None, "missing identity");
            return None;
        };
        let Some(name) = record.name else {
            self.skip(NodeKind::Ingredient, Some(id.to_string()), "missing name");
            return None;
        };
        Some(Ingredient {
            id,
            name,
            // NaN and negatives both clamp to zero
            amount: record.amount.unwrap_or_default().max(0.0),
            unit: record.unit.unwrap_or_default(),
        })
    }

    fn step_section(&mut self, mut record: StepSectionRecord) -> Option<StepSection> {
        let Some(id) = record.id else {
            self.skip(NodeKind::StepSection, None, "missing identity");
            return None;
        };
        let Some(name) = record.name.take() else {
            self.skip(NodeKind::StepSection, Some(id.to_string()), "missing name");
            return None;
        };

        sort_by_position(&mut record.steps);
        let steps: Vec<Step> = record
            .steps
            .into_iter()
            .filter_map(|step| self.step(step))
            .collect();

        Some(StepSection {
            id,
            name,
            steps: self.siblings(NodeKind::Step, steps),
        })
    }

    fn step(&mut self, record: StepRecord) -> Option<Step> {
        let Some(id) = record.id else {
            self.skip(NodeKind::Step, None, "missing identity");
            return None;
        };
        let Some(description) = record.description else {
            self.skip(NodeKind::Step, Some(id.to_string()), "missing description");
            return None;
        };
        Some(Step {
            id,
            description,
            images: self.images(record.images),
        })
    }

    fn images(&mut self, mut records: Vec<ImageRecord>) -> Siblings<Image> {
        sort_by_position(&mut records);
        let images: Vec<Image> = records
            .into_iter()
            .filter_map(|image| self.image(image))
            .collect();
        self.siblings(NodeKind::Image, images)
    }

    fn image(&mut self, record: ImageRecord) -> Option<Image> {
        let Some(id) = record.id else {
            self.skip(NodeKind::Image, None, "missing identity");
            return None;
        };
        match record.data {
            BlobRecord::Loaded(data) => Some(Image {
                id,
                data: Some(data),
            }),
            BlobRecord::Deferred => Some(Image::deferred(id)),
            BlobRecord::Missing => {
                self.skip(NodeKind::Image, Some(id.to_string()), "missing image data");
                None
            },
        }
    }
}
