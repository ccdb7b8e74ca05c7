//! Record graph queries.
//!
//! Child queries carry no `ORDER BY`: ordering is reconstructed from each
//! record's `position` during conversion. Stored identities that fail to
//! parse come back as `None` so the converter can skip and report them.

use crate::models::NodeKind;
use crate::storage::records::{
    AboutSectionRecord, BlobRecord, FolderRecord, ImageOwner, ImageRecord, IngredientRecord,
    IngredientSectionRecord, RecipeRecord, StepRecord, StepSectionRecord,
};
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::str::FromStr;

/// How much of a folder subtree to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// The folder and every descendant, image bytes included.
    Full,
    /// The folder's own fields and cover image, without its bytes.
    Shallow,
}

/// Whether image bytes are read along with their rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blobs {
    /// Read the bytes.
    Load,
    /// Only record whether a blob exists.
    Defer,
}

fn parse_id<T: FromStr>(raw: Option<String>) -> Option<T> {
    raw.and_then(|s| s.parse().ok())
}

fn query_failed(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> Error {
    move |e| Error::operation(operation, e)
}

/// Collects the first column of every row as a string.
pub fn id_column(conn: &Connection, sql: &str, parent: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(sql).map_err(query_failed("prepare_id_query"))?;
    let rows = stmt
        .query_map(params![parent], |row| row.get::<_, String>(0))
        .map_err(query_failed("query_ids"))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(query_failed("read_ids"))
}

/// Returns `true` if a row with `id` exists in `table`.
pub fn row_exists(conn: &Connection, table: &str, id: &str) -> Result<bool> {
    conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)"),
        params![id],
        |row| row.get(0),
    )
    .map_err(query_failed("check_row_exists"))
}

/// Counts the rows of `table`.
pub fn count_rows(conn: &Connection, table: &str) -> Result<u64> {
    let count: i64 = conn
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .map_err(query_failed("count_rows"))?;
    Ok(u64::try_from(count).unwrap_or_default())
}

// ============================================================================
// Images
// ============================================================================

fn image_owner(kind: Option<String>, id: Option<String>) -> Option<ImageOwner> {
    let kind = NodeKind::parse(kind.as_deref()?)?;
    let id = id?;
    match kind {
        NodeKind::Folder => id.parse().ok().map(ImageOwner::Folder),
        NodeKind::Recipe => id.parse().ok().map(ImageOwner::Recipe),
        NodeKind::Step => id.parse().ok().map(ImageOwner::Step),
        _ => None,
    }
}

fn image_from_row(row: &Row<'_>, blobs: Blobs) -> rusqlite::Result<ImageRecord> {
    let data = match blobs {
        Blobs::Load => row
            .get::<_, Option<Vec<u8>>>(4)?
            .map_or(BlobRecord::Missing, BlobRecord::Loaded),
        Blobs::Defer if row.get::<_, bool>(4)? => BlobRecord::Deferred,
        Blobs::Defer => BlobRecord::Missing,
    };
    Ok(ImageRecord {
        id: parse_id(row.get(0)?),
        owner: image_owner(row.get(1)?, row.get(2)?),
        position: row.get(3)?,
        data,
    })
}

/// Loads every image owned by `owner`.
pub fn fetch_images(
    conn: &Connection,
    owner: &ImageOwner,
    blobs: Blobs,
) -> Result<Vec<ImageRecord>> {
    let sql = match blobs {
        Blobs::Load => {
            "SELECT i.id, i.owner_kind, i.owner_id, i.position, b.data
             FROM images i
             LEFT JOIN image_blobs b ON b.image_id = i.id
             WHERE i.owner_kind = ?1 AND i.owner_id = ?2"
        },
        Blobs::Defer => {
            "SELECT i.id, i.owner_kind, i.owner_id, i.position,
                    EXISTS(SELECT 1 FROM image_blobs b WHERE b.image_id = i.id)
             FROM images i
             WHERE i.owner_kind = ?1 AND i.owner_id = ?2"
        },
    };
    let mut stmt = conn
        .prepare_cached(sql)
        .map_err(query_failed("prepare_fetch_images"))?;
    let rows = stmt
        .query_map(params![owner.kind().as_str(), owner.id_string()], |row| {
            image_from_row(row, blobs)
        })
        .map_err(query_failed("fetch_images"))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(query_failed("read_images"))
}

/// Reads the bytes of one image, or `None` if it has none stored.
pub fn fetch_image_data(conn: &Connection, id: &str) -> Result<Option<Vec<u8>>> {
    conn.query_row(
        "SELECT data FROM image_blobs WHERE image_id = ?1",
        params![id],
        |row| row.get(0),
    )
    .optional()
    .map_err(query_failed("fetch_image_data"))
}

// ============================================================================
// Recipes
// ============================================================================

fn recipe_from_row(row: &Row<'_>) -> rusqlite::Result<RecipeRecord> {
    Ok(RecipeRecord {
        id: parse_id(row.get(0)?),
        folder_id: parse_id(row.get(1)?),
        position: row.get(2)?,
        name: row.get(3)?,
        search_text: row.get(4)?,
        created_at: row.get(5)?,
        edited_at: row.get(6)?,
        ..RecipeRecord::default()
    })
}

/// Loads a recipe and all of its sections, items, and images.
///
/// Returns `Ok(None)` if no recipe row has `id`.
pub fn fetch_recipe(conn: &Connection, id: &str, blobs: Blobs) -> Result<Option<RecipeRecord>> {
    let record = conn
        .query_row(
            "SELECT id, folder_id, position, name, search_text, created_at, edited_at
             FROM recipes WHERE id = ?1",
            params![id],
            recipe_from_row,
        )
        .optional()
        .map_err(query_failed("fetch_recipe"))?;

    let Some(mut record) = record else {
        return Ok(None);
    };

    if let Some(recipe_id) = record.id {
        record.images = fetch_images(conn, &ImageOwner::Recipe(recipe_id), blobs)?;
    }
    record.about_sections = fetch_about_sections(conn, id)?;
    record.ingredient_sections = fetch_ingredient_sections(conn, id)?;
    record.step_sections = fetch_step_sections(conn, id, blobs)?;

    Ok(Some(record))
}

fn fetch_about_sections(conn: &Connection, recipe_id: &str) -> Result<Vec<AboutSectionRecord>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, recipe_id, position, name, description
             FROM about_sections WHERE recipe_id = ?1",
        )
        .map_err(query_failed("prepare_fetch_about_sections"))?;
    let rows = stmt
        .query_map(params![recipe_id], |row| {
            Ok(AboutSectionRecord {
                id: parse_id(row.get(0)?),
                recipe_id: parse_id(row.get(1)?),
                position: row.get(2)?,
                name: row.get(3)?,
                description: row.get(4)?,
            })
        })
        .map_err(query_failed("fetch_about_sections"))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(query_failed("read_about_sections"))
}

fn fetch_ingredient_sections(
    conn: &Connection,
    recipe_id: &str,
) -> Result<Vec<IngredientSectionRecord>> {
    let sections = {
        let mut stmt = conn
            .prepare_cached(
                "SELECT id, recipe_id, position, name
                 FROM ingredient_sections WHERE recipe_id = ?1",
            )
            .map_err(query_failed("prepare_fetch_ingredient_sections"))?;
        let rows = stmt
            .query_map(params![recipe_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    IngredientSectionRecord {
                        id: parse_id(row.get(0)?),
                        recipe_id: parse_id(row.get(1)?),
                        position: row.get(2)?,
                        name: row.get(3)?,
                        ingredients: Vec::new(),
                    },
                ))
            })
            .map_err(query_failed("fetch_ingredient_sections"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(query_failed("read_ingredient_sections"))?
    };

    sections
        .into_iter()
        .map(|(raw_id, mut section)| {
            section.ingredients = fetch_ingredients(conn, &raw_id)?;
            Ok(section)
        })
        .collect()
}

fn fetch_ingredients(conn: &Connection, section_id: &str) -> Result<Vec<IngredientRecord>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, section_id, position, name, amount, unit
             FROM ingredients WHERE section_id = ?1",
        )
        .map_err(query_failed("prepare_fetch_ingredients"))?;
    let rows = stmt
        .query_map(params![section_id], |row| {
            Ok(IngredientRecord {
                id: parse_id(row.get(0)?),
                section_id: parse_id(row.get(1)?),
                position: row.get(2)?,
                name: row.get(3)?,
                amount: row.get(4)?,
                unit: row.get(5)?,
            })
        })
        .map_err(query_failed("fetch_ingredients"))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(query_failed("read_ingredients"))
}

fn fetch_step_sections(
    conn: &Connection,
    recipe_id: &str,
    blobs: Blobs,
) -> Result<Vec<StepSectionRecord>> {
    let sections = {
        let mut stmt = conn
            .prepare_cached(
                "SELECT id, recipe_id, position, name
                 FROM step_sections WHERE recipe_id = ?1",
            )
            .map_err(query_failed("prepare_fetch_step_sections"))?;
        let rows = stmt
            .query_map(params![recipe_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    StepSectionRecord {
                        id: parse_id(row.get(0)?),
                        recipe_id: parse_id(row.get(1)?),
                        position: row.get(2)?,
                        name: row.get(3)?,
                        steps: Vec::new(),
                    },
                ))
            })
            .map_err(query_failed("fetch_step_sections"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(query_failed("read_step_sections"))?
    };

    sections
        .into_iter()
        .map(|(raw_id, mut section)| {
            section.steps = fetch_steps(conn, &raw_id, blobs)?;
            Ok(section)
        })
        .collect()
}

fn fetch_steps(conn: &Connection, section_id: &str, blobs: Blobs) -> Result<Vec<StepRecord>> {
    let steps = {
        let mut stmt = conn
            .prepare_cached(
                "SELECT id, section_id, position, description
                 FROM steps WHERE section_id = ?1",
            )
            .map_err(query_failed("prepare_fetch_steps"))?;
        let rows = stmt
            .query_map(params![section_id], |row| {
                Ok(StepRecord {
                    id: parse_id(row.get(0)?),
                    section_id: parse_id(row.get(1)?),
                    position: row.get(2)?,
                    description: row.get(3)?,
                    images: Vec::new(),
                })
            })
            .map_err(query_failed("fetch_steps"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(query_failed("read_steps"))?
    };

    steps
        .into_iter()
        .map(|mut step| {
            if let Some(step_id) = step.id {
                step.images = fetch_images(conn, &ImageOwner::Step(step_id), blobs)?;
            }
            Ok(step)
        })
        .collect()
}

// ============================================================================
// Folders
// ============================================================================

fn folder_from_row(row: &Row<'_>) -> rusqlite::Result<FolderRecord> {
    Ok(FolderRecord {
        id: parse_id(row.get(0)?),
        parent_id: parse_id(row.get(1)?),
        position: row.get(2)?,
        name: row.get(3)?,
        kind: row.get(4)?,
        created_at: row.get(5)?,
        edited_at: row.get(6)?,
        ..FolderRecord::default()
    })
}

/// Loads a folder, recursing into child folders and recipes for
/// [`Depth::Full`].
///
/// Returns `Ok(None)` if no folder row has `id`.
pub fn fetch_folder(conn: &Connection, id: &str, depth: Depth) -> Result<Option<FolderRecord>> {
    let record = conn
        .query_row(
            "SELECT id, parent_id, position, name, kind, created_at, edited_at
             FROM folders WHERE id = ?1",
            params![id],
            folder_from_row,
        )
        .optional()
        .map_err(query_failed("fetch_folder"))?;

    let Some(mut record) = record else {
        return Ok(None);
    };

    let blobs = match depth {
        Depth::Full => Blobs::Load,
        Depth::Shallow => Blobs::Defer,
    };
    if let Some(folder_id) = record.id {
        record.image = fetch_images(conn, &ImageOwner::Folder(folder_id), blobs)?
            .into_iter()
            .min_by_key(|image| image.position);
    }

    if depth == Depth::Full {
        for child in id_column(conn, "SELECT id FROM folders WHERE parent_id = ?1", id)? {
            if let Some(folder) = fetch_folder(conn, &child, Depth::Full)? {
                record.folders.push(folder);
            }
        }
        for child in id_column(conn, "SELECT id FROM recipes WHERE folder_id = ?1", id)? {
            if let Some(recipe) = fetch_recipe(conn, &child, Blobs::Load)? {
                record.recipes.push(recipe);
            }
        }
    }

    Ok(Some(record))
}

/// Identities of top-level folders, in stored order.
pub fn root_folder_ids(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare_cached("SELECT id FROM folders WHERE parent_id IS NULL ORDER BY position, created_at")
        .map_err(query_failed("prepare_root_folders"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(query_failed("query_root_folders"))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(query_failed("read_root_folders"))
}

/// Identities of recipes whose search text contains `needle`.
///
/// `needle` must already be lower-cased; an empty needle matches every
/// recipe.
pub fn matching_recipe_ids(conn: &Connection, needle: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id FROM recipes
             WHERE ?1 = '' OR instr(search_text, ?1) > 0
             ORDER BY name COLLATE NOCASE, id",
        )
        .map_err(query_failed("prepare_search_recipes"))?;
    let rows = stmt
        .query_map(params![needle], |row| row.get::<_, String>(0))
        .map_err(query_failed("search_recipes"))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(query_failed("read_search_results"))
}
