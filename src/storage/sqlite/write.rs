//! Record graph mutations.
//!
//! Every helper here expects to run inside a transaction opened by the
//! engine. Writes are upserts keyed on identity, so the same helpers insert
//! a fresh subtree and rewrite an existing one. The `identities` table is
//! updated alongside every row insert and delete.

use crate::models::{NodeKind, RecipeId};
use crate::storage::records::{
    AboutSectionRecord, BlobRecord, FolderRecord, ImageOwner, ImageRecord, IngredientRecord,
    IngredientSectionRecord, RecipeRecord, StepRecord, StepSectionRecord,
};
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashSet;
use std::fmt::Display;

use super::read::id_column;

fn write_failed(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> Error {
    move |e| Error::operation(operation, e)
}

fn required<T>(id: Option<T>, kind: NodeKind) -> Result<T> {
    id.ok_or_else(|| Error::InvalidInput(format!("{kind} record without identity")))
}

fn text<T: Display>(id: Option<&T>) -> Option<String> {
    id.map(ToString::to_string)
}

// ============================================================================
// Identity index
// ============================================================================

/// An identity claimed by an incoming subtree.
pub type Claim = (NodeKind, String);

/// Returns the kind stored for `id`, if any node claims it.
pub fn identity_kind(conn: &Connection, id: &str) -> Result<Option<NodeKind>> {
    let kind: Option<String> = conn
        .query_row(
            "SELECT kind FROM identities WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()
        .map_err(write_failed("lookup_identity"))?;
    Ok(kind.as_deref().and_then(NodeKind::parse))
}

fn register_identity(conn: &Connection, kind: NodeKind, id: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO identities (id, kind) VALUES (?1, ?2) ON CONFLICT(id) DO NOTHING",
        params![id, kind.as_str()],
    )
    .map_err(write_failed("register_identity"))?;
    Ok(())
}

fn release_identity(conn: &Connection, id: &str) -> Result<()> {
    conn.execute("DELETE FROM identities WHERE id = ?1", params![id])
        .map_err(write_failed("release_identity"))?;
    Ok(())
}

/// Fails with [`Error::Duplicate`] on the first claim that repeats within
/// `claims` or is already held by a stored node.
pub fn ensure_unclaimed(conn: &Connection, claims: &[Claim]) -> Result<()> {
    ensure_distinct(claims)?;
    for (kind, id) in claims {
        if identity_kind(conn, id)?.is_some() {
            return Err(Error::Duplicate {
                kind: *kind,
                id: id.clone(),
            });
        }
    }
    Ok(())
}

/// Fails with [`Error::Duplicate`] if two claims share an identity.
pub fn ensure_distinct(claims: &[Claim]) -> Result<()> {
    let mut seen = HashSet::with_capacity(claims.len());
    for (kind, id) in claims {
        if !seen.insert(id.as_str()) {
            return Err(Error::Duplicate {
                kind: *kind,
                id: id.clone(),
            });
        }
    }
    Ok(())
}

/// Every identity in a folder subtree, root first.
#[must_use]
pub fn folder_claims(record: &FolderRecord) -> Vec<Claim> {
    let mut claims = Vec::new();
    collect_folder(record, &mut claims);
    claims
}

/// Every identity in a recipe subtree, root first.
#[must_use]
pub fn recipe_claims(record: &RecipeRecord) -> Vec<Claim> {
    let mut claims = Vec::new();
    collect_recipe(record, &mut claims);
    claims
}

fn claim<T: Display>(claims: &mut Vec<Claim>, kind: NodeKind, id: Option<&T>) {
    if let Some(id) = id {
        claims.push((kind, id.to_string()));
    }
}

fn collect_folder(record: &FolderRecord, claims: &mut Vec<Claim>) {
    claim(claims, NodeKind::Folder, record.id.as_ref());
    if let Some(image) = &record.image {
        claim(claims, NodeKind::Image, image.id.as_ref());
    }
    for folder in &record.folders {
        collect_folder(folder, claims);
    }
    for recipe in &record.recipes {
        collect_recipe(recipe, claims);
    }
}

fn collect_recipe(record: &RecipeRecord, claims: &mut Vec<Claim>) {
    claim(claims, NodeKind::Recipe, record.id.as_ref());
    collect_recipe_children(record, claims);
}

fn collect_recipe_children(record: &RecipeRecord, claims: &mut Vec<Claim>) {
    for image in &record.images {
        claim(claims, NodeKind::Image, image.id.as_ref());
    }
    for about in &record.about_sections {
        claim(claims, NodeKind::AboutSection, about.id.as_ref());
    }
    for section in &record.ingredient_sections {
        claim(claims, NodeKind::IngredientSection, section.id.as_ref());
        for ingredient in &section.ingredients {
            claim(claims, NodeKind::Ingredient, ingredient.id.as_ref());
        }
    }
    for section in &record.step_sections {
        claim(claims, NodeKind::StepSection, section.id.as_ref());
        for step in &section.steps {
            claim(claims, NodeKind::Step, step.id.as_ref());
            for image in &step.images {
                claim(claims, NodeKind::Image, image.id.as_ref());
            }
        }
    }
}

/// Identities below a recipe root, excluding the root itself.
#[must_use]
pub fn recipe_child_claims(record: &RecipeRecord) -> Vec<Claim> {
    let mut claims = Vec::new();
    collect_recipe_children(record, &mut claims);
    claims
}

/// Returns the recipe that structurally owns a stored child node.
///
/// `None` means the node is not stored, or is not a recipe descendant.
pub fn owning_recipe(conn: &Connection, kind: NodeKind, id: &str) -> Result<Option<String>> {
    let sql = match kind {
        NodeKind::AboutSection => "SELECT recipe_id FROM about_sections WHERE id = ?1",
        NodeKind::IngredientSection => "SELECT recipe_id FROM ingredient_sections WHERE id = ?1",
        NodeKind::StepSection => "SELECT recipe_id FROM step_sections WHERE id = ?1",
        NodeKind::Ingredient => {
            "SELECT s.recipe_id FROM ingredients i
             JOIN ingredient_sections s ON s.id = i.section_id WHERE i.id = ?1"
        },
        NodeKind::Step => {
            "SELECT s.recipe_id FROM steps t
             JOIN step_sections s ON s.id = t.section_id WHERE t.id = ?1"
        },
        NodeKind::Image => {
            "SELECT CASE i.owner_kind
                 WHEN 'recipe' THEN i.owner_id
                 WHEN 'step' THEN (SELECT s.recipe_id FROM steps t
                                   JOIN step_sections s ON s.id = t.section_id
                                   WHERE t.id = i.owner_id)
             END
             FROM images i WHERE i.id = ?1"
        },
        NodeKind::Folder | NodeKind::Recipe => return Ok(None),
    };

    let owner: Option<Option<String>> = conn
        .query_row(sql, params![id], |row| row.get(0))
        .optional()
        .map_err(write_failed("lookup_owner"))?;
    Ok(owner.flatten())
}

/// Fails with [`Error::Duplicate`] if an incoming recipe child reuses an
/// identity held by a node outside `recipe`.
pub fn ensure_owned_by(conn: &Connection, recipe: &RecipeId, claims: &[Claim]) -> Result<()> {
    ensure_distinct(claims)?;
    let recipe = recipe.to_string();
    for (kind, id) in claims {
        let Some(stored) = identity_kind(conn, id)? else {
            continue;
        };
        let owned = stored == *kind && owning_recipe(conn, stored, id)?.as_deref() == Some(recipe.as_str());
        if !owned {
            return Err(Error::Duplicate {
                kind: *kind,
                id: id.clone(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// Upserts
// ============================================================================

/// Whether written children point at their parent immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// Back-references are left NULL for a later relink pass.
    Detached,
    /// Back-references are written with the row.
    Attached,
}

/// Writes a folder subtree. The root's own back-reference is taken from
/// the record.
pub fn write_folder(conn: &Connection, record: &FolderRecord, link: Link) -> Result<()> {
    let id = required(record.id, NodeKind::Folder)?;
    conn.execute(
        "INSERT INTO folders (id, parent_id, position, name, kind, created_at, edited_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
             parent_id = excluded.parent_id,
             position = excluded.position,
             name = excluded.name,
             kind = excluded.kind,
             created_at = excluded.created_at,
             edited_at = excluded.edited_at",
        params![
            id.to_string(),
            text(record.parent_id.as_ref()),
            record.position,
            record.name,
            record.kind,
            record.created_at,
            record.edited_at,
        ],
    )
    .map_err(write_failed("write_folder"))?;
    register_identity(conn, NodeKind::Folder, &id.to_string())?;

    let owner = ImageOwner::Folder(id);
    if let Some(image) = &record.image {
        write_image(conn, image, attach(link, owner))?;
    }

    let parent = (link == Link::Attached).then_some(id);
    for child in &record.folders {
        let child = FolderRecord {
            parent_id: parent,
            ..child.clone()
        };
        write_folder(conn, &child, link)?;
    }
    for recipe in &record.recipes {
        let recipe = RecipeRecord {
            folder_id: parent,
            ..recipe.clone()
        };
        write_recipe(conn, &recipe, link)?;
    }
    Ok(())
}

/// Writes a recipe and its children. The root's own back-reference is
/// taken from the record.
pub fn write_recipe(conn: &Connection, record: &RecipeRecord, link: Link) -> Result<()> {
    let id = required(record.id, NodeKind::Recipe)?;
    conn.execute(
        "INSERT INTO recipes (id, folder_id, position, name, search_text, created_at, edited_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
             folder_id = excluded.folder_id,
             position = excluded.position,
             name = excluded.name,
             search_text = excluded.search_text,
             created_at = excluded.created_at,
             edited_at = excluded.edited_at",
        params![
            id.to_string(),
            text(record.folder_id.as_ref()),
            record.position,
            record.name,
            record.search_text,
            record.created_at,
            record.edited_at,
        ],
    )
    .map_err(write_failed("write_recipe"))?;
    register_identity(conn, NodeKind::Recipe, &id.to_string())?;
    write_recipe_children(conn, id, record, link)
}

fn attach(link: Link, owner: ImageOwner) -> Option<ImageOwner> {
    (link == Link::Attached).then_some(owner)
}

fn write_recipe_children(
    conn: &Connection,
    id: RecipeId,
    record: &RecipeRecord,
    link: Link,
) -> Result<()> {
    let parent = (link == Link::Attached).then_some(id);

    for image in &record.images {
        write_image(conn, image, attach(link, ImageOwner::Recipe(id)))?;
    }
    for about in &record.about_sections {
        write_about_section(conn, about, parent)?;
    }
    // sections before items so re-parented items always have a target
    for section in &record.ingredient_sections {
        write_ingredient_section(conn, section, parent)?;
    }
    for section in &record.ingredient_sections {
        let section_id = (link == Link::Attached).then_some(section.id).flatten();
        for ingredient in &section.ingredients {
            write_ingredient(conn, ingredient, section_id)?;
        }
    }
    for section in &record.step_sections {
        write_step_section(conn, section, parent)?;
    }
    for section in &record.step_sections {
        let section_id = (link == Link::Attached).then_some(section.id).flatten();
        for step in &section.steps {
            write_step(conn, step, section_id, link)?;
        }
    }
    Ok(())
}

fn write_about_section(
    conn: &Connection,
    record: &AboutSectionRecord,
    recipe: Option<RecipeId>,
) -> Result<()> {
    let id = required(record.id, NodeKind::AboutSection)?.to_string();
    conn.execute(
        "INSERT INTO about_sections (id, recipe_id, position, name, description)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
             recipe_id = excluded.recipe_id,
             position = excluded.position,
             name = excluded.name,
             description = excluded.description",
        params![
            id,
            text(recipe.as_ref()),
            record.position,
            record.name,
            record.description,
        ],
    )
    .map_err(write_failed("write_about_section"))?;
    register_identity(conn, NodeKind::AboutSection, &id)
}

fn write_ingredient_section(
    conn: &Connection,
    record: &IngredientSectionRecord,
    recipe: Option<RecipeId>,
) -> Result<()> {
    let id = required(record.id, NodeKind::IngredientSection)?.to_string();
    conn.execute(
        "INSERT INTO ingredient_sections (id, recipe_id, position, name)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
             recipe_id = excluded.recipe_id,
             position = excluded.position,
             name = excluded.name",
        params![id, text(recipe.as_ref()), record.position, record.name],
    )
    .map_err(write_failed("write_ingredient_section"))?;
    register_identity(conn, NodeKind::IngredientSection, &id)
}

fn write_ingredient(
    conn: &Connection,
    record: &IngredientRecord,
    section: Option<crate::models::IngredientSectionId>,
) -> Result<()> {
    let id = required(record.id, NodeKind::Ingredient)?.to_string();
    conn.execute(
        "INSERT INTO ingredients (id, section_id, position, name, amount, unit)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
             section_id = excluded.section_id,
             position = excluded.position,
             name = excluded.name,
             amount = excluded.amount,
             unit = excluded.unit",
        params![
            id,
            text(section.as_ref()),
            record.position,
            record.name,
            record.amount,
            record.unit,
        ],
    )
    .map_err(write_failed("write_ingredient"))?;
    register_identity(conn, NodeKind::Ingredient, &id)
}

fn write_step_section(
    conn: &Connection,
    record: &StepSectionRecord,
    recipe: Option<RecipeId>,
) -> Result<()> {
    let id = required(record.id, NodeKind::StepSection)?.to_string();
    conn.execute(
        "INSERT INTO step_sections (id, recipe_id, position, name)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
             recipe_id = excluded.recipe_id,
             position = excluded.position,
             name = excluded.name",
        params![id, text(recipe.as_ref()), record.position, record.name],
    )
    .map_err(write_failed("write_step_section"))?;
    register_identity(conn, NodeKind::StepSection, &id)
}

fn write_step(
    conn: &Connection,
    record: &StepRecord,
    section: Option<crate::models::StepSectionId>,
    link: Link,
) -> Result<()> {
    let id = required(record.id, NodeKind::Step)?;
    conn.execute(
        "INSERT INTO steps (id, section_id, position, description)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
             section_id = excluded.section_id,
             position = excluded.position,
             description = excluded.description",
        params![
            id.to_string(),
            text(section.as_ref()),
            record.position,
            record.description,
        ],
    )
    .map_err(write_failed("write_step"))?;
    register_identity(conn, NodeKind::Step, &id.to_string())?;

    for image in &record.images {
        write_image(conn, image, attach(link, ImageOwner::Step(id)))?;
    }
    Ok(())
}

fn blob_exists(conn: &Connection, id: &str) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM image_blobs WHERE image_id = ?1)",
        params![id],
        |row| row.get(0),
    )
    .map_err(write_failed("check_image_blob"))
}

/// Writes an image row and its blob.
///
/// An image without loaded bytes keeps the blob already stored for it and
/// is rejected if there is none.
pub fn write_image(conn: &Connection, record: &ImageRecord, owner: Option<ImageOwner>) -> Result<()> {
    let id = required(record.id, NodeKind::Image)?.to_string();
    if !matches!(record.data, BlobRecord::Loaded(_)) && !blob_exists(conn, &id)? {
        return Err(Error::InvalidInput(format!(
            "image '{id}' has no data and none is stored"
        )));
    }

    conn.execute(
        "INSERT INTO images (id, owner_kind, owner_id, position)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
             owner_kind = excluded.owner_kind,
             owner_id = excluded.owner_id,
             position = excluded.position",
        params![
            id,
            owner.map(|o| o.kind().as_str()),
            owner.map(|o| o.id_string()),
            record.position,
        ],
    )
    .map_err(write_failed("write_image"))?;

    if let BlobRecord::Loaded(data) = &record.data {
        conn.execute(
            "INSERT INTO image_blobs (image_id, data) VALUES (?1, ?2)
             ON CONFLICT(image_id) DO UPDATE SET data = excluded.data",
            params![id, data],
        )
        .map_err(write_failed("write_image_blob"))?;
    }
    register_identity(conn, NodeKind::Image, &id)
}

// ============================================================================
// Relink
// ============================================================================

fn set_column(conn: &Connection, sql: &str, parent: &str, id: &str) -> Result<()> {
    conn.execute(sql, params![parent, id])
        .map_err(write_failed("relink"))?;
    Ok(())
}

fn set_image_owner(conn: &Connection, image: &ImageRecord, owner: ImageOwner) -> Result<()> {
    let Some(id) = image.id else {
        return Ok(());
    };
    conn.execute(
        "UPDATE images SET owner_kind = ?1, owner_id = ?2 WHERE id = ?3",
        params![owner.kind().as_str(), owner.id_string(), id.to_string()],
    )
    .map_err(write_failed("relink_image"))?;
    Ok(())
}

/// Points every descendant of a written folder subtree at its immediate
/// parent. Returns the number of back-references set.
pub fn relink_folder(conn: &Connection, record: &FolderRecord) -> Result<usize> {
    let id = required(record.id, NodeKind::Folder)?;
    let parent = id.to_string();
    let mut linked = 0;

    if let Some(image) = &record.image {
        set_image_owner(conn, image, ImageOwner::Folder(id))?;
        linked += 1;
    }
    for child in &record.folders {
        let child_id = required(child.id, NodeKind::Folder)?.to_string();
        set_column(conn, "UPDATE folders SET parent_id = ?1 WHERE id = ?2", &parent, &child_id)?;
        linked += 1 + relink_folder(conn, child)?;
    }
    for recipe in &record.recipes {
        let recipe_id = required(recipe.id, NodeKind::Recipe)?.to_string();
        set_column(conn, "UPDATE recipes SET folder_id = ?1 WHERE id = ?2", &parent, &recipe_id)?;
        linked += 1 + relink_recipe(conn, recipe)?;
    }
    Ok(linked)
}

/// Points every section, item, and image of a written recipe at its
/// immediate parent. Returns the number of back-references set.
pub fn relink_recipe(conn: &Connection, record: &RecipeRecord) -> Result<usize> {
    let id = required(record.id, NodeKind::Recipe)?;
    let recipe = id.to_string();
    let mut linked = 0;

    for image in &record.images {
        set_image_owner(conn, image, ImageOwner::Recipe(id))?;
        linked += 1;
    }
    for about in &record.about_sections {
        let about_id = required(about.id, NodeKind::AboutSection)?.to_string();
        set_column(conn, "UPDATE about_sections SET recipe_id = ?1 WHERE id = ?2", &recipe, &about_id)?;
        linked += 1;
    }
    for section in &record.ingredient_sections {
        let section_id = required(section.id, NodeKind::IngredientSection)?.to_string();
        set_column(
            conn,
            "UPDATE ingredient_sections SET recipe_id = ?1 WHERE id = ?2",
            &recipe,
            &section_id,
        )?;
        linked += 1;
        for ingredient in &section.ingredients {
            let ingredient_id = required(ingredient.id, NodeKind::Ingredient)?.to_string();
            set_column(
                conn,
                "UPDATE ingredients SET section_id = ?1 WHERE id = ?2",
                &section_id,
                &ingredient_id,
            )?;
            linked += 1;
        }
    }
    for section in &record.step_sections {
        let section_id = required(section.id, NodeKind::StepSection)?.to_string();
        set_column(
            conn,
            "UPDATE step_sections SET recipe_id = ?1 WHERE id = ?2",
            &recipe,
            &section_id,
        )?;
        linked += 1;
        for step in &section.steps {
            let step_id = required(step.id, NodeKind::Step)?;
            set_column(
                conn,
                "UPDATE steps SET section_id = ?1 WHERE id = ?2",
                &section_id,
                &step_id.to_string(),
            )?;
            linked += 1;
            for image in &step.images {
                set_image_owner(conn, image, ImageOwner::Step(step_id))?;
                linked += 1;
            }
        }
    }
    Ok(linked)
}

/// Appends a folder to the end of its parent's child list, or to the end
/// of the top-level list when `parent` is `None`.
pub fn link_folder(conn: &Connection, id: &str, parent: Option<&str>) -> Result<()> {
    conn.execute(
        "UPDATE folders SET
             parent_id = ?1,
             position = (SELECT COALESCE(MAX(position) + 1, 0) FROM folders
                         WHERE parent_id IS ?1 AND id <> ?2)
         WHERE id = ?2",
        params![parent, id],
    )
    .map_err(write_failed("link_folder"))?;
    Ok(())
}

/// Appends a recipe to the end of its folder's recipe list.
pub fn link_recipe(conn: &Connection, id: &str, folder: Option<&str>) -> Result<()> {
    conn.execute(
        "UPDATE recipes SET
             folder_id = ?1,
             position = (SELECT COALESCE(MAX(position) + 1, 0) FROM recipes
                         WHERE folder_id IS ?1 AND id <> ?2)
         WHERE id = ?2",
        params![folder, id],
    )
    .map_err(write_failed("link_recipe"))?;
    Ok(())
}

// ============================================================================
// Delete cascade
// ============================================================================

/// Rows removed by a cascading delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// Folders removed, including the root of a folder delete.
    pub folders: usize,
    /// Recipes removed.
    pub recipes: usize,
    /// Section, item, and image rows removed.
    pub records: usize,
}

/// Removes one row and its identity. Returns `false` if it was absent.
///
/// `table` is always one of the crate's own table names.
pub fn delete_row(conn: &Connection, table: &str, id: &str) -> Result<bool> {
    let removed = conn
        .execute(&format!("DELETE FROM {table} WHERE id = ?1"), params![id])
        .map_err(write_failed("delete_row"))?;
    release_identity(conn, id)?;
    Ok(removed > 0)
}

/// Deletes one image and its blob.
pub fn delete_image(conn: &Connection, id: &str) -> Result<bool> {
    conn.execute("DELETE FROM image_blobs WHERE image_id = ?1", params![id])
        .map_err(write_failed("delete_image_blob"))?;
    delete_row(conn, "images", id)
}

/// Deletes every image owned by `owner`.
pub fn delete_images(conn: &Connection, owner: &ImageOwner, report: &mut CascadeReport) -> Result<()> {
    let ids = {
        let mut stmt = conn
            .prepare_cached("SELECT id FROM images WHERE owner_kind = ?1 AND owner_id = ?2")
            .map_err(write_failed("prepare_owned_images"))?;
        let rows = stmt
            .query_map(params![owner.kind().as_str(), owner.id_string()], |row| {
                row.get::<_, String>(0)
            })
            .map_err(write_failed("query_owned_images"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(write_failed("read_owned_images"))?
    };
    for id in ids {
        if delete_image(conn, &id)? {
            report.records += 1;
        }
    }
    Ok(())
}

/// Deletes a step with its images.
pub fn delete_step(conn: &Connection, id: &str, report: &mut CascadeReport) -> Result<bool> {
    if let Ok(step) = id.parse() {
        delete_images(conn, &ImageOwner::Step(step), report)?;
    }
    let removed = delete_row(conn, "steps", id)?;
    report.records += usize::from(removed);
    Ok(removed)
}

/// Deletes a step section and every step still in it.
pub fn delete_step_section(conn: &Connection, id: &str, report: &mut CascadeReport) -> Result<bool> {
    for step in id_column(conn, "SELECT id FROM steps WHERE section_id = ?1", id)? {
        if !delete_step(conn, &step, report)? {
            tracing::warn!(step_id = %step, "Step vanished during cascade, skipping");
        }
    }
    let removed = delete_row(conn, "step_sections", id)?;
    report.records += usize::from(removed);
    Ok(removed)
}

/// Deletes an ingredient section and every ingredient still in it.
pub fn delete_ingredient_section(
    conn: &Connection,
    id: &str,
    report: &mut CascadeReport,
) -> Result<bool> {
    for ingredient in id_column(conn, "SELECT id FROM ingredients WHERE section_id = ?1", id)? {
        if delete_row(conn, "ingredients", &ingredient)? {
            report.records += 1;
        } else {
            tracing::warn!(ingredient_id = %ingredient, "Ingredient vanished during cascade, skipping");
        }
    }
    let removed = delete_row(conn, "ingredient_sections", id)?;
    report.records += usize::from(removed);
    Ok(removed)
}

/// Deletes a recipe after every section, item, and image it owns.
///
/// Returns `false` if the recipe row was absent.
pub fn delete_recipe_tree(conn: &Connection, id: &str, report: &mut CascadeReport) -> Result<bool> {
    for about in id_column(conn, "SELECT id FROM about_sections WHERE recipe_id = ?1", id)? {
        if delete_row(conn, "about_sections", &about)? {
            report.records += 1;
        }
    }
    for section in id_column(conn, "SELECT id FROM ingredient_sections WHERE recipe_id = ?1", id)? {
        delete_ingredient_section(conn, &section, report)?;
    }
    for section in id_column(conn, "SELECT id FROM step_sections WHERE recipe_id = ?1", id)? {
        delete_step_section(conn, &section, report)?;
    }
    if let Ok(recipe) = id.parse() {
        delete_images(conn, &ImageOwner::Recipe(recipe), report)?;
    }

    let removed = delete_row(conn, "recipes", id)?;
    report.recipes += usize::from(removed);
    Ok(removed)
}

/// Deletes a folder depth-first: child folders, then child recipes, then
/// the cover image and the folder itself.
///
/// A child that disappears mid-cascade is logged and skipped. Returns
/// `false` if the folder row was absent.
pub fn delete_folder_tree(conn: &Connection, id: &str, report: &mut CascadeReport) -> Result<bool> {
    for child in id_column(conn, "SELECT id FROM folders WHERE parent_id = ?1", id)? {
        if !delete_folder_tree(conn, &child, report)? {
            tracing::warn!(folder_id = %child, "Child folder not found during cascade, skipping");
        }
    }
    for recipe in id_column(conn, "SELECT id FROM recipes WHERE folder_id = ?1", id)? {
        if !delete_recipe_tree(conn, &recipe, report)? {
            tracing::warn!(recipe_id = %recipe, "Child recipe not found during cascade, skipping");
        }
    }
    if let Ok(folder) = id.parse() {
        delete_images(conn, &ImageOwner::Folder(folder), report)?;
    }

    let removed = delete_row(conn, "folders", id)?;
    report.folders += usize::from(removed);
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Folder, FolderKind, Ingredient, IngredientSection, Recipe};
    use crate::storage::convert::{folder_to_record, recipe_to_record};
    use crate::storage::sqlite::read::{count_rows, row_exists};
    use crate::storage::sqlite::schema::migrate;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        migrate(&conn).unwrap();
        conn
    }

    fn recipe() -> Recipe {
        Recipe::new("Stew")
            .with_ingredient_sections(vec![
                IngredientSection::new("Base", vec![Ingredient::new("onion", 2.0, "")]).unwrap(),
            ])
            .unwrap()
    }

    #[test]
    fn test_claims_cover_whole_subtree() {
        let folder = Folder::new("Root", FolderKind::User)
            .with_recipes(vec![recipe()])
            .unwrap();
        let claims = folder_claims(&folder_to_record(&folder));

        // folder, recipe, ingredient section, ingredient
        assert_eq!(claims.len(), 4);
        assert_eq!(claims[0], (NodeKind::Folder, folder.id.to_string()));
    }

    #[test]
    fn test_detached_write_then_relink() {
        let conn = conn();
        let folder = Folder::new("Root", FolderKind::User)
            .with_folders(vec![Folder::new("Child", FolderKind::User)])
            .unwrap()
            .with_recipes(vec![recipe()])
            .unwrap();
        let record = folder_to_record(&folder);

        write_folder(&conn, &record, Link::Detached).unwrap();
        let orphans: i64 = conn
            .query_row("SELECT COUNT(*) FROM folders WHERE parent_id IS NULL", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(orphans, 2);

        // child folder, recipe, section, ingredient
        assert_eq!(relink_folder(&conn, &record).unwrap(), 4);
        let orphans: i64 = conn
            .query_row("SELECT COUNT(*) FROM folders WHERE parent_id IS NULL", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(orphans, 1);
    }

    #[test]
    fn test_ensure_unclaimed_detects_stored_and_repeated_ids() {
        let conn = conn();
        let stored = recipe();
        let record = recipe_to_record(&stored);
        write_recipe(&conn, &record, Link::Attached).unwrap();

        let err = ensure_unclaimed(&conn, &recipe_claims(&record)).unwrap_err();
        assert!(matches!(err, Error::Duplicate { kind: NodeKind::Recipe, .. }));

        let fresh = recipe_to_record(&recipe());
        let mut claims = recipe_claims(&fresh);
        claims.push(claims[1].clone());
        let err = ensure_unclaimed(&conn, &claims).unwrap_err();
        assert!(matches!(err, Error::Duplicate { kind: NodeKind::IngredientSection, .. }));
    }

    #[test]
    fn test_owning_recipe_resolves_items() {
        let conn = conn();
        let stored = recipe();
        write_recipe(&conn, &recipe_to_record(&stored), Link::Attached).unwrap();

        let ingredient = stored.ingredient_sections[0].ingredients[0].id.to_string();
        let owner = owning_recipe(&conn, NodeKind::Ingredient, &ingredient).unwrap();
        assert_eq!(owner, Some(stored.id.to_string()));
        assert!(ensure_owned_by(&conn, &stored.id, &recipe_child_claims(&recipe_to_record(&stored))).is_ok());
    }

    #[test]
    fn test_link_folder_appends_position() {
        let conn = conn();
        let parent = Folder::new("Parent", FolderKind::User);
        write_folder(&conn, &folder_to_record(&parent), Link::Attached).unwrap();

        let parent_id = parent.id.to_string();
        for name in ["a", "b"] {
            let child = Folder::new(name, FolderKind::User);
            write_folder(&conn, &folder_to_record(&child), Link::Detached).unwrap();
            link_folder(&conn, &child.id.to_string(), Some(&parent_id)).unwrap();
        }

        let positions: Vec<i64> = {
            let mut stmt = conn
                .prepare("SELECT position FROM folders WHERE parent_id = ?1 ORDER BY position")
                .unwrap();
            stmt.query_map(params![parent_id], |row| row.get(0))
                .unwrap()
                .collect::<rusqlite::Result<_>>()
                .unwrap()
        };
        assert_eq!(positions, vec![0, 1]);
    }

    #[test]
    fn test_delete_folder_cascades() {
        let conn = conn();
        let folder = Folder::new("Root", FolderKind::User)
            .with_folders(vec![Folder::new("Child", FolderKind::User)
                .with_recipes(vec![recipe()])
                .unwrap()])
            .unwrap();
        let record = folder_to_record(&folder);
        write_folder(&conn, &record, Link::Detached).unwrap();
        relink_folder(&conn, &record).unwrap();

        let mut report = CascadeReport::default();
        assert!(delete_folder_tree(&conn, &folder.id.to_string(), &mut report).unwrap());
        assert_eq!(report.folders, 2);
        assert_eq!(report.recipes, 1);
        assert_eq!(report.records, 2);

        for table in ["folders", "recipes", "ingredient_sections", "ingredients", "identities"] {
            assert_eq!(count_rows(&conn, table).unwrap(), 0, "{table} not empty");
        }
        assert!(!row_exists(&conn, "folders", &folder.id.to_string()).unwrap());
    }

    #[test]
    fn test_delete_absent_recipe_reports_false() {
        let conn = conn();
        let mut report = CascadeReport::default();
        let id = RecipeId::generate().to_string();
        assert!(!delete_recipe_tree(&conn, &id, &mut report).unwrap());
        assert_eq!(report, CascadeReport::default());
    }
}
