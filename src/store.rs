//! Persistence boundary.
//!
//! The relational store lives outside this crate; the pipeline only depends
//! on the [`RecipeStore`] trait. [`JsonlStore`] is the default sink the
//! binary ships with so a run is observable end to end: one JSON record per
//! line, with in-memory identity maps giving the upsert operations stable
//! ids.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::HarvestError;
use crate::models::{Dish, PipelineState};

/// Write sink consumed by the extraction pass.
///
/// `upsert_ingredient` returning `Ok(None)` means "skip this ingredient";
/// the pipeline treats it as a local gap, never a fatal error.
pub trait RecipeStore {
    fn upsert_dish(&mut self, dish: &Dish) -> Result<Uuid, HarvestError>;

    fn upsert_ingredient(
        &mut self,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Option<Uuid>, HarvestError>;

    fn link_dish_ingredient(
        &mut self,
        dish_id: Uuid,
        ingredient_id: Uuid,
        amount: f64,
        unit: &str,
    ) -> Result<(), HarvestError>;

    fn pipeline_state(&self) -> Result<Option<PipelineState>, HarvestError>;

    fn update_pipeline_state(
        &mut self,
        version: Uuid,
        last_scraped: DateTime<Utc>,
    ) -> Result<(), HarvestError>;
}

#[derive(Serialize)]
struct DishRecord<'a> {
    dish_id: Uuid,
    #[serde(flatten)]
    dish: &'a Dish,
}

#[derive(Serialize)]
struct IngredientRecord<'a> {
    ingredient_id: Uuid,
    name: &'a str,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct LinkRecord<'a> {
    dish_id: Uuid,
    ingredient_id: Uuid,
    amount: f64,
    unit: &'a str,
}

/// File-backed default sink: `dishes.jsonl`, `ingredients.jsonl`,
/// `dish_ingredients.jsonl`, `state.json` under one directory.
pub struct JsonlStore {
    dir: PathBuf,
    dish_ids: HashMap<String, Uuid>,
    ingredient_ids: HashMap<String, Uuid>,
    state: Option<PipelineState>,
}

impl JsonlStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, HarvestError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| HarvestError::io(&dir, e))?;

        let state_path = dir.join("state.json");
        let state = match std::fs::read_to_string(&state_path) {
            Ok(data) => serde_json::from_str(&data)
                .map_err(|e| HarvestError::Store(format!("corrupt state file: {e}")))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(HarvestError::io(&state_path, e)),
        };

        info!(dir = %dir.display(), "opened jsonl store");
        Ok(Self {
            dir,
            dish_ids: HashMap::new(),
            ingredient_ids: HashMap::new(),
            state,
        })
    }

    fn append(&self, file: &str, record: &impl Serialize) -> Result<(), HarvestError> {
        let path = self.dir.join(file);
        let line = serde_json::to_string(record)
            .map_err(|e| HarvestError::Store(format!("serialize record: {e}")))?;
        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| HarvestError::io(&path, e))?;
        writeln!(out, "{line}").map_err(|e| HarvestError::io(&path, e))?;
        Ok(())
    }
}

impl RecipeStore for JsonlStore {
    fn upsert_dish(&mut self, dish: &Dish) -> Result<Uuid, HarvestError> {
        if let Some(id) = self.dish_ids.get(&dish.source_url) {
            return Ok(*id);
        }
        let dish_id = Uuid::new_v4();
        self.append("dishes.jsonl", &DishRecord { dish_id, dish })?;
        self.dish_ids.insert(dish.source_url.clone(), dish_id);
        Ok(dish_id)
    }

    fn upsert_ingredient(
        &mut self,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Option<Uuid>, HarvestError> {
        if let Some(id) = self.ingredient_ids.get(name) {
            return Ok(Some(*id));
        }
        let ingredient_id = Uuid::new_v4();
        self.append(
            "ingredients.jsonl",
            &IngredientRecord {
                ingredient_id,
                name,
                created_at,
            },
        )?;
        self.ingredient_ids.insert(name.to_string(), ingredient_id);
        Ok(Some(ingredient_id))
    }

    fn link_dish_ingredient(
        &mut self,
        dish_id: Uuid,
        ingredient_id: Uuid,
        amount: f64,
        unit: &str,
    ) -> Result<(), HarvestError> {
        self.append(
            "dish_ingredients.jsonl",
            &LinkRecord {
                dish_id,
                ingredient_id,
                amount,
                unit,
            },
        )
    }

    fn pipeline_state(&self) -> Result<Option<PipelineState>, HarvestError> {
        Ok(self.state)
    }

    fn update_pipeline_state(
        &mut self,
        version: Uuid,
        last_scraped: DateTime<Utc>,
    ) -> Result<(), HarvestError> {
        let state = PipelineState {
            version,
            last_scraped,
        };
        let path = self.dir.join("state.json");
        let json = serde_json::to_string_pretty(&state)
            .map_err(|e| HarvestError::Store(format!("serialize state: {e}")))?;
        std::fs::write(&path, json).map_err(|e| HarvestError::io(&path, e))?;
        self.state = Some(state);
        Ok(())
    }
}
