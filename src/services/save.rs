use tracing::debug;

use crate::config::Config;
use crate::context::AppContext;
use crate::database::record::{value_to_id, Record};
use crate::database::store::StoreError;
use crate::error::ApiError;
use crate::models::ModelDef;
use crate::validation::{ValidationContext, Validator};

/// Entity-specific translation of a persistence failure.
pub type SaveErrorMapper = fn(&Config, &StoreError) -> Option<ApiError>;

/// Validate, write and re-read one record of a model.
///
/// Store failures go through the entity's mapper first; an unknown column
/// becomes `errors.generic.badField`, anything else is internal.
pub struct SavePipeline {
    model: &'static ModelDef,
    validator: &'static Validator,
    map_error: SaveErrorMapper,
}

impl SavePipeline {
    pub fn new(model: &'static ModelDef, validator: &'static Validator, map_error: SaveErrorMapper) -> Self {
        Self { model, validator, map_error }
    }

    /// Returns the row as stored after the write.
    pub async fn save(&self, ctx: &AppContext, mut record: Record) -> Result<Record, ApiError> {
        let model = self.model;

        // computed columns never reach the table
        for column in model.count_columns {
            record.remove(column.alias);
        }

        let validation = ValidationContext {
            config: ctx.config(),
            store: ctx.store(),
            model,
        };
        self.validator.validate(&record, &validation).await?;

        let store = ctx.store();
        if record.is_new() {
            debug!("Inserting {}", model.class);
            return store
                .insert(model, record.changes())
                .await
                .map_err(|e| self.translate(ctx.config(), e));
        }

        let id = record
            .previous(model.id_attribute)
            .and_then(value_to_id)
            .ok_or_else(|| ApiError::internal(format!("{} loaded without {}", model.class, model.id_attribute)))?;

        let changes = record.changes();
        if changes.is_empty() {
            debug!("{} {} unchanged", model.class, id);
        } else {
            debug!("Updating {} {} ({} fields)", model.class, id, changes.len());
            store
                .update(model, &id, changes)
                .await
                .map_err(|e| self.translate(ctx.config(), e))?;
        }

        // the id cannot change on update, so the old one still addresses the row
        store
            .fetch(model, &id)
            .await?
            .ok_or_else(|| ApiError::internal(format!("{} {} vanished after save", model.class, id)))
    }

    fn translate(&self, config: &Config, err: StoreError) -> ApiError {
        if let Some(mapped) = (self.map_error)(config, &err) {
            return mapped;
        }

        match err {
            StoreError::UnknownColumn(column) => {
                config.error_with("errors.generic.badField", "%FIELDNAME%", &column)
            }
            other => other.into(),
        }
    }
}
