use once_cell::sync::Lazy;
use regex::Regex;

use super::{AssociationMethod, JoinTable, ModelClass, ModelDef, Relation, RelationKind};
use crate::config::Config;
use crate::database::store::StoreError;
use crate::error::ApiError;
use crate::validation::{Rule, Validator};

pub static TEST_ADMINISTRATION: ModelDef = ModelDef {
    class: ModelClass::TestAdministration,
    table_name: "test_administration",
    id_attribute: "TestAdministrationID",
    numeric_id: true,
    columns: &[
        "TestAdministrationID",
        "AdministrationName",
        "AdministrationStartDate",
        "AdministrationEndDate",
        "Secured",
        "Active",
        "CreatedAt",
        "UpdatedAt",
    ],
    defaults: &[("Active", true)],
    relations: &[
        Relation {
            method: AssociationMethod::Organizations,
            target: ModelClass::Organization,
            kind: RelationKind::BelongsToMany(JoinTable {
                table: "test_administration_organization",
                foreign_key: "TestAdministrationID",
                other_key: "OrganizationID",
            }),
        },
        Relation {
            method: AssociationMethod::Assessments,
            target: ModelClass::Assessment,
            kind: RelationKind::BelongsToMany(JoinTable {
                table: "test_administration_assessment",
                foreign_key: "TestAdministrationID",
                other_key: "AssessmentID",
            }),
        },
    ],
    count_columns: &[],
    sortable: &["AdministrationName"],
    default_sort: "AdministrationName",
};

static DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("Invalid date regex"));

static RULES: Lazy<Validator> = Lazy::new(|| {
    Validator::new()
        .field(
            "AdministrationName",
            vec![
                Rule::required("testAdmin.missingAdminName"),
                Rule::max_length(50, "testAdmin.tooLongAdminName"),
            ],
        )
        .field(
            "AdministrationStartDate",
            vec![
                Rule::required("testAdmin.missingStartDate"),
                Rule::pattern(DATE.clone(), "testAdmin.invalidStartDate"),
            ],
        )
        .field(
            "AdministrationEndDate",
            vec![
                Rule::required("testAdmin.missingEndDate"),
                Rule::pattern(DATE.clone(), "testAdmin.invalidEndDate"),
            ],
        )
        .field(
            "Secured",
            vec![
                Rule::required("testAdmin.missingSecured"),
                Rule::boolean("testAdmin.invalidSecured"),
            ],
        )
        .field("Active", vec![Rule::boolean("testAdmin.invalidActive")])
});

pub fn validator() -> &'static Validator {
    &RULES
}

/// Only the generic mappings apply.
pub fn map_save_error(_: &Config, _: &StoreError) -> Option<ApiError> {
    None
}
