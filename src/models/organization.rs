use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::Value;

use super::{AssociationMethod, JoinTable, ModelClass, ModelDef, Relation, RelationKind};
use crate::config::Config;
use crate::database::record::{value_to_id, Record};
use crate::database::store::StoreError;
use crate::error::ApiError;
use crate::validation::{field, Condition, RecordRule, Rule, ValidationContext, Validator};

pub static ORGANIZATION: ModelDef = ModelDef {
    class: ModelClass::Organization,
    table_name: "organization",
    id_attribute: "OrganizationID",
    numeric_id: false,
    columns: &[
        "OrganizationID",
        "ParentOrganizationID",
        "OrganizationName",
        "OrganizationType",
        "ExternalID",
        "Active",
        "CreatedAt",
        "UpdatedAt",
    ],
    defaults: &[("Active", true)],
    relations: &[
        Relation {
            method: AssociationMethod::Students,
            target: ModelClass::Student,
            kind: RelationKind::BelongsToMany(JoinTable {
                table: "student_organization",
                foreign_key: "OrganizationID",
                other_key: "UserID",
            }),
        },
        Relation {
            method: AssociationMethod::TestAdmins,
            target: ModelClass::TestAdministration,
            kind: RelationKind::BelongsToMany(JoinTable {
                table: "test_administration_organization",
                foreign_key: "OrganizationID",
                other_key: "TestAdministrationID",
            }),
        },
        Relation {
            method: AssociationMethod::ParentOrganization,
            target: ModelClass::Organization,
            kind: RelationKind::BelongsTo { foreign_key: "ParentOrganizationID" },
        },
    ],
    count_columns: &[],
    sortable: &["OrganizationName", "OrganizationType", "CreatedAt", "UpdatedAt"],
    default_sort: "OrganizationName",
};

static RULES: Lazy<Validator> = Lazy::new(|| {
    Validator::new()
        .field(
            "OrganizationID",
            vec![
                Rule::required("organization.missingOrgID"),
                Rule::max_length(36, "organization.tooLongOrgID"),
            ],
        )
        .field(
            "OrganizationName",
            vec![
                Rule::required("organization.missingOrgName"),
                Rule::max_length(80, "organization.tooLongOrgName"),
            ],
        )
        .field(
            "OrganizationType",
            vec![
                Rule::required("organization.missingOrgType"),
                Rule::max_length(35, "organization.tooLongOrgType"),
            ],
        )
        .field(
            "ExternalID",
            vec![
                Rule::required("organization.missingExternalID"),
                Rule::max_length(30, "organization.tooLongExternalID"),
            ],
        )
        .field(
            "ParentOrganizationID",
            vec![Rule::custom_with_message(NotSelfParent, "organization.selfParentOrgID")],
        )
        .when(
            CreatingWithRootOrg,
            vec![field(
                "ParentOrganizationID",
                vec![Rule::required("organization.missingParentOrgID")],
            )],
        )
        .when(
            RootOrgExists(true),
            vec![field(
                "ParentOrganizationID",
                vec![
                    Rule::max_length(36, "organization.tooLongParentOrgID"),
                    Rule::custom(ParentOrgExists),
                ],
            )],
        )
        .when(
            RootOrgExists(false),
            vec![field(
                "ParentOrganizationID",
                vec![Rule::empty("organization.invalidParentOrgID")],
            )],
        )
});

pub fn validator() -> &'static Validator {
    &RULES
}

pub fn map_save_error(config: &Config, err: &StoreError) -> Option<ApiError> {
    match err {
        StoreError::Duplicate(_) => Some(config.error("errors.organization.duplicateOrgID")),
        _ => None,
    }
}

/// A root organization exists as soon as any organization row does.
async fn root_org_exists(ctx: &ValidationContext<'_>) -> Result<bool, ApiError> {
    Ok(ctx.store.any_exists(ctx.model).await?)
}

/// Holds when the presence of a root organization equals the flag.
struct RootOrgExists(bool);

#[async_trait]
impl Condition for RootOrgExists {
    fn name(&self) -> &'static str {
        if self.0 {
            "rootOrgExists"
        } else {
            "rootOrgNotExists"
        }
    }

    async fn applies(&self, _: &Record, ctx: &ValidationContext<'_>) -> Result<bool, ApiError> {
        Ok(root_org_exists(ctx).await? == self.0)
    }
}

struct CreatingWithRootOrg;

#[async_trait]
impl Condition for CreatingWithRootOrg {
    fn name(&self) -> &'static str {
        "creatingAndRootOrgExists"
    }

    async fn applies(&self, record: &Record, ctx: &ValidationContext<'_>) -> Result<bool, ApiError> {
        if record.previous("OrganizationID").is_some() {
            return Ok(false);
        }
        root_org_exists(ctx).await
    }
}

struct NotSelfParent;

#[async_trait]
impl RecordRule for NotSelfParent {
    fn name(&self) -> &'static str {
        "notSelfParentOrganizationId"
    }

    async fn check(&self, value: &Value, record: &Record, _: &ValidationContext<'_>) -> Result<bool, ApiError> {
        Ok(value_to_id(value) != record.get_string("OrganizationID"))
    }
}

struct ParentOrgExists;

#[async_trait]
impl RecordRule for ParentOrgExists {
    fn name(&self) -> &'static str {
        "parentOrgExists"
    }

    async fn check(&self, value: &Value, _: &Record, ctx: &ValidationContext<'_>) -> Result<bool, ApiError> {
        let parent = match value_to_id(value) {
            Some(id) => ctx.store.fetch(&ORGANIZATION, &id).await?,
            None => None,
        };

        match parent {
            Some(_) => Ok(true),
            None => Err(ctx.config.error("errors.organization.invalidParentOrgID")),
        }
    }
}
