use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::Value;

use super::{AssociationMethod, JoinTable, ModelClass, ModelDef, Relation, RelationKind};
use crate::config::Config;
use crate::database::record::Record;
use crate::database::store::StoreError;
use crate::error::ApiError;
use crate::validation::{field, Condition, RecordRule, Rule, ValidationContext, Validator};

pub const ACCOMMODATION_COUNT: usize = 30;

pub static STUDENT: ModelDef = ModelDef {
    class: ModelClass::Student,
    table_name: "student",
    id_attribute: "UserID",
    numeric_id: false,
    columns: &[
        "UserID", "ExternalID", "FirstName", "MiddleName", "LastName", "Birthdate", "StuGrade",
        "TestDeliveryAccessCode", "Accom01", "Accom02", "Accom03", "Accom04", "Accom05", "Accom06",
        "Accom07", "Accom08", "Accom09", "Accom10", "Accom11", "Accom12", "Accom13", "Accom14",
        "Accom15", "Accom16", "Accom17", "Accom18", "Accom19", "Accom20", "Accom21", "Accom22",
        "Accom23", "Accom24", "Accom25", "Accom26", "Accom27", "Accom28", "Accom29", "Accom30",
        "Active", "CreatedAt", "UpdatedAt",
    ],
    defaults: &[("Active", true)],
    relations: &[Relation {
        method: AssociationMethod::Organizations,
        target: ModelClass::Organization,
        kind: RelationKind::BelongsToMany(JoinTable {
            table: "student_organization",
            foreign_key: "UserID",
            other_key: "OrganizationID",
        }),
    }],
    count_columns: &[],
    sortable: &[],
    default_sort: "UserID",
};

static RULES: Lazy<Validator> = Lazy::new(|| {
    Validator::new()
        .field(
            "UserID",
            vec![
                Rule::required("student.missingUserID"),
                Rule::max_length(36, "student.tooLongUserID"),
                Rule::custom(AccommodationsPresent),
                Rule::custom(AccommodationsBoolean),
            ],
        )
        .field(
            "StuGrade",
            vec![
                Rule::required("student.missingStuGrade"),
                Rule::max_length(2, "student.tooLongStuGrade"),
            ],
        )
        .field(
            "FirstName",
            vec![
                Rule::required("student.missingFirstName"),
                Rule::max_length(35, "student.tooLongFirstName"),
            ],
        )
        .field("MiddleName", vec![Rule::max_length(35, "student.tooLongMiddleName")])
        .field(
            "LastName",
            vec![
                Rule::required("student.missingLastName"),
                Rule::max_length(35, "student.tooLongLastName"),
            ],
        )
        .field(
            "Birthdate",
            vec![
                Rule::required("student.missingBirthdate"),
                Rule::max_length(10, "student.tooLongBirthdate"),
            ],
        )
        .field(
            "ExternalID",
            vec![
                Rule::required("student.missingExternalID"),
                Rule::max_length(30, "student.tooLongExternalID"),
            ],
        )
        .field(
            "TestDeliveryAccessCode",
            vec![
                Rule::required("student.missingTestDeliveryAccessCode"),
                Rule::max_length(20, "student.tooLongTestDeliveryAccessCode"),
            ],
        )
        .when(
            Updating,
            vec![field(
                "UserID",
                vec![Rule::custom_with_message(UserIdUnchanged, "student.changeUserID")],
            )],
        )
});

pub fn validator() -> &'static Validator {
    &RULES
}

pub fn map_save_error(config: &Config, err: &StoreError) -> Option<ApiError> {
    match err {
        StoreError::Duplicate(_) => Some(config.error("errors.student.duplicateUserID")),
        _ => None,
    }
}

/// `Accom01` ..= `Accom30`.
pub fn accommodation_fields() -> impl Iterator<Item = String> {
    (1..=ACCOMMODATION_COUNT).map(|i| format!("Accom{:02}", i))
}

struct AccommodationsPresent;

#[async_trait]
impl RecordRule for AccommodationsPresent {
    fn name(&self) -> &'static str {
        "requiredMultipleAccomXX"
    }

    async fn check(&self, _: &Value, record: &Record, ctx: &ValidationContext<'_>) -> Result<bool, ApiError> {
        match accommodation_fields().find(|name| !record.has(name)) {
            Some(name) => Err(ctx.config.error(&format!("errors.student.missing{name}"))),
            None => Ok(true),
        }
    }
}

struct AccommodationsBoolean;

#[async_trait]
impl RecordRule for AccommodationsBoolean {
    fn name(&self) -> &'static str {
        "booleanMultipleAccomXX"
    }

    async fn check(&self, _: &Value, record: &Record, ctx: &ValidationContext<'_>) -> Result<bool, ApiError> {
        let is_flag = |value: Option<&Value>| match value {
            Some(Value::Bool(_)) => true,
            Some(Value::Number(n)) => n.as_f64() == Some(0.0) || n.as_f64() == Some(1.0),
            _ => false,
        };

        match accommodation_fields().find(|name| !is_flag(record.get(name))) {
            Some(name) => Err(ctx.config.error(&format!("errors.student.nonBoolean{name}"))),
            None => Ok(true),
        }
    }
}

/// An update of an existing student.
struct Updating;

#[async_trait]
impl Condition for Updating {
    fn name(&self) -> &'static str {
        "updating"
    }

    async fn applies(&self, record: &Record, _: &ValidationContext<'_>) -> Result<bool, ApiError> {
        Ok(record.previous("UserID").is_some())
    }
}

struct UserIdUnchanged;

#[async_trait]
impl RecordRule for UserIdUnchanged {
    fn name(&self) -> &'static str {
        "notChangedUserId"
    }

    async fn check(&self, _: &Value, record: &Record, _: &ValidationContext<'_>) -> Result<bool, ApiError> {
        Ok(!record.changed("UserID"))
    }
}
