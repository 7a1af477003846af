use super::{AssociationMethod, CountColumn, JoinTable, ModelClass, ModelDef, Relation, RelationKind};

/// Assessments carry `AssessmentFormCount`, the number of forms attached,
/// on every read. The column is never written back.
pub static ASSESSMENT: ModelDef = ModelDef {
    class: ModelClass::Assessment,
    table_name: "assessment",
    id_attribute: "AssessmentID",
    numeric_id: true,
    columns: &["AssessmentID", "AssessmentName", "GradeLevel", "Subject", "CreatedAt", "UpdatedAt"],
    defaults: &[],
    relations: &[
        Relation {
            method: AssociationMethod::TestAdmins,
            target: ModelClass::TestAdministration,
            kind: RelationKind::BelongsToMany(JoinTable {
                table: "test_administration_assessment",
                foreign_key: "AssessmentID",
                other_key: "TestAdministrationID",
            }),
        },
        Relation {
            method: AssociationMethod::AssessmentForms,
            target: ModelClass::AssessmentForm,
            kind: RelationKind::HasMany { foreign_key: "assessmentId" },
        },
    ],
    count_columns: &[CountColumn {
        alias: "AssessmentFormCount",
        table: "assessment_form",
        foreign_key: "assessmentId",
    }],
    sortable: &["AssessmentName", "GradeLevel", "Subject", "CreatedAt", "UpdatedAt"],
    default_sort: "AssessmentName",
};

pub static ASSESSMENT_FORM: ModelDef = ModelDef {
    class: ModelClass::AssessmentForm,
    table_name: "assessment_form",
    id_attribute: "assessmentFormId",
    numeric_id: true,
    columns: &["assessmentFormId", "assessmentId", "CreatedAt", "UpdatedAt"],
    defaults: &[],
    relations: &[],
    count_columns: &[],
    sortable: &[],
    default_sort: "assessmentFormId",
};
