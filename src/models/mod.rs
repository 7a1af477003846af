//! Entity definitions and the lookup from class name to definition.

use std::fmt;
use std::str::FromStr;

pub mod assessment;
pub mod organization;
pub mod relation;
pub mod student;
pub mod test_administration;

pub use relation::{AssociationMethod, JoinTable, Relation, RelationAccessor, RelationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelClass {
    Organization,
    Student,
    TestAdministration,
    Assessment,
    AssessmentForm,
}

impl ModelClass {
    pub fn name(&self) -> &'static str {
        match self {
            ModelClass::Organization => "Organization",
            ModelClass::Student => "Student",
            ModelClass::TestAdministration => "TestAdministration",
            ModelClass::Assessment => "Assessment",
            ModelClass::AssessmentForm => "AssessmentForm",
        }
    }

    pub fn def(&self) -> &'static ModelDef {
        match self {
            ModelClass::Organization => &organization::ORGANIZATION,
            ModelClass::Student => &student::STUDENT,
            ModelClass::TestAdministration => &test_administration::TEST_ADMINISTRATION,
            ModelClass::Assessment => &assessment::ASSESSMENT,
            ModelClass::AssessmentForm => &assessment::ASSESSMENT_FORM,
        }
    }
}

impl fmt::Display for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown model class: {0}")]
pub struct UnknownModel(pub String);

impl FromStr for ModelClass {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Organization" => Ok(ModelClass::Organization),
            "Student" => Ok(ModelClass::Student),
            "TestAdministration" => Ok(ModelClass::TestAdministration),
            "Assessment" => Ok(ModelClass::Assessment),
            "AssessmentForm" => Ok(ModelClass::AssessmentForm),
            other => Err(UnknownModel(other.to_string())),
        }
    }
}

/// Look up an entity definition by class name.
pub fn get_class(name: &str) -> Result<&'static ModelDef, UnknownModel> {
    name.parse::<ModelClass>().map(|class| class.def())
}

/// Aggregate exposed as an extra column: the number of rows in `table`
/// whose `foreign_key` equals this row's id.
#[derive(Debug)]
pub struct CountColumn {
    pub alias: &'static str,
    pub table: &'static str,
    pub foreign_key: &'static str,
}

#[derive(Debug)]
pub struct ModelDef {
    pub class: ModelClass,
    pub table_name: &'static str,
    pub id_attribute: &'static str,
    /// Ids are assigned by the store (auto increment).
    pub numeric_id: bool,
    pub columns: &'static [&'static str],
    /// Boolean columns the store fills in when a create leaves them out.
    pub defaults: &'static [(&'static str, bool)],
    pub relations: &'static [Relation],
    pub count_columns: &'static [CountColumn],
    /// Columns a listing may be sorted by.
    pub sortable: &'static [&'static str],
    pub default_sort: &'static str,
}

impl ModelDef {
    pub fn relation(&self, method: AssociationMethod) -> Option<&Relation> {
        self.relations.iter().find(|r| r.method == method)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }

    pub fn is_count_column(&self, column: &str) -> bool {
        self.count_columns.iter().any(|c| c.alias == column)
    }

    /// Readable columns, computed ones included.
    pub fn is_readable(&self, column: &str) -> bool {
        self.has_column(column) || self.is_count_column(column)
    }
}
