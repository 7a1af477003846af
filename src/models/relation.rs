use std::fmt;

use super::{ModelClass, ModelDef};
use crate::database::record::Record;
use crate::database::store::{Link, Store, StoreError};
use crate::error::ApiError;

/// Named relation accessors available on the entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssociationMethod {
    Organizations,
    Students,
    TestAdmins,
    Assessments,
    ParentOrganization,
    AssessmentForms,
}

impl AssociationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssociationMethod::Organizations => "organizations",
            AssociationMethod::Students => "students",
            AssociationMethod::TestAdmins => "testAdmins",
            AssociationMethod::Assessments => "assessments",
            AssociationMethod::ParentOrganization => "parentOrganization",
            AssociationMethod::AssessmentForms => "assessmentForms",
        }
    }
}

impl fmt::Display for AssociationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Join table for a many-to-many relation. `foreign_key` points at the
/// owning model, `other_key` at the target.
#[derive(Debug)]
pub struct JoinTable {
    pub table: &'static str,
    pub foreign_key: &'static str,
    pub other_key: &'static str,
}

#[derive(Debug)]
pub enum RelationKind {
    BelongsToMany(JoinTable),
    BelongsTo { foreign_key: &'static str },
    HasMany { foreign_key: &'static str },
}

#[derive(Debug)]
pub struct Relation {
    pub method: AssociationMethod,
    pub target: ModelClass,
    pub kind: RelationKind,
}

impl Relation {
    pub fn join_table(&self) -> Option<&JoinTable> {
        match &self.kind {
            RelationKind::BelongsToMany(join) => Some(join),
            _ => None,
        }
    }
}

/// Typed handle on one source row's many-to-many relation.
pub struct RelationAccessor<'a> {
    store: &'a dyn Store,
    source: &'static ModelDef,
    source_id: &'a str,
    join: &'static JoinTable,
    target: &'static ModelDef,
}

impl<'a> RelationAccessor<'a> {
    pub fn new(
        store: &'a dyn Store,
        source: &'static ModelDef,
        source_id: &'a str,
        method: AssociationMethod,
    ) -> Result<Self, ApiError> {
        let relation = source.relation(method).ok_or_else(|| {
            ApiError::internal(format!("{} has no relation {}", source.class, method))
        })?;
        let join = relation.join_table().ok_or_else(|| {
            ApiError::internal(format!("{}.{} is not a many-to-many relation", source.class, method))
        })?;

        Ok(Self {
            store,
            source,
            source_id,
            join,
            target: relation.target.def(),
        })
    }

    /// `Source s1 -> Target t1`, for logs.
    pub fn describe(&self, target_id: &str) -> String {
        format!("{} {} -> {} {}", self.source.class, self.source_id, self.target.class, target_id)
    }

    fn link<'b>(&'b self, target_id: &'b str) -> Link<'b> {
        Link {
            join: self.join,
            source: self.source,
            source_id: self.source_id,
            target: self.target,
            target_id,
        }
    }

    /// The linked target row, if the pair is currently associated.
    pub async fn find(&self, target_id: &str) -> Result<Option<Record>, StoreError> {
        self.store.find_link(&self.link(target_id)).await
    }

    pub async fn attach(&self, target_id: &str) -> Result<(), StoreError> {
        self.store.attach(&self.link(target_id)).await
    }

    /// Returns the number of association rows removed.
    pub async fn detach(&self, target_id: &str) -> Result<u64, StoreError> {
        self.store.detach(&self.link(target_id)).await
    }
}
