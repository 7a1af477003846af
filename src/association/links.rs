//! The concrete associations the API exposes.

use super::{AssociationDescriptor, AssociationErrors, ModelRef};
use crate::config::Config;
use crate::models::AssociationMethod;

/// Which way a descriptor is going to be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Associate,
    Disassociate,
}

/// Per-association constants; the generic engine does the rest.
struct LinkDef {
    source_class: &'static str,
    target_class: &'static str,
    method: AssociationMethod,
    missing_source_id: &'static str,
    missing_target_id: &'static str,
    invalid_source_id: &'static str,
    invalid_target_id: &'static str,
    duplicate_association: &'static str,
    invalid_association: &'static str,
    added_message: &'static str,
    removed_message: &'static str,
}

const STUDENT_ORGANIZATION: LinkDef = LinkDef {
    source_class: "Student",
    target_class: "Organization",
    method: AssociationMethod::Organizations,
    missing_source_id: "errors.student.missingUserID",
    missing_target_id: "errors.organization.missingOrgID",
    invalid_source_id: "errors.student.invalidUserID",
    invalid_target_id: "errors.organization.invalidOrgID",
    duplicate_association: "errors.student.duplicateOrgAssociation",
    invalid_association: "errors.student.invalidOrgAssociation",
    added_message: "messages.student.addedToOrg.message",
    removed_message: "messages.student.removedFromOrg.message",
};

const TEST_ADMIN_ORGANIZATION: LinkDef = LinkDef {
    source_class: "TestAdministration",
    target_class: "Organization",
    method: AssociationMethod::Organizations,
    missing_source_id: "errors.testAdmin.missingTestAdminID",
    missing_target_id: "errors.organization.missingOrgID",
    invalid_source_id: "errors.testAdmin.invalidTestAdminID",
    invalid_target_id: "errors.organization.invalidOrgID",
    duplicate_association: "errors.testAdmin.duplicateOrgAssociation",
    invalid_association: "errors.testAdmin.invalidOrgAssociation",
    added_message: "messages.testAdmin.addedToOrg.message",
    removed_message: "messages.testAdmin.removedFromOrg.message",
};

const TEST_ADMIN_ASSESSMENT: LinkDef = LinkDef {
    source_class: "TestAdministration",
    target_class: "Assessment",
    method: AssociationMethod::Assessments,
    missing_source_id: "errors.testAdmin.missingTestAdminID",
    missing_target_id: "errors.assessment.missingAssessmentID",
    invalid_source_id: "errors.testAdmin.invalidTestAdminID",
    invalid_target_id: "errors.assessment.invalidAssessmentID",
    duplicate_association: "errors.testAdmin.duplicateAssessmentAssociation",
    invalid_association: "errors.testAdmin.invalidAssessmentAssociation",
    added_message: "messages.testAdmin.addedToAssessment.message",
    removed_message: "messages.testAdmin.removedFromAssessment.message",
};

impl LinkDef {
    fn descriptor(
        &self,
        config: &Config,
        source_id: Option<&str>,
        target_id: Option<&str>,
        direction: Direction,
    ) -> AssociationDescriptor {
        let mut errors = AssociationErrors {
            missing_source_id: self.missing_source_id.to_string(),
            missing_target_id: self.missing_target_id.to_string(),
            invalid_source_id: self.invalid_source_id.to_string(),
            invalid_target_id: self.invalid_target_id.to_string(),
            ..AssociationErrors::default()
        };

        let message = match direction {
            Direction::Associate => {
                errors.duplicate_association = Some(self.duplicate_association.to_string());
                config.message(self.added_message)
            }
            Direction::Disassociate => {
                errors.invalid_association = Some(self.invalid_association.to_string());
                config.message(self.removed_message)
            }
        };

        AssociationDescriptor {
            source: ModelRef::new(self.source_class, source_id),
            target: ModelRef::new(self.target_class, target_id),
            method: self.method,
            errors,
            message,
        }
    }
}

pub fn student_organization(
    config: &Config,
    student_id: Option<&str>,
    organization_id: Option<&str>,
    direction: Direction,
) -> AssociationDescriptor {
    STUDENT_ORGANIZATION.descriptor(config, student_id, organization_id, direction)
}

pub fn test_admin_organization(
    config: &Config,
    test_admin_id: Option<&str>,
    organization_id: Option<&str>,
    direction: Direction,
) -> AssociationDescriptor {
    TEST_ADMIN_ORGANIZATION.descriptor(config, test_admin_id, organization_id, direction)
}

pub fn test_admin_assessment(
    config: &Config,
    test_admin_id: Option<&str>,
    assessment_id: Option<&str>,
    direction: Direction,
) -> AssociationDescriptor {
    TEST_ADMIN_ASSESSMENT.descriptor(config, test_admin_id, assessment_id, direction)
}
