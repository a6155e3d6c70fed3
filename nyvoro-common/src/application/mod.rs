//! Join application schema, validation and form conversion
//!
//! Pure data code: no HTTP framework or database dependencies.

pub mod form_state;
pub mod lenient;
pub mod payload;
pub mod validation;

pub use form_state::{build_editable_payload, build_submission_payload, to_form_state, JoinFormState};
pub use payload::{
    ApplicationContent, AudienceAnalytics, BudgetAndResources, JoinApplication, Locale,
    Objectives, Planning, Profile, ProjectType, ReleaseHistory, SocialLinks, StreamingLinks,
    PROFILE_EDIT_TURNSTILE_TOKEN,
};
pub use validation::{is_valid_email, ValidationErrors};
