use math_core::model::{Profile, Settings, SettingsDraft};

use crate::error::SessionError;

/// Settings for a learner: their grade preset with `overrides` on top.
///
/// # Errors
///
/// Returns `SessionError::Settings` if the merged draft does not validate.
pub fn settings_for_profile(
    profile: &Profile,
    overrides: SettingsDraft,
) -> Result<Settings, SessionError> {
    let preset = SettingsDraft::for_grade(profile.grade())?;
    Ok(preset.overlay(overrides).validate()?)
}
