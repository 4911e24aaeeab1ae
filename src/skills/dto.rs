use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SkillNameRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "Skill name must be between 1 and 50 symbols"))]
    pub name: String,
}

/// Body of the attach and detach calls on a freelancer profile.
#[derive(Debug, Deserialize, Validate)]
pub struct SkillLinkRequest {
    #[validate(range(min = 1, message = "Invalid skill id"))]
    pub skill_id: i64,
}
