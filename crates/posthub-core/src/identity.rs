use posthub_types::models::{AgeGroup, Gender};

/// Labels of the on-chain `userType` index, in contract order.
pub const USER_TYPE_LABELS: [&str; 12] = [
    "RESTRICTED_MINOR_MALE",
    "RESTRICTED_MINOR_FEMALE",
    "RESTRICTED_ADULT_MALE",
    "RESTRICTED_ADULT_FEMALE",
    "RESTRICTED_SENIOR_MALE",
    "RESTRICTED_SENIOR_FEMALE",
    "MINOR_MALE",
    "MINOR_FEMALE",
    "ADULT_MALE",
    "ADULT_FEMALE",
    "SENIOR_MALE",
    "SENIOR_FEMALE",
];

/// Indices below this are restricted profiles.
const RESTRICTED_BELOW: u8 = 6;

/// Result of the identity contract lookup for one address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verification {
    pub verified: bool,
    pub nationality: String,
    pub user_type: u8,
}

impl Verification {
    pub fn from_contract(nationality: String, user_type: u8) -> Self {
        Self {
            verified: !nationality.is_empty(),
            nationality,
            user_type,
        }
    }
}

/// Demographic tags stamped on a post at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemographicTags {
    pub gender: Gender,
    pub age_group: AgeGroup,
    pub is_restricted: bool,
}

impl Default for DemographicTags {
    fn default() -> Self {
        Self {
            gender: Gender::Unknown,
            age_group: AgeGroup::Adult,
            is_restricted: false,
        }
    }
}

impl DemographicTags {
    pub fn from_user_type(user_type: u8) -> Self {
        let Some(label) = USER_TYPE_LABELS.get(usize::from(user_type)) else {
            return Self {
                is_restricted: user_type < RESTRICTED_BELOW,
                ..Self::default()
            };
        };

        // FEMALE contains MALE, so test it first
        let gender = if label.ends_with("_FEMALE") {
            Gender::Female
        } else if label.ends_with("_MALE") {
            Gender::Male
        } else {
            Gender::Unknown
        };

        Self {
            gender,
            age_group: user_type_to_age_group(user_type),
            is_restricted: user_type < RESTRICTED_BELOW,
        }
    }
}

/// Collapses the 12 user types into the three age buckets used for ranking.
pub fn user_type_to_age_group(user_type: u8) -> AgeGroup {
    match user_type {
        0 | 1 | 6 | 7 => AgeGroup::Minor,
        4 | 5 | 10 | 11 => AgeGroup::Senior,
        _ => AgeGroup::Adult,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_groups_match_labels() {
        for (idx, label) in USER_TYPE_LABELS.iter().enumerate() {
            let group = user_type_to_age_group(idx as u8);
            let expected = if label.contains("MINOR") {
                AgeGroup::Minor
            } else if label.contains("SENIOR") {
                AgeGroup::Senior
            } else {
                AgeGroup::Adult
            };
            assert_eq!(group, expected, "label {}", label);
        }
        assert_eq!(user_type_to_age_group(200), AgeGroup::Adult);
    }

    #[test]
    fn test_tags_from_user_type() {
        let t = DemographicTags::from_user_type(1);
        assert_eq!(t.gender, Gender::Female);
        assert_eq!(t.age_group, AgeGroup::Minor);
        assert!(t.is_restricted);

        let t = DemographicTags::from_user_type(10);
        assert_eq!(t.gender, Gender::Male);
        assert_eq!(t.age_group, AgeGroup::Senior);
        assert!(!t.is_restricted);

        let t = DemographicTags::from_user_type(99);
        assert_eq!(t, DemographicTags::default());
    }

    #[test]
    fn test_verified_means_nationality_present() {
        assert!(Verification::from_contract("FR".into(), 8).verified);
        assert!(!Verification::from_contract(String::new(), 8).verified);
    }
}
