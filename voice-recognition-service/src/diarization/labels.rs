//! Speaker label policy shared by both diarization strategies.
//!
//! Backend tags (`"1"`, `"2"`, `"A"`) become `Speaker <letter>` labels and the
//! first speaker is treated as the clinician. Role names returned by the
//! text-generation model are upper-cased to the same role vocabulary.

pub const DOCTOR: &str = "DOCTOR";
pub const PATIENT: &str = "PATIENT";
pub const CAREGIVER: &str = "CAREGIVER";
pub const UNKNOWN: &str = "Unknown";

/// Label given to the first speaker before role assignment
pub const FIRST_SPEAKER: &str = "Speaker A";

/// Tag assumed for words the backend left untagged
pub const DEFAULT_TAG: &str = "1";

/// Convert a raw backend tag into a `Speaker <X>` label.
///
/// Numeric tags 1 through 26 map to letters (`"1"` → `"Speaker A"`); other
/// numbers keep their digits. A single letter is upper-cased. Missing or
/// blank tags are treated as [`DEFAULT_TAG`].
pub fn speaker_label(tag: Option<&str>) -> String {
    let tag = match tag.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => DEFAULT_TAG,
    };

    if let Ok(n) = tag.parse::<u32>() {
        let letter = (1..=26).contains(&n).then(|| char::from_u32(64 + n)).flatten();
        return match letter {
            Some(letter) => format!("Speaker {}", letter),
            None => format!("Speaker {}", n),
        };
    }

    let mut chars = tag.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => format!("Speaker {}", c.to_ascii_uppercase()),
        _ => format!("Speaker {}", tag),
    }
}

/// Fixed role rule: only the first speaker is rewritten, to [`DOCTOR`]
pub fn assign_role(label: String) -> String {
    if label == FIRST_SPEAKER {
        DOCTOR.to_string()
    } else {
        label
    }
}

/// Canonical label for a backend tag
pub fn canonical_label(tag: Option<&str>) -> String {
    assign_role(speaker_label(tag))
}

/// Canonical label for a role name returned by the text-generation model
pub fn role_label(role: &str) -> String {
    let trimmed = role.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "doctor" | "physician" | "clinician" => DOCTOR.to_string(),
        "patient" => PATIENT.to_string(),
        "caregiver" | "carer" | "relative" => CAREGIVER.to_string(),
        "" => UNKNOWN.to_string(),
        _ => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_tags_become_letters() {
        assert_eq!(speaker_label(Some("1")), "Speaker A");
        assert_eq!(speaker_label(Some("2")), "Speaker B");
        assert_eq!(speaker_label(Some("26")), "Speaker Z");
        assert_eq!(speaker_label(Some("27")), "Speaker 27");
        assert_eq!(speaker_label(Some("0")), "Speaker 0");
    }

    #[test]
    fn letters_and_missing_tags() {
        assert_eq!(speaker_label(Some("b")), "Speaker B");
        assert_eq!(speaker_label(None), "Speaker A");
        assert_eq!(speaker_label(Some("  ")), "Speaker A");
        assert_eq!(speaker_label(Some("spk_3")), "Speaker spk_3");
    }

    #[test]
    fn only_first_speaker_becomes_doctor() {
        assert_eq!(canonical_label(Some("1")), DOCTOR);
        assert_eq!(canonical_label(Some("A")), DOCTOR);
        assert_eq!(canonical_label(Some("2")), "Speaker B");
    }

    #[test]
    fn model_roles_are_normalized() {
        assert_eq!(role_label("Doctor"), DOCTOR);
        assert_eq!(role_label(" patient "), PATIENT);
        assert_eq!(role_label("Caregiver"), CAREGIVER);
        assert_eq!(role_label(""), UNKNOWN);
        assert_eq!(role_label("Nurse"), "Nurse");
    }
}
